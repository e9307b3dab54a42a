//! Shift and rotate emitters (group 0xE, sizes 00-10, plus the memory
//! forms at size 11 with bit 11 clear).
//!
//! Register variant: 1110 CCC D SS I TT RRR (SS != 11)
//!   CCC = count/register, D = direction (0=right, 1=left)
//!   SS = size (00=byte, 01=word, 10=long)
//!   I = count source (0=immediate 1..8 with 0 meaning 8, 1=register mod 64)
//!   TT = kind (00=AS, 01=LS, 10=ROX, 11=RO)
//!   RRR = data register
//!
//! Memory variant: 1110 0TT D 11 MMMRRR — word sized, shift by one,
//! read-modify-write on an alterable memory operand.
//!
//! Emission is branch-free. Immediate counts resolve the carry bit
//! position at translation time; register counts go through a 64-bit host
//! shift so counts up to 63 fall out of the shift itself, with
//! conditional selects preserving X (and forcing C) for a zero count.
//! The extended rotates build the (width+1)-bit value with X on top and
//! rotate it with the two-shift identity, so a zero or width+1-multiple
//! count degenerates to the identity and C = X for free.

use crate::backend::HostEmit;
use crate::cc::{self, CcMask};
use crate::ea;
use crate::entry::Translator;
use crate::regalloc;
use crate::stream::{GuestStream, TranslateError};
use arm_asm::{Cond, Shift};

/// Shift/rotate kind (bits 4-3 register form, bits 10-9 memory form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// ASL/ASR.
    Arith,
    /// LSL/LSR.
    Logical,
    /// ROXL/ROXR.
    RotateX,
    /// ROL/ROR.
    Rotate,
}

impl Kind {
    pub(crate) fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::Arith,
            1 => Self::Logical,
            2 => Self::RotateX,
            _ => Self::Rotate,
        }
    }

    /// CCR bits this kind produces. Plain rotates leave X alone; the rest
    /// copy the carry into X. V is produced (as zero) by all of them.
    pub(crate) fn sets(self) -> CcMask {
        match self {
            Self::Rotate => CcMask::NZVC,
            _ => CcMask::NZVC.union(CcMask::X),
        }
    }

    /// CCR bits this kind consumes.
    pub(crate) fn needs(self) -> CcMask {
        match self {
            Self::RotateX => CcMask::X,
            _ => CcMask::empty(),
        }
    }
}

impl<B: HostEmit> Translator<'_, B> {
    /// Register-form shifts and rotates. Size, direction, kind and count
    /// come from the opcode fields.
    pub(crate) fn emit_shift_reg(
        &mut self,
        op: u16,
        _stream: &mut GuestStream<'_>,
    ) -> Result<(), TranslateError> {
        let kind = Kind::from_bits(op >> 3);
        let left = op & 0x0100 != 0;
        let bits = 8u32 << ((op >> 6) & 3);
        let reg = (op & 7) as u8;
        let count_field = ((op >> 9) & 7) as u8;
        let update = self.update_mask & kind.sets();

        if op & 0x0020 != 0 {
            self.shift_reg_var(kind, left, bits, reg, count_field, update);
        } else {
            let n = if count_field == 0 { 8 } else { u32::from(count_field) };
            self.shift_reg_imm(kind, left, bits, reg, n, update);
        }
        self.advance_pc(2);
        Ok(())
    }

    /// Immediate-count form: the count is 1..8, so the carry position is a
    /// translation-time constant and no zero-count handling exists.
    fn shift_reg_imm(&mut self, kind: Kind, left: bool, bits: u32, reg: u8, n: u32, mut update: CcMask) {
        let d = self.regs.map_rmw::<B>(self.buf, regalloc::dreg(reg));
        match kind {
            Kind::Arith | Kind::Logical => {
                let carry = if update.intersects(CcMask::C | CcMask::X) {
                    let c = self.regs.alloc_temp::<B>(self.buf);
                    let pos = if left { bits - n } else { n - 1 };
                    B::extract_bit(self.buf, c, d, pos);
                    Some(c)
                } else {
                    None
                };
                let arith = kind == Kind::Arith;
                if bits == 32 {
                    if left {
                        B::lsl_imm(self.buf, d, d, n);
                    } else if arith {
                        B::asr_imm(self.buf, d, d, n);
                    } else {
                        B::lsr_imm(self.buf, d, d, n);
                    }
                    cc::begin_update::<B>(self.buf, &mut self.regs, update);
                    cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, d, 32);
                } else {
                    let t = self.regs.alloc_temp::<B>(self.buf);
                    if left {
                        B::lsl_imm(self.buf, t, d, n);
                    } else if n == bits {
                        // The whole operand shifts out; arithmetic keeps
                        // the replicated sign.
                        if arith {
                            B::sbfx(self.buf, t, d, bits - 1, 1);
                        } else {
                            B::mov_imm(self.buf, t, 0);
                        }
                    } else if arith {
                        B::sbfx(self.buf, t, d, n, bits - n);
                    } else {
                        B::ubfx(self.buf, t, d, n, bits - n);
                    }
                    B::bfi(self.buf, d, t, 0, bits);
                    cc::begin_update::<B>(self.buf, &mut self.regs, update);
                    cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, t, bits);
                    self.regs.free(t);
                }
                if let Some(c) = carry {
                    cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, c);
                    cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::X, c);
                    self.regs.free(c);
                }
            }
            Kind::Rotate => {
                let val = if bits == 32 {
                    B::ror_imm(self.buf, d, d, if left { 32 - n } else { n });
                    d
                } else {
                    let t = self.dup_in_width(d, bits);
                    // The duplicated pattern has period `bits`, so a plain
                    // 32-bit rotate realises the in-width rotation.
                    B::ror_imm(self.buf, t, t, if left { 32 - n } else { n });
                    B::bfi(self.buf, d, t, 0, bits);
                    t
                };
                let carry = if update.contains(CcMask::C) {
                    let c = self.regs.alloc_temp::<B>(self.buf);
                    B::extract_bit(self.buf, c, val, if left { 0 } else { bits - 1 });
                    Some(c)
                } else {
                    None
                };
                cc::begin_update::<B>(self.buf, &mut self.regs, update);
                cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, val, bits);
                if let Some(c) = carry {
                    cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, c);
                    self.regs.free(c);
                }
                if val != d {
                    self.regs.free(val);
                }
            }
            Kind::RotateX => {
                let x = cc::extract_x::<B>(self.buf, &mut self.regs);
                if bits < 32 {
                    let tb = bits + 1;
                    let t = self.regs.alloc_temp::<B>(self.buf);
                    B::ubfx(self.buf, t, d, 0, bits);
                    B::bfi(self.buf, t, x, bits, 1);
                    let r = self.regs.alloc_temp::<B>(self.buf);
                    if left {
                        B::lsl_imm(self.buf, r, t, n);
                        B::orr_shifted(self.buf, r, r, t, Shift::Lsr, tb - n);
                    } else {
                        B::lsr_imm(self.buf, r, t, n);
                        B::orr_shifted(self.buf, r, r, t, Shift::Lsl, tb - n);
                    }
                    B::extract_bit(self.buf, x, r, bits);
                    B::bfi(self.buf, d, r, 0, bits);
                    cc::begin_update::<B>(self.buf, &mut self.regs, update);
                    cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, r, bits);
                    self.regs.free(r);
                    self.regs.free(t);
                } else {
                    let w = self.regs.alloc_wide::<B>(self.buf);
                    B::wide_zext(self.buf, w, d);
                    B::wide_bfi_bit(self.buf, w, x, 32);
                    let w2 = self.regs.alloc_wide::<B>(self.buf);
                    if left {
                        B::wide_shift_imm(self.buf, Shift::Lsl, w2, w, n);
                        B::wide_shift_imm(self.buf, Shift::Lsr, w, w, 33 - n);
                    } else {
                        B::wide_shift_imm(self.buf, Shift::Lsr, w2, w, n);
                        B::wide_shift_imm(self.buf, Shift::Lsl, w, w, 33 - n);
                    }
                    B::wide_orr(self.buf, w2, w2, w);
                    B::wide_extract_bit(self.buf, x, w2, 32);
                    B::wide_lo(self.buf, d, w2);
                    self.regs.free_wide::<B>(w2);
                    self.regs.free_wide::<B>(w);
                    cc::begin_update::<B>(self.buf, &mut self.regs, update);
                    cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, d, 32);
                }
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, x);
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::X, x);
                self.regs.free(x);
            }
        }
    }

    /// Register-count form: the count comes from a data register mod 64.
    fn shift_reg_var(&mut self, kind: Kind, left: bool, bits: u32, reg: u8, count_reg: u8, mut update: CcMask) {
        let d = self.regs.map_rmw::<B>(self.buf, regalloc::dreg(reg));
        let cnt = self.regs.map_read::<B>(self.buf, regalloc::dreg(count_reg));
        let c = self.regs.alloc_temp::<B>(self.buf);
        B::and_imm(self.buf, c, cnt, 63);

        match kind {
            Kind::Arith | Kind::Logical => {
                let arith_right = kind == Kind::Arith && !left;
                let w = self.regs.alloc_wide::<B>(self.buf);
                if bits == 32 {
                    if arith_right {
                        B::wide_sext(self.buf, w, d);
                    } else {
                        B::wide_zext(self.buf, w, d);
                    }
                } else {
                    let t = self.regs.alloc_temp::<B>(self.buf);
                    if arith_right {
                        B::sbfx(self.buf, t, d, 0, bits);
                        B::wide_sext(self.buf, w, t);
                    } else {
                        B::ubfx(self.buf, t, d, 0, bits);
                        B::wide_zext(self.buf, w, t);
                    }
                    self.regs.free(t);
                }

                let carry = self.regs.alloc_temp::<B>(self.buf);
                if left {
                    B::wide_shift_var(self.buf, Shift::Lsl, w, w, c);
                    B::wide_extract_bit(self.buf, carry, w, bits);
                } else {
                    // The bit at count-1 of the widened operand; for a
                    // zero count this reads bit 63, which is clean for
                    // the zero-extended kinds and the sign for ASR.
                    let cm1 = self.regs.alloc_temp::<B>(self.buf);
                    B::add_const(self.buf, cm1, c, -1);
                    B::and_imm(self.buf, cm1, cm1, 63);
                    let wc = self.regs.alloc_wide::<B>(self.buf);
                    B::wide_shift_var(self.buf, Shift::Lsr, wc, w, cm1);
                    B::wide_lo(self.buf, carry, wc);
                    B::and_imm(self.buf, carry, carry, 1);
                    self.regs.free_wide::<B>(wc);
                    self.regs.free(cm1);
                    let host_kind = if arith_right { Shift::Asr } else { Shift::Lsr };
                    B::wide_shift_var(self.buf, host_kind, w, w, c);
                }

                let nz_src = if bits == 32 {
                    B::wide_lo(self.buf, d, w);
                    None
                } else {
                    let t = self.regs.alloc_temp::<B>(self.buf);
                    B::wide_lo(self.buf, t, w);
                    B::bfi(self.buf, d, t, 0, bits);
                    Some(t)
                };
                self.regs.free_wide::<B>(w);

                cc::begin_update::<B>(self.buf, &mut self.regs, update);
                let nz_reg = nz_src.unwrap_or(d);
                cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, nz_reg, bits);
                if let Some(t) = nz_src {
                    self.regs.free(t);
                }
                if update.intersects(CcMask::C | CcMask::X) {
                    B::cmp_imm(self.buf, c, 0);
                    if arith_right {
                        // ASR's candidate carry is the sign; a zero count
                        // must still read C = 0.
                        B::zero_if(self.buf, Cond::Eq, carry);
                    }
                    if update.contains(CcMask::X) {
                        let xv = cc::extract_x::<B>(self.buf, &mut self.regs);
                        B::csel_move(self.buf, Cond::Ne, xv, carry);
                        cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::X, xv);
                        self.regs.free(xv);
                    }
                    cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, carry);
                }
                self.regs.free(carry);
                self.regs.free(c);
            }
            Kind::Rotate => {
                let val = if bits == 32 { d } else { self.dup_in_width(d, bits) };
                if left {
                    // Left by c is right by 32-c; the host reduces the
                    // amount mod 32, which matches the pattern period.
                    let amt = self.regs.alloc_temp::<B>(self.buf);
                    B::rsb_const(self.buf, amt, c, 32);
                    B::shift_var(self.buf, Shift::Ror, val, val, amt);
                    self.regs.free(amt);
                } else {
                    B::shift_var(self.buf, Shift::Ror, val, val, c);
                }
                let carry = if update.contains(CcMask::C) {
                    let cb = self.regs.alloc_temp::<B>(self.buf);
                    B::extract_bit(self.buf, cb, val, if left { 0 } else { bits - 1 });
                    B::cmp_imm(self.buf, c, 0);
                    B::zero_if(self.buf, Cond::Eq, cb);
                    Some(cb)
                } else {
                    None
                };
                if bits < 32 {
                    B::bfi(self.buf, d, val, 0, bits);
                }
                cc::begin_update::<B>(self.buf, &mut self.regs, update);
                cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, val, bits);
                if let Some(cb) = carry {
                    cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, cb);
                    self.regs.free(cb);
                }
                if val != d {
                    self.regs.free(val);
                }
                self.regs.free(c);
            }
            Kind::RotateX => {
                let tb = bits + 1;
                let m = self.regs.alloc_temp::<B>(self.buf);
                let tbr = self.regs.alloc_temp::<B>(self.buf);
                B::mov_imm(self.buf, tbr, tb);
                B::umod(self.buf, m, c, tbr);
                self.regs.free(tbr);
                // The raw count is folded into the reduced one; free it
                // before the wide temporaries are taken.
                self.regs.free(c);

                let x = cc::extract_x::<B>(self.buf, &mut self.regs);
                if bits < 32 {
                    let t = self.regs.alloc_temp::<B>(self.buf);
                    B::ubfx(self.buf, t, d, 0, bits);
                    B::bfi(self.buf, t, x, bits, 1);
                    let inv = self.regs.alloc_temp::<B>(self.buf);
                    B::rsb_const(self.buf, inv, m, tb);
                    let r = self.regs.alloc_temp::<B>(self.buf);
                    if left {
                        B::shift_var(self.buf, Shift::Lsl, r, t, m);
                        B::shift_var(self.buf, Shift::Lsr, t, t, inv);
                    } else {
                        B::shift_var(self.buf, Shift::Lsr, r, t, m);
                        B::shift_var(self.buf, Shift::Lsl, t, t, inv);
                    }
                    B::orr_reg(self.buf, r, r, t);
                    B::extract_bit(self.buf, x, r, bits);
                    B::bfi(self.buf, d, r, 0, bits);
                    cc::begin_update::<B>(self.buf, &mut self.regs, update);
                    cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, r, bits);
                    self.regs.free(r);
                    self.regs.free(inv);
                    self.regs.free(t);
                } else {
                    let w = self.regs.alloc_wide::<B>(self.buf);
                    B::wide_zext(self.buf, w, d);
                    B::wide_bfi_bit(self.buf, w, x, 32);
                    let inv = self.regs.alloc_temp::<B>(self.buf);
                    B::rsb_const(self.buf, inv, m, 33);
                    let w2 = self.regs.alloc_wide::<B>(self.buf);
                    if left {
                        B::wide_shift_var(self.buf, Shift::Lsl, w2, w, m);
                        B::wide_shift_var(self.buf, Shift::Lsr, w, w, inv);
                    } else {
                        B::wide_shift_var(self.buf, Shift::Lsr, w2, w, m);
                        B::wide_shift_var(self.buf, Shift::Lsl, w, w, inv);
                    }
                    B::wide_orr(self.buf, w2, w2, w);
                    B::wide_extract_bit(self.buf, x, w2, 32);
                    B::wide_lo(self.buf, d, w2);
                    self.regs.free_wide::<B>(w2);
                    self.regs.free(inv);
                    self.regs.free_wide::<B>(w);
                    cc::begin_update::<B>(self.buf, &mut self.regs, update);
                    cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, d, 32);
                }
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, x);
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::X, x);
                self.regs.free(x);
                self.regs.free(m);
            }
        }
    }

    /// Memory form: word-sized, single-position shift of an alterable
    /// memory operand, big-endian in guest memory.
    pub(crate) fn emit_shift_mem(
        &mut self,
        op: u16,
        stream: &mut GuestStream<'_>,
    ) -> Result<(), TranslateError> {
        let kind = Kind::from_bits(op >> 9);
        let left = op & 0x0100 != 0;
        let mode = ((op >> 3) & 7) as u8;
        let reg = (op & 7) as u8;
        let mut update = self.update_mask & kind.sets();

        let before = stream.consumed();
        let val = self.regs.alloc_temp::<B>(self.buf);
        // Postincrement folds into a post-indexed store, predecrement into
        // a pre-indexed load; everything else goes through the EA emitter.
        let addr = match mode {
            3 => {
                let an = self.regs.map_rmw::<B>(self.buf, regalloc::areg(reg));
                B::ldrh(self.buf, val, an, 0);
                None
            }
            4 => {
                let an = self.regs.map_rmw::<B>(self.buf, regalloc::areg(reg));
                B::ldrh_pre(self.buf, val, an, -2);
                None
            }
            _ => {
                let a = self.regs.alloc_temp::<B>(self.buf);
                ea::load_ea::<B>(self.buf, &mut self.regs, mode, reg, stream, a, 2)?;
                B::ldrh(self.buf, val, a, 0);
                Some(a)
            }
        };
        let ext_words = stream.consumed() - before;
        B::rev16(self.buf, val, val);

        // Single-position shift; the carry position is fixed.
        let carry = match kind {
            Kind::Arith | Kind::Logical => {
                let c = self.regs.alloc_temp::<B>(self.buf);
                B::extract_bit(self.buf, c, val, if left { 15 } else { 0 });
                if left {
                    B::lsl_imm(self.buf, val, val, 1);
                } else if kind == Kind::Arith {
                    B::sbfx(self.buf, val, val, 1, 15);
                } else {
                    B::ubfx(self.buf, val, val, 1, 15);
                }
                Some(c)
            }
            Kind::Rotate => {
                let t = self.regs.alloc_temp::<B>(self.buf);
                if left {
                    B::lsl_imm(self.buf, t, val, 1);
                    B::orr_shifted(self.buf, t, t, val, Shift::Lsr, 15);
                } else {
                    B::lsr_imm(self.buf, t, val, 1);
                    B::orr_shifted(self.buf, t, t, val, Shift::Lsl, 15);
                }
                B::mov_reg(self.buf, val, t);
                self.regs.free(t);
                let c = self.regs.alloc_temp::<B>(self.buf);
                B::extract_bit(self.buf, c, val, if left { 0 } else { 15 });
                Some(c)
            }
            Kind::RotateX => {
                let x = cc::extract_x::<B>(self.buf, &mut self.regs);
                B::bfi(self.buf, val, x, 16, 1);
                let t = self.regs.alloc_temp::<B>(self.buf);
                if left {
                    B::lsl_imm(self.buf, t, val, 1);
                    B::orr_shifted(self.buf, t, t, val, Shift::Lsr, 16);
                } else {
                    B::lsr_imm(self.buf, t, val, 1);
                    B::orr_shifted(self.buf, t, t, val, Shift::Lsl, 16);
                }
                B::mov_reg(self.buf, val, t);
                self.regs.free(t);
                B::extract_bit(self.buf, x, val, 16);
                Some(x)
            }
        };

        cc::begin_update::<B>(self.buf, &mut self.regs, update);
        cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, val, 16);
        if let Some(c) = carry {
            cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, c);
            if kind != Kind::Rotate {
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::X, c);
            }
            self.regs.free(c);
        }

        B::rev16(self.buf, val, val);
        match (addr, mode) {
            (None, 3) => {
                let an = self.regs.map_rmw::<B>(self.buf, regalloc::areg(reg));
                B::strh_post(self.buf, val, an, 2);
            }
            (None, _) => {
                let an = self.regs.map_rmw::<B>(self.buf, regalloc::areg(reg));
                B::strh(self.buf, val, an, 0);
            }
            (Some(a), _) => {
                B::strh(self.buf, val, a, 0);
                self.regs.free(a);
            }
        }
        self.regs.free(val);
        self.advance_pc(2 * (1 + ext_words as i32));
        Ok(())
    }

    /// Replicate the low `bits` of `d` across a fresh 32-bit temporary.
    fn dup_in_width(&mut self, d: u8, bits: u32) -> u8 {
        let t = self.regs.alloc_temp::<B>(self.buf);
        B::ubfx(self.buf, t, d, 0, bits);
        B::orr_shifted(self.buf, t, t, t, Shift::Lsl, bits);
        if bits == 8 {
            B::orr_shifted(self.buf, t, t, t, Shift::Lsl, 16);
        }
        t
    }
}
