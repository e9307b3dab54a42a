//! Bit-field emitters (group 0xE, size 11, bit 11 set): BFTST, BFEXTU,
//! BFEXTS, BFCHG, BFCLR, BFSET, BFINS, BFFFO.
//!
//! Extension word: bits 14-12 name the data register for forms with a
//! register operand (destination for the extractions and BFFFO, source
//! for BFINS); bit 11 selects a register-sourced offset (bits 8-6) over
//! an immediate (bits 10-6); bit 5 does the same for width (bits 2-0 /
//! 4-0). An immediate width of 0 means 32, and a register width reduces
//! mod 32 with 0 meaning 32.
//!
//! Register operands count the offset from the register MSB, so a left
//! rotation by the offset top-aligns the field; the rotated value is then
//! widened into the 64-bit temporary the memory path also uses. Memory
//! operands use one 64-bit byte-based load: any field of up to 32 bits at
//! any in-byte offset fits, straddling 32-bit boundaries included. The
//! reading forms align the field to bit 63; the mutating forms leave the
//! loaded value in place and apply a positioned mask so the surrounding
//! memory bits survive the read-modify-write.

use crate::backend::HostEmit;
use crate::cc::{self, CcMask};
use crate::ea;
use crate::entry::Translator;
use crate::regalloc::{self, RegAlloc};
use crate::stream::{GuestStream, TranslateError};
use arm_asm::{Cond, Shift};

/// Offset or width operand: immediate, or indirected through a data
/// register.
#[derive(Debug, Clone, Copy)]
enum BfSpec {
    Imm(u32),
    Reg(u8),
}

fn parse_offset(op2: u16) -> BfSpec {
    if op2 & 0x0800 != 0 {
        BfSpec::Reg(((op2 >> 6) & 7) as u8)
    } else {
        BfSpec::Imm(u32::from((op2 >> 6) & 31))
    }
}

fn parse_width(op2: u16) -> BfSpec {
    if op2 & 0x0020 != 0 {
        BfSpec::Reg((op2 & 7) as u8)
    } else {
        let w = u32::from(op2 & 31);
        BfSpec::Imm(if w == 0 { 32 } else { w })
    }
}

/// Width as the emitters consume it: a constant 1..=32, or a temporary
/// already normalised to that range.
enum WidthVal {
    Imm(u32),
    Reg(u8),
}

impl WidthVal {
    fn free(self, regs: &mut RegAlloc) {
        if let Self::Reg(t) = self {
            regs.free(t);
        }
    }
}

/// Reading bit-field operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BfRead {
    Tst,
    Extu,
    Exts,
    Ffo,
}

/// Mutating bit-field operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BfModify {
    Chg,
    Clr,
    Set,
    Ins,
}

/// The low `width` ones, width 1..=32.
fn low_run32(width: u32) -> u32 {
    debug_assert!((1..=32).contains(&width));
    ((1u64 << width) - 1) as u32
}

impl<B: HostEmit> Translator<'_, B> {
    pub(crate) fn emit_bftst(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_read(op, stream, BfRead::Tst)
    }

    pub(crate) fn emit_bfextu(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_read(op, stream, BfRead::Extu)
    }

    pub(crate) fn emit_bfexts(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_read(op, stream, BfRead::Exts)
    }

    pub(crate) fn emit_bfffo(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_read(op, stream, BfRead::Ffo)
    }

    pub(crate) fn emit_bfchg(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_modify(op, stream, BfModify::Chg)
    }

    pub(crate) fn emit_bfclr(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_modify(op, stream, BfModify::Clr)
    }

    pub(crate) fn emit_bfset(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_modify(op, stream, BfModify::Set)
    }

    pub(crate) fn emit_bfins(&mut self, op: u16, stream: &mut GuestStream<'_>) -> Result<(), TranslateError> {
        self.bf_modify(op, stream, BfModify::Ins)
    }

    /// Normalise a width spec; register widths map 0 to 32 via
    /// `((w - 1) & 31) + 1`.
    fn width_val(&mut self, width: BfSpec) -> WidthVal {
        match width {
            BfSpec::Imm(w) => WidthVal::Imm(w),
            BfSpec::Reg(g) => {
                let raw = self.regs.map_read::<B>(self.buf, regalloc::dreg(g));
                let t = self.regs.alloc_temp::<B>(self.buf);
                B::add_const(self.buf, t, raw, -1);
                B::and_imm(self.buf, t, t, 31);
                B::add_const(self.buf, t, t, 1);
                WidthVal::Reg(t)
            }
        }
    }

    /// Rotate Dn so the field starts at the top, in a fresh temporary.
    fn rotate_field_to_top(&mut self, d: u8, offset: BfSpec) -> u8 {
        let rot = self.regs.alloc_temp::<B>(self.buf);
        match offset {
            BfSpec::Imm(o) => B::ror_imm(self.buf, rot, d, (32 - o) % 32),
            BfSpec::Reg(g) => {
                let or = self.regs.map_read::<B>(self.buf, regalloc::dreg(g));
                let amt = self.regs.alloc_temp::<B>(self.buf);
                B::rsb_const(self.buf, amt, or, 32);
                B::shift_var(self.buf, Shift::Ror, rot, d, amt);
                self.regs.free(amt);
            }
        }
        rot
    }

    /// Memory operand: byte-granular 64-bit load, swapped to big-endian
    /// bit order. Returns the loaded wide register, the address register
    /// (kept alive for the writeback forms) and the residual bit offset.
    fn bf_field_from_mem(
        &mut self,
        mode: u8,
        reg: u8,
        offset: BfSpec,
        stream: &mut GuestStream<'_>,
    ) -> Result<(u8, u8, BfSpec), TranslateError> {
        let addr = self.regs.alloc_temp::<B>(self.buf);
        ea::load_ea::<B>(self.buf, &mut self.regs, mode, reg, stream, addr, 4)?;
        let residual = match offset {
            BfSpec::Imm(o) => {
                if o >> 3 != 0 {
                    B::add_const(self.buf, addr, addr, (o >> 3) as i32);
                }
                BfSpec::Imm(o & 7)
            }
            BfSpec::Reg(g) => {
                // Signed offset: the byte advance is an arithmetic shift,
                // the residual the low three bits.
                let or = self.regs.map_read::<B>(self.buf, regalloc::dreg(g));
                let t = self.regs.alloc_temp::<B>(self.buf);
                B::asr_imm(self.buf, t, or, 3);
                B::add_reg(self.buf, addr, addr, t);
                B::and_imm(self.buf, t, or, 7);
                BfSpec::Reg(t)
            }
        };
        let w = self.regs.alloc_wide::<B>(self.buf);
        B::wide_load(self.buf, w, addr);
        B::wide_rev(self.buf, w, w);
        Ok((w, addr, residual))
    }

    /// Shared path for BFTST/BFEXTU/BFEXTS/BFFFO.
    fn bf_read(&mut self, op: u16, stream: &mut GuestStream<'_>, kind: BfRead) -> Result<(), TranslateError> {
        let op2 = stream.next_word()?;
        let before = stream.consumed();
        let offset = parse_offset(op2);
        let width = parse_width(op2);
        let dn = ((op2 >> 12) & 7) as u8;
        let mode = ((op >> 3) & 7) as u8;
        let reg = (op & 7) as u8;
        let mut update = self.update_mask & CcMask::NZVC;

        // Field aligned to bit 63 of a wide temporary.
        let w = if mode == 0 {
            let d = self.regs.map_read::<B>(self.buf, regalloc::dreg(reg));
            let rot = self.rotate_field_to_top(d, offset);
            let w = self.regs.alloc_wide::<B>(self.buf);
            B::wide_dup(self.buf, w, rot);
            self.regs.free(rot);
            w
        } else {
            let (w, addr, residual) = self.bf_field_from_mem(mode, reg, offset, stream)?;
            self.regs.free(addr);
            match residual {
                BfSpec::Imm(0) => {}
                BfSpec::Imm(r) => B::wide_shift_imm(self.buf, Shift::Lsl, w, w, r),
                BfSpec::Reg(t) => {
                    B::wide_shift_var(self.buf, Shift::Lsl, w, w, t);
                    self.regs.free(t);
                }
            }
            w
        };
        let ext_words = stream.consumed() - before;

        let wv = self.width_val(width);

        // Right-justified field, sign- or zero-extended; the extractions
        // read it and the zero test runs on it.
        let need_rj = matches!(kind, BfRead::Extu | BfRead::Exts) || update.contains(CcMask::Z);
        let rj = if need_rj {
            let rj = self.regs.alloc_wide::<B>(self.buf);
            let host_kind = if kind == BfRead::Exts { Shift::Asr } else { Shift::Lsr };
            match &wv {
                WidthVal::Imm(wd) => B::wide_shift_imm(self.buf, host_kind, rj, w, 64 - wd),
                WidthVal::Reg(t) => {
                    let inv = self.regs.alloc_temp::<B>(self.buf);
                    B::rsb_const(self.buf, inv, *t, 64);
                    B::wide_shift_var(self.buf, host_kind, rj, w, inv);
                    self.regs.free(inv);
                }
            }
            Some(rj)
        } else {
            None
        };

        cc::begin_update::<B>(self.buf, &mut self.regs, update);
        if update.contains(CcMask::N) {
            let nb = self.regs.alloc_temp::<B>(self.buf);
            B::wide_extract_bit(self.buf, nb, w, 63);
            cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::N, nb);
            self.regs.free(nb);
        }
        if update.contains(CcMask::Z) {
            let ccr = self.regs.modify_cc::<B>(self.buf);
            let rj = rj.expect("zero test requires the justified field");
            B::wide_test_zero(self.buf, rj);
            B::orr_bit_if(self.buf, Cond::Eq, ccr, CcMask::Z.bits().into());
            update.remove(CcMask::Z);
        }

        match kind {
            BfRead::Tst => {}
            BfRead::Extu | BfRead::Exts => {
                let dst = self.regs.map_write::<B>(self.buf, regalloc::dreg(dn));
                let rj = rj.expect("extraction requires the justified field");
                B::wide_lo(self.buf, dst, rj);
            }
            BfRead::Ffo => {}
        }
        if let Some(rj) = rj {
            self.regs.free_wide::<B>(rj);
        }

        if kind == BfRead::Ffo {
            // Force everything below the field to 1 so the leading zero
            // count stops at the field end, then add the offset back.
            match &wv {
                WidthVal::Imm(wd) => {
                    B::wide_orr_mask(self.buf, w, w, (1u64 << (64 - wd)) - 1);
                }
                WidthVal::Reg(t) => {
                    let ones = self.regs.alloc_wide::<B>(self.buf);
                    let inv = self.regs.alloc_temp::<B>(self.buf);
                    B::mov_imm(self.buf, inv, 1);
                    B::wide_zext(self.buf, ones, inv);
                    B::rsb_const(self.buf, inv, *t, 64);
                    B::wide_shift_var(self.buf, Shift::Lsl, ones, ones, inv);
                    B::wide_sub_const(self.buf, ones, ones, 1);
                    B::wide_orr(self.buf, w, w, ones);
                    self.regs.free(inv);
                    self.regs.free_wide::<B>(ones);
                }
            }
            let dst = self.regs.map_write::<B>(self.buf, regalloc::dreg(dn));
            B::wide_clz(self.buf, dst, w);
            match offset {
                BfSpec::Imm(o) => {
                    if o != 0 {
                        B::add_const(self.buf, dst, dst, o as i32);
                    }
                }
                BfSpec::Reg(g) => {
                    let or = self.regs.map_read::<B>(self.buf, regalloc::dreg(g));
                    B::add_reg(self.buf, dst, dst, or);
                }
            }
        }

        self.regs.free_wide::<B>(w);
        wv.free(&mut self.regs);
        self.advance_pc(2 * (2 + ext_words as i32));
        Ok(())
    }

    /// Shared path for BFCHG/BFCLR/BFSET/BFINS.
    fn bf_modify(&mut self, op: u16, stream: &mut GuestStream<'_>, kind: BfModify) -> Result<(), TranslateError> {
        let op2 = stream.next_word()?;
        let before = stream.consumed();
        let offset = parse_offset(op2);
        let width = parse_width(op2);
        let src_reg = ((op2 >> 12) & 7) as u8;
        let mode = ((op >> 3) & 7) as u8;
        let reg = (op & 7) as u8;
        let update = self.update_mask & CcMask::NZVC;

        if mode == 0 {
            self.bf_modify_reg(kind, reg, offset, width, src_reg, update);
        } else {
            self.bf_modify_mem(kind, mode, reg, offset, width, src_reg, update, stream)?;
        }
        let ext_words = stream.consumed() - before;
        self.advance_pc(2 * (2 + ext_words as i32));
        Ok(())
    }

    /// BFINS condition codes come from the inserted value: left-justify
    /// the low `width` bits of the source and test in 32 bits.
    fn ins_flags(&mut self, src: u8, wv: &WidthVal, mut update: CcMask) {
        if update.is_empty() {
            return;
        }
        let t = self.regs.alloc_temp::<B>(self.buf);
        match wv {
            WidthVal::Imm(wd) => B::lsl_imm(self.buf, t, src, 32 - wd),
            WidthVal::Reg(wreg) => {
                let inv = self.regs.alloc_temp::<B>(self.buf);
                B::rsb_const(self.buf, inv, *wreg, 32);
                B::shift_var(self.buf, Shift::Lsl, t, src, inv);
                self.regs.free(inv);
            }
        }
        cc::begin_update::<B>(self.buf, &mut self.regs, update);
        cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, t, 32);
        self.regs.free(t);
    }

    /// Register destination: the mask is a rotated 32-bit run, so each
    /// modification is one masked logical operation on Dn.
    fn bf_modify_reg(&mut self, kind: BfModify, reg: u8, offset: BfSpec, width: BfSpec, src_reg: u8, mut update: CcMask) {
        let d = self.regs.map_rmw::<B>(self.buf, regalloc::dreg(reg));
        let wv = self.width_val(width);

        // Flags reflect the field before modification (BFINS: the
        // inserted value), left-justified so one 32-bit test covers both.
        if kind == BfModify::Ins {
            let src = self.regs.map_read::<B>(self.buf, regalloc::dreg(src_reg));
            self.ins_flags(src, &wv, update);
        } else if !update.is_empty() {
            let t = self.rotate_field_to_top(d, offset);
            match &wv {
                WidthVal::Imm(32) => {}
                WidthVal::Imm(wd) => B::bic_imm(self.buf, t, t, low_run32(32 - wd)),
                WidthVal::Reg(wreg) => {
                    let inv = self.regs.alloc_temp::<B>(self.buf);
                    B::rsb_const(self.buf, inv, *wreg, 32);
                    B::shift_var(self.buf, Shift::Lsr, t, t, inv);
                    B::shift_var(self.buf, Shift::Lsl, t, t, inv);
                    self.regs.free(inv);
                }
            }
            cc::begin_update::<B>(self.buf, &mut self.regs, update);
            cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, t, 32);
            self.regs.free(t);
        }

        match (offset, &wv) {
            (BfSpec::Imm(o), WidthVal::Imm(wd)) => {
                let run = low_run32(*wd);
                let mask = run.rotate_right((o + wd) & 31);
                match kind {
                    BfModify::Chg => B::eor_imm(self.buf, d, d, mask),
                    BfModify::Clr => B::bic_imm(self.buf, d, d, mask),
                    BfModify::Set => B::orr_imm(self.buf, d, d, mask),
                    BfModify::Ins => {
                        let src = self.regs.map_read::<B>(self.buf, regalloc::dreg(src_reg));
                        let val = self.regs.alloc_temp::<B>(self.buf);
                        B::and_imm(self.buf, val, src, run);
                        B::ror_imm(self.buf, val, val, (o + wd) & 31);
                        B::bic_imm(self.buf, d, d, mask);
                        B::orr_reg(self.buf, d, d, val);
                        self.regs.free(val);
                    }
                }
            }
            _ => {
                // Rotation amount (offset + width) mod 32; the host rotate
                // reduces the sum itself.
                let s = self.regs.alloc_temp::<B>(self.buf);
                match (offset, &wv) {
                    (BfSpec::Imm(o), WidthVal::Reg(wreg)) => {
                        B::add_const(self.buf, s, *wreg, o as i32);
                    }
                    (BfSpec::Reg(g), WidthVal::Imm(wd)) => {
                        let or = self.regs.map_read::<B>(self.buf, regalloc::dreg(g));
                        B::add_const(self.buf, s, or, *wd as i32);
                    }
                    (BfSpec::Reg(g), WidthVal::Reg(wreg)) => {
                        let or = self.regs.map_read::<B>(self.buf, regalloc::dreg(g));
                        B::add_reg(self.buf, s, or, *wreg);
                    }
                    (BfSpec::Imm(_), WidthVal::Imm(_)) => unreachable!(),
                }
                let mask = self.regs.alloc_temp::<B>(self.buf);
                match &wv {
                    WidthVal::Imm(wd) => B::mov_imm(self.buf, mask, low_run32(*wd)),
                    WidthVal::Reg(wreg) => B::mask_low_var(self.buf, mask, *wreg),
                }
                match kind {
                    BfModify::Ins => {
                        let src = self.regs.map_read::<B>(self.buf, regalloc::dreg(src_reg));
                        let val = self.regs.alloc_temp::<B>(self.buf);
                        B::and_reg(self.buf, val, src, mask);
                        B::shift_var(self.buf, Shift::Ror, val, val, s);
                        B::shift_var(self.buf, Shift::Ror, mask, mask, s);
                        B::bic_reg(self.buf, d, d, mask);
                        B::orr_reg(self.buf, d, d, val);
                        self.regs.free(val);
                    }
                    _ => {
                        B::shift_var(self.buf, Shift::Ror, mask, mask, s);
                        match kind {
                            BfModify::Chg => B::eor_reg(self.buf, d, d, mask),
                            BfModify::Clr => B::bic_reg(self.buf, d, d, mask),
                            BfModify::Set => B::orr_reg(self.buf, d, d, mask),
                            BfModify::Ins => unreachable!(),
                        }
                    }
                }
                self.regs.free(mask);
                self.regs.free(s);
            }
        }
        wv.free(&mut self.regs);
    }

    /// Memory destination: read-modify-write of the 64-bit window with a
    /// positioned mask, leaving the surrounding bits intact.
    #[allow(clippy::too_many_arguments)]
    fn bf_modify_mem(
        &mut self,
        kind: BfModify,
        mode: u8,
        reg: u8,
        offset: BfSpec,
        width: BfSpec,
        src_reg: u8,
        mut update: CcMask,
        stream: &mut GuestStream<'_>,
    ) -> Result<(), TranslateError> {
        let (w, addr, residual) = self.bf_field_from_mem(mode, reg, offset, stream)?;
        let wv = self.width_val(width);

        if kind == BfModify::Ins {
            let src = self.regs.map_read::<B>(self.buf, regalloc::dreg(src_reg));
            self.ins_flags(src, &wv, update);
        } else if !update.is_empty() {
            // Field copy aligned to the top for the N/Z tests.
            let wt = self.regs.alloc_wide::<B>(self.buf);
            match residual {
                BfSpec::Imm(0) => B::wide_mov(self.buf, wt, w),
                BfSpec::Imm(r) => B::wide_shift_imm(self.buf, Shift::Lsl, wt, w, r),
                BfSpec::Reg(t) => B::wide_shift_var(self.buf, Shift::Lsl, wt, w, t),
            }
            cc::begin_update::<B>(self.buf, &mut self.regs, update);
            if update.contains(CcMask::N) {
                let nb = self.regs.alloc_temp::<B>(self.buf);
                B::wide_extract_bit(self.buf, nb, wt, 63);
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::N, nb);
                self.regs.free(nb);
            }
            if update.contains(CcMask::Z) {
                match &wv {
                    WidthVal::Imm(wd) => B::wide_shift_imm(self.buf, Shift::Lsr, wt, wt, 64 - wd),
                    WidthVal::Reg(wreg) => {
                        let inv = self.regs.alloc_temp::<B>(self.buf);
                        B::rsb_const(self.buf, inv, *wreg, 64);
                        B::wide_shift_var(self.buf, Shift::Lsr, wt, wt, inv);
                        self.regs.free(inv);
                    }
                }
                let ccr = self.regs.modify_cc::<B>(self.buf);
                B::wide_test_zero(self.buf, wt);
                B::orr_bit_if(self.buf, Cond::Eq, ccr, CcMask::Z.bits().into());
                update.remove(CcMask::Z);
            }
            self.regs.free_wide::<B>(wt);
        }

        match (residual, wv) {
            (BfSpec::Imm(r), WidthVal::Imm(wd)) => {
                let shift = 64 - r - wd;
                let mask = ((1u64 << wd) - 1) << shift;
                match kind {
                    BfModify::Chg => B::wide_eor_mask(self.buf, w, w, mask),
                    BfModify::Clr => B::wide_bic_mask(self.buf, w, w, mask),
                    BfModify::Set => B::wide_orr_mask(self.buf, w, w, mask),
                    BfModify::Ins => {
                        let src = self.regs.map_read::<B>(self.buf, regalloc::dreg(src_reg));
                        let t = self.regs.alloc_temp::<B>(self.buf);
                        B::ubfx(self.buf, t, src, 0, wd);
                        let wvv = self.regs.alloc_wide::<B>(self.buf);
                        B::wide_zext(self.buf, wvv, t);
                        self.regs.free(t);
                        B::wide_shift_imm(self.buf, Shift::Lsl, wvv, wvv, shift);
                        B::wide_bic_mask(self.buf, w, w, mask);
                        B::wide_orr(self.buf, w, w, wvv);
                        self.regs.free_wide::<B>(wvv);
                    }
                }
            }
            (residual, wv) => {
                // Position shift 64 - residual - width, 25..=63. The
                // residual and width temporaries die before any wide pair
                // is taken, keeping aligned pairs available on the pair
                // backend.
                let amt = self.regs.alloc_temp::<B>(self.buf);
                match (residual, &wv) {
                    (BfSpec::Imm(r), WidthVal::Reg(wreg)) => {
                        B::rsb_const(self.buf, amt, *wreg, 64 - r);
                    }
                    (BfSpec::Reg(t), WidthVal::Imm(wd)) => {
                        B::rsb_const(self.buf, amt, t, 64 - wd);
                        self.regs.free(t);
                    }
                    (BfSpec::Reg(t), WidthVal::Reg(wreg)) => {
                        B::rsb_const(self.buf, amt, t, 64);
                        B::sub_reg(self.buf, amt, amt, *wreg);
                        self.regs.free(t);
                    }
                    (BfSpec::Imm(_), WidthVal::Imm(_)) => unreachable!(),
                }
                let ml = self.regs.alloc_temp::<B>(self.buf);
                match &wv {
                    WidthVal::Imm(wd) => B::mov_imm(self.buf, ml, low_run32(*wd)),
                    WidthVal::Reg(wreg) => B::mask_low_var(self.buf, ml, *wreg),
                }
                wv.free(&mut self.regs);
                let wm = self.regs.alloc_wide::<B>(self.buf);
                B::wide_zext(self.buf, wm, ml);
                B::wide_shift_var(self.buf, Shift::Lsl, wm, wm, amt);
                match kind {
                    BfModify::Chg => B::wide_eor(self.buf, w, w, wm),
                    BfModify::Clr => B::wide_bic(self.buf, w, w, wm),
                    BfModify::Set => B::wide_orr(self.buf, w, w, wm),
                    BfModify::Ins => {
                        // Clear the field first, then rebuild the same
                        // pair as the positioned source value; the insert
                        // needs no second wide temporary.
                        let src = self.regs.map_read::<B>(self.buf, regalloc::dreg(src_reg));
                        B::wide_bic(self.buf, w, w, wm);
                        B::and_reg(self.buf, ml, src, ml);
                        B::wide_zext(self.buf, wm, ml);
                        B::wide_shift_var(self.buf, Shift::Lsl, wm, wm, amt);
                        B::wide_orr(self.buf, w, w, wm);
                    }
                }
                self.regs.free_wide::<B>(wm);
                self.regs.free(ml);
                self.regs.free(amt);
            }
        }

        B::wide_rev(self.buf, w, w);
        B::wide_store(self.buf, w, addr);
        self.regs.free_wide::<B>(w);
        self.regs.free(addr);
        Ok(())
    }
}
