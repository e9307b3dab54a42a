//! Effective-address emission for the memory operand forms.
//!
//! `load_ea` translates a 6-bit mode/register specifier (plus any brief
//! extension words) into host code that leaves the guest address in a
//! nominated host register, and reports the extension words it consumed.
//! Guest addresses are host addresses: the runtime maps guest memory
//! one-to-one.
//!
//! Predecrement and postincrement are not handled here — the memory
//! shift emitter folds those into pre-indexed loads and post-indexed
//! stores on the address register itself.

use crate::backend::HostEmit;
use crate::buffer::CodeBuffer;
use crate::regalloc::{self, RegAlloc};
use crate::stream::{GuestStream, TranslateError};

/// Guest operand size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    /// 8-bit.
    Byte,
    /// 16-bit.
    Word,
    /// 32-bit.
    Long,
}

impl Size {
    /// Operand width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Byte => 8,
            Self::Word => 16,
            Self::Long => 32,
        }
    }
}

/// Extension words a mode/register pair consumes, for the length query.
#[must_use]
pub fn ea_ext_words(mode: u8, reg: u8, size: Size) -> usize {
    match (mode & 7, reg & 7) {
        (0..=4, _) => 0,
        (5 | 6, _) => 1,
        (7, 0 | 2 | 3) => 1,
        (7, 1) => 2,
        (7, 4) => {
            if size == Size::Long {
                2
            } else {
                1
            }
        }
        _ => 0,
    }
}

/// Emit code leaving the effective address in `out`. `pc_bias` is the byte
/// offset of the extension word from the instruction start, the base the
/// 68000 uses for PC-relative modes.
pub fn load_ea<B: HostEmit>(
    buf: &mut CodeBuffer,
    regs: &mut RegAlloc,
    mode: u8,
    reg: u8,
    stream: &mut GuestStream<'_>,
    out: u8,
    pc_bias: i32,
) -> Result<(), TranslateError> {
    match (mode & 7, reg & 7) {
        (2, n) => {
            let an = regs.map_read::<B>(buf, regalloc::areg(n));
            B::mov_reg(buf, out, an);
        }
        (5, n) => {
            let disp = stream.next_word()? as i16;
            let an = regs.map_read::<B>(buf, regalloc::areg(n));
            B::add_const(buf, out, an, i32::from(disp));
        }
        (6, n) => {
            let ext = stream.next_word()?;
            let an = regs.map_read::<B>(buf, regalloc::areg(n));
            index_ea::<B>(buf, regs, out, an, ext);
        }
        (7, 0) => {
            let addr = stream.next_word()? as i16 as i32;
            B::mov_imm(buf, out, addr as u32);
        }
        (7, 1) => {
            let hi = stream.next_word()?;
            let lo = stream.next_word()?;
            B::mov_imm(buf, out, u32::from(hi) << 16 | u32::from(lo));
        }
        (7, 2) => {
            let disp = stream.next_word()? as i16;
            let pc = regs.map_read::<B>(buf, regalloc::PC);
            B::add_const(buf, out, pc, pc_bias + i32::from(disp));
        }
        (7, 3) => {
            let ext = stream.next_word()?;
            let pc = regs.map_read::<B>(buf, regalloc::PC);
            B::add_const(buf, out, pc, pc_bias);
            index_ea::<B>(buf, regs, out, out, ext);
        }
        (m, r) => return Err(TranslateError::InvalidEa { mode: m, reg: r }),
    }
    Ok(())
}

/// Brief extension word: D/A in bit 15, index register in bits 14-12,
/// W/L in bit 11, signed 8-bit displacement in the low byte.
fn index_ea<B: HostEmit>(buf: &mut CodeBuffer, regs: &mut RegAlloc, out: u8, base: u8, ext: u16) {
    let idx_num = ((ext >> 12) & 7) as u8;
    let idx_guest = if ext & 0x8000 != 0 {
        regalloc::areg(idx_num)
    } else {
        regalloc::dreg(idx_num)
    };
    let long_index = ext & 0x0800 != 0;
    let disp = i32::from(ext as u8 as i8);

    let idx = regs.map_read::<B>(buf, idx_guest);
    if long_index {
        B::add_reg(buf, out, base, idx);
    } else {
        let t = regs.alloc_temp::<B>(buf);
        B::sbfx(buf, t, idx, 0, 16);
        B::add_reg(buf, out, base, t);
        regs.free(t);
    }
    B::add_const(buf, out, out, disp);
}
