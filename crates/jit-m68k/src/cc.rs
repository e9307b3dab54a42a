//! Guest condition-code model and flag-update helpers.
//!
//! The 68000 CCR occupies the low five bits of the status register:
//! C (bit 0), V (bit 1), Z (bit 2), N (bit 3), X (bit 4). The backend
//! caches these in a dedicated host register; helpers here emit the code
//! that clears and re-asserts individual bits.
//!
//! Every helper takes the caller's update mask by mutable reference and
//! removes the bits it handled, so statically dead flags cost no host code.

use crate::backend::HostEmit;
use crate::buffer::CodeBuffer;
use crate::regalloc::RegAlloc;
use arm_asm::{Cond, Shift};
use bitflags::bitflags;

bitflags! {
    /// A set of guest condition codes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CcMask: u8 {
        /// Carry.
        const C = 1 << 0;
        /// Overflow.
        const V = 1 << 1;
        /// Zero.
        const Z = 1 << 2;
        /// Negative.
        const N = 1 << 3;
        /// Extend.
        const X = 1 << 4;
    }
}

impl CcMask {
    /// The flags every shift and bit-field operation produces.
    pub const NZVC: Self = Self::N.union(Self::Z).union(Self::V).union(Self::C);

    /// Bit position of a single-flag mask within the CCR.
    #[must_use]
    pub fn bit_pos(self) -> u32 {
        debug_assert_eq!(self.bits().count_ones(), 1);
        self.bits().trailing_zeros()
    }
}

/// Obtain the CCR for writing and clear the bits in `update`. Returns the
/// CCR host register, or `None` (emitting nothing) when `update` is empty.
///
/// Clearing covers V for the operations here: V is always produced as 0,
/// so the helpers never re-assert it.
pub fn begin_update<B: HostEmit>(
    buf: &mut CodeBuffer,
    regs: &mut RegAlloc,
    update: CcMask,
) -> Option<u8> {
    if update.is_empty() {
        return None;
    }
    let ccr = regs.modify_cc::<B>(buf);
    B::bic_imm(buf, ccr, ccr, u32::from(update.bits()));
    Some(ccr)
}

/// Assert N and Z (as requested by `update`) from `value` interpreted at
/// `bits` width. Clobbers the host flags.
pub fn set_nz<B: HostEmit>(
    buf: &mut CodeBuffer,
    regs: &mut RegAlloc,
    update: &mut CcMask,
    value: u8,
    bits: u32,
) {
    if !update.intersects(CcMask::N | CcMask::Z) {
        return;
    }
    let ccr = regs.modify_cc::<B>(buf);
    B::test_nz(buf, value, bits);
    if update.contains(CcMask::N) {
        B::orr_bit_if(buf, Cond::Mi, ccr, CcMask::N.bits().into());
    }
    if update.contains(CcMask::Z) {
        B::orr_bit_if(buf, Cond::Eq, ccr, CcMask::Z.bits().into());
    }
    update.remove(CcMask::N | CcMask::Z);
}

/// Assert a single flag from the low bit of `bit_reg` (which must hold
/// 0 or 1), if `update` requests it.
pub fn set_bit_from<B: HostEmit>(
    buf: &mut CodeBuffer,
    regs: &mut RegAlloc,
    update: &mut CcMask,
    flag: CcMask,
    bit_reg: u8,
) {
    if !update.contains(flag) {
        return;
    }
    let ccr = regs.modify_cc::<B>(buf);
    B::orr_shifted(buf, ccr, ccr, bit_reg, Shift::Lsl, flag.bit_pos());
    update.remove(flag);
}

/// Extract the guest X flag into a fresh temporary as 0 or 1.
pub fn extract_x<B: HostEmit>(buf: &mut CodeBuffer, regs: &mut RegAlloc) -> u8 {
    let ccr = regs.read_cc::<B>(buf);
    let tmp = regs.alloc_temp::<B>(buf);
    B::extract_bit(buf, tmp, ccr, CcMask::X.bit_pos());
    tmp
}
