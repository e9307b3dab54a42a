//! Family entrypoint, block lifecycle and the byte-swap peephole.

use std::marker::PhantomData;

use crate::backend::{HostEmit, HostSel};
use crate::buffer::CodeBuffer;
use crate::cc::{self, CcMask};
use crate::dispatch;
use crate::regalloc::{self, RegAlloc, ctx};
use crate::stream::{GuestStream, TranslateError};

/// Trap code of the block-end sentinel.
pub const TRAP_BLOCK_END: u16 = 0;
/// Trap code (and guest vector) of the illegal-instruction sentinel.
pub const TRAP_ILLEGAL: u16 = 4;

/// Translation state for one guest block.
///
/// Owns the register allocation for the block and appends host code to the
/// caller's buffer. `B` is the host backend; the dispatch-table path is
/// instantiated for the build-selected [`HostSel`].
pub struct Translator<'a, B: HostEmit = HostSel> {
    pub(crate) buf: &'a mut CodeBuffer,
    pub(crate) regs: RegAlloc,
    pub(crate) update_mask: CcMask,
    _backend: PhantomData<B>,
}

impl<'a, B: HostEmit> Translator<'a, B> {
    /// Start translating a block into `buf`.
    pub fn new(buf: &'a mut CodeBuffer) -> Self {
        Self {
            buf,
            regs: RegAlloc::new(B::POOL),
            update_mask: CcMask::all(),
            _backend: PhantomData,
        }
    }

    /// Set the CCR bits the next instruction must produce, from the
    /// caller's live-flag analysis. Defaults to all.
    pub fn set_update_mask(&mut self, mask: CcMask) {
        self.update_mask = mask;
    }

    /// Current write cursor in the output buffer, in host words.
    pub fn pos(&self) -> usize {
        self.buf.pos()
    }

    /// Emit the guest-PC advance for one translated instruction.
    pub(crate) fn advance_pc(&mut self, bytes: i32) {
        let pc = self.regs.map_rmw::<B>(self.buf, regalloc::PC);
        B::add_const(self.buf, pc, pc, bytes);
    }

    /// Compile the illegal-instruction trap: record vector and opcode in
    /// the context, write all cached state back, terminate the block.
    pub(crate) fn emit_illegal(
        &mut self,
        op: u16,
        _stream: &mut GuestStream<'_>,
    ) -> Result<(), TranslateError> {
        log::debug!("line E: opcode {op:04x} has no emitter, compiling ILLEGAL trap");
        let t = self.regs.alloc_temp::<B>(self.buf);
        B::mov_imm(self.buf, t, u32::from(TRAP_ILLEGAL));
        B::str32(self.buf, t, B::CTX, ctx::VECTOR);
        B::mov_imm(self.buf, t, u32::from(op));
        B::str32(self.buf, t, B::CTX, ctx::AUX);
        self.regs.free(t);
        self.regs.flush::<B>(self.buf);
        B::trap(self.buf, TRAP_ILLEGAL);
        Ok(())
    }

    /// Finish the block: write back cached guest state and emit the
    /// block-end sentinel.
    pub fn finish(mut self) {
        self.regs.flush::<B>(self.buf);
        B::trap(self.buf, TRAP_BLOCK_END);
    }

    /// ROR.W #8 / SWAP / ROR.W #8 (ROL variants included) over one data
    /// register is a 32-bit byte reverse; compile it as one host
    /// instruction. Returns true when the idiom was matched and consumed.
    fn try_byte_swap_idiom(&mut self, stream: &mut GuestStream<'_>) -> Result<bool, TranslateError> {
        // 0xE058/0xE158 = ROR/ROL.W #8,Dn; 0x4840 = SWAP Dn.
        let (Some(w0), Some(w1), Some(w2)) = (stream.peek(0), stream.peek(1), stream.peek(2))
        else {
            return Ok(false);
        };
        if w0 & 0xFEF8 != 0xE058 || w2 & 0xFEF8 != 0xE058 {
            return Ok(false);
        }
        let reg = (w0 & 7) as u8;
        if w1 != 0x4840 | u16::from(reg) || w2 & 7 != u16::from(reg) {
            return Ok(false);
        }
        stream.advance(3);

        let d = self.regs.map_rmw::<B>(self.buf, regalloc::dreg(reg));
        B::rev32(self.buf, d, d);
        self.advance_pc(6);

        // Flags follow the final rotate of the triple: N/Z on the low
        // word, C = its MSB for ROR or LSB for ROL, V cleared, X untouched.
        let mut update = self.update_mask & CcMask::NZVC;
        if cc::begin_update::<B>(self.buf, &mut self.regs, update).is_some() {
            if update.contains(CcMask::C) {
                let bit = if w2 & 0x0100 != 0 { 0 } else { 15 };
                let c = self.regs.alloc_temp::<B>(self.buf);
                B::extract_bit(self.buf, c, d, bit);
                cc::set_bit_from::<B>(self.buf, &mut self.regs, &mut update, CcMask::C, c);
                self.regs.free(c);
            }
            cc::set_nz::<B>(self.buf, &mut self.regs, &mut update, d, 16);
        }
        Ok(true)
    }
}

impl Translator<'_, HostSel> {
    /// Translate one line-E guest instruction (or the three-instruction
    /// byte-swap idiom). Reads from `stream`, appends host code, returns
    /// the number of guest instructions consumed.
    pub fn emit_line_e(&mut self, stream: &mut GuestStream<'_>) -> Result<u32, TranslateError> {
        if self.try_byte_swap_idiom(stream)? {
            return Ok(3);
        }
        let op = stream.next_word()?;
        let entry = dispatch::lookup(op);
        (entry.emit)(self, op, stream)?;
        Ok(1)
    }
}
