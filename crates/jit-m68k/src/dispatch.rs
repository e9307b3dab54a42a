//! Line-E dispatch table.
//!
//! 4,096 entries indexed by the low 12 bits of the opcode, materialised
//! once at first use from the pattern rules in `classify` and immutable
//! afterwards. Ranges of indices share emitters; each emitter re-derives
//! size, direction and operands from the opcode bits.

use std::sync::LazyLock;

use crate::backend::HostSel;
use crate::cc::CcMask;
use crate::ea::{self, Size};
use crate::entry::Translator;
use crate::shifts::Kind;
use crate::stream::{GuestStream, TranslateError};

pub(crate) type EmitFn =
    fn(&mut Translator<'_, HostSel>, u16, &mut GuestStream<'_>) -> Result<(), TranslateError>;

/// One dispatch entry: the emitter plus the static facts the outer
/// analysis queries.
pub(crate) struct Entry {
    pub emit: EmitFn,
    pub needs: CcMask,
    pub sets: CcMask,
    pub base_words: u8,
    pub has_ea: bool,
    pub size: Size,
}

static TABLE: LazyLock<Box<[Entry]>> = LazyLock::new(|| {
    (0..0x1000u16).map(classify).collect()
});

pub(crate) fn lookup(op: u16) -> &'static Entry {
    &TABLE[usize::from(op & 0x0FFF)]
}

/// CCR bits the instruction at `op` reads and writes. Opcodes outside the
/// family conservatively read everything and write nothing.
#[must_use]
pub fn sr_info(op: u16) -> (CcMask, CcMask) {
    let entry = lookup(op);
    (entry.needs, entry.sets)
}

/// Encoded length in words of the instruction starting at `words[0]`,
/// extension words included.
pub fn line_e_length(words: &[u16]) -> Result<usize, TranslateError> {
    let op = *words.first().ok_or(TranslateError::EndOfStream)?;
    let entry = lookup(op);
    let mut len = usize::from(entry.base_words);
    if entry.has_ea {
        len += ea::ea_ext_words(((op >> 3) & 7) as u8, (op & 7) as u8, entry.size);
    }
    Ok(len)
}

// Wrapper functions, rather than bare method paths, because coercing a
// generic inherent method directly to the `EmitFn` pointer type loses the
// lifetime generality the alias requires (the self/Translator lifetimes
// collapse into one HRTB variable); a wrapper with the target signature
// written out forces the compiler to check each independently.
fn call_emit_illegal(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_illegal(op, s)
}

fn call_emit_shift_reg(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_shift_reg(op, s)
}

fn call_emit_shift_mem(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_shift_mem(op, s)
}

fn call_emit_bftst(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bftst(op, s)
}

fn call_emit_bfextu(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfextu(op, s)
}

fn call_emit_bfchg(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfchg(op, s)
}

fn call_emit_bfexts(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfexts(op, s)
}

fn call_emit_bfclr(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfclr(op, s)
}

fn call_emit_bfffo(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfffo(op, s)
}

fn call_emit_bfset(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfset(op, s)
}

fn call_emit_bfins(
    t: &mut Translator<'_, HostSel>,
    op: u16,
    s: &mut GuestStream<'_>,
) -> Result<(), TranslateError> {
    t.emit_bfins(op, s)
}

fn illegal() -> Entry {
    Entry {
        emit: call_emit_illegal,
        needs: CcMask::all(),
        sets: CcMask::empty(),
        base_words: 1,
        has_ea: false,
        size: Size::Word,
    }
}

/// Memory-alterable modes, the only ones the memory shifts accept.
fn memory_alterable(mode: u8, reg: u8) -> bool {
    matches!(mode, 2..=6) || (mode == 7 && reg <= 1)
}

/// Control modes (PC-relative included), legal for the reading bit-field
/// operations alongside a plain data register.
fn control(mode: u8, reg: u8) -> bool {
    matches!(mode, 2 | 5 | 6) || (mode == 7 && reg <= 3)
}

/// Control-alterable modes, legal for the mutating bit-field operations.
fn control_alterable(mode: u8, reg: u8) -> bool {
    matches!(mode, 2 | 5 | 6) || (mode == 7 && reg <= 1)
}

fn classify(low: u16) -> Entry {
    let size_bits = (low >> 6) & 3;
    let mode = ((low >> 3) & 7) as u8;
    let reg = (low & 7) as u8;

    if size_bits != 3 {
        // Register shifts and rotates: every encoding is valid.
        let kind = Kind::from_bits(low >> 3);
        let size = match size_bits {
            0 => Size::Byte,
            1 => Size::Word,
            _ => Size::Long,
        };
        return Entry {
            emit: call_emit_shift_reg,
            needs: kind.needs(),
            sets: kind.sets(),
            base_words: 1,
            has_ea: false,
            size,
        };
    }

    if low & 0x0800 == 0 {
        // Memory shifts: word-sized, one position, alterable memory only.
        if !memory_alterable(mode, reg) {
            return illegal();
        }
        let kind = Kind::from_bits(low >> 9);
        return Entry {
            emit: call_emit_shift_mem,
            needs: kind.needs(),
            sets: kind.sets(),
            base_words: 1,
            has_ea: true,
            size: Size::Word,
        };
    }

    // Bit-field group, selected by bits 10-8.
    let (emit, ea_ok): (EmitFn, fn(u8, u8) -> bool) = match (low >> 8) & 7 {
        0 => (call_emit_bftst, control),
        1 => (call_emit_bfextu, control),
        2 => (call_emit_bfchg, control_alterable),
        3 => (call_emit_bfexts, control),
        4 => (call_emit_bfclr, control_alterable),
        5 => (call_emit_bfffo, control),
        6 => (call_emit_bfset, control_alterable),
        _ => (call_emit_bfins, control_alterable),
    };
    if mode != 0 && !ea_ok(mode, reg) {
        return illegal();
    }
    Entry {
        emit,
        needs: CcMask::empty(),
        sets: CcMask::NZVC,
        base_words: 2,
        has_ea: mode != 0,
        size: Size::Word,
    }
}
