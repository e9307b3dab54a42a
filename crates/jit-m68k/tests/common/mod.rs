//! Shared test harness: a host model that executes the emitted AArch64
//! words against a guest context in memory, plus glue to run translated
//! line-E code and read the guest state back.
//!
//! The model interprets exactly the instruction forms the backend emits
//! (the emitted code is branch-free, so execution is a straight walk to
//! the trap word) and panics on anything it does not recognise — an
//! unknown word in a test is an encoder bug, not something to skip.

// Each integration test binary compiles its own view of this module.
#![allow(dead_code)]

pub mod reference;

use std::collections::HashMap;

use jit_m68k::{CodeBuffer, GuestStream, Translator, ctx};

/// Base address of the guest context structure in host memory.
pub const CTX_BASE: u64 = 0x7000_0000;

/// Architectural guest state, mirrored by the reference model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guest {
    pub d: [u32; 8],
    pub a: [u32; 8],
    pub pc: u32,
    pub ccr: u8,
}

/// AArch64 subset interpreter.
pub struct HostModel {
    pub x: [u64; 32],
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
    pub mem: HashMap<u64, u8>,
}

impl HostModel {
    pub fn new() -> Self {
        Self { x: [0; 32], n: false, z: false, c: false, v: false, mem: HashMap::new() }
    }

    fn reg(&self, i: u32, sf: bool) -> u64 {
        let v = if i == 31 { 0 } else { self.x[i as usize] };
        if sf { v } else { v & 0xFFFF_FFFF }
    }

    fn set_reg(&mut self, i: u32, sf: bool, v: u64) {
        if i != 31 {
            self.x[i as usize] = if sf { v } else { v & 0xFFFF_FFFF };
        }
    }

    fn read_mem(&self, addr: u64, bytes: u32) -> u64 {
        let mut v = 0u64;
        for i in (0..bytes).rev() {
            v = v << 8 | u64::from(*self.mem.get(&(addr + u64::from(i))).unwrap_or(&0));
        }
        v
    }

    fn write_mem(&mut self, addr: u64, bytes: u32, v: u64) {
        for i in 0..bytes {
            self.mem.insert(addr + u64::from(i), (v >> (8 * i)) as u8);
        }
    }

    fn cond(&self, cond: u32) -> bool {
        match cond {
            0x0 => self.z,
            0x1 => !self.z,
            0x2 => self.c,
            0x3 => !self.c,
            0x4 => self.n,
            0x5 => !self.n,
            0x6 => self.v,
            0x7 => !self.v,
            0x8 => self.c && !self.z,
            0x9 => !self.c || self.z,
            0xA => self.n == self.v,
            0xB => self.n != self.v,
            0xC => !self.z && self.n == self.v,
            0xD => self.z || self.n != self.v,
            _ => true,
        }
    }

    fn shifted(&self, rm: u32, kind: u32, amount: u32, sf: bool) -> u64 {
        let size = if sf { 64 } else { 32 };
        let v = self.reg(rm, sf);
        let out = match kind {
            0 => v.checked_shl(amount).unwrap_or(0),
            1 => v.checked_shr(amount).unwrap_or(0),
            2 => {
                let signed = if sf { v as i64 } else { i64::from(v as u32 as i32) };
                (signed >> amount.min(size - 1)) as u64
            }
            _ => {
                if amount == 0 {
                    v
                } else {
                    v >> amount | v << (size - amount)
                }
            }
        };
        if sf { out } else { out & 0xFFFF_FFFF }
    }

    fn add_with_flags(&mut self, a: u64, b: u64, carry_in: u64, sf: bool, set: bool) -> u64 {
        let size = if sf { 64 } else { 32 };
        let mask = if sf { u64::MAX } else { 0xFFFF_FFFF };
        let wide = u128::from(a & mask) + u128::from(b & mask) + u128::from(carry_in);
        let result = (wide as u64) & mask;
        if set {
            self.n = result >> (size - 1) & 1 != 0;
            self.z = result == 0;
            self.c = wide >> size != 0;
            let sa = a >> (size - 1) & 1;
            let sb = b >> (size - 1) & 1;
            let sr = result >> (size - 1) & 1;
            self.v = sa == sb && sa != sr;
        }
        result
    }

    /// Execute starting at word 0 until a BRK; returns the trap code.
    pub fn run(&mut self, code: &[u32]) -> u16 {
        for &insn in code {
            if insn & 0xFFE0_001F == 0xD420_0000 {
                return (insn >> 5) as u16;
            }
            self.step(insn);
        }
        panic!("code ran off the end of the buffer without a trap");
    }

    #[allow(clippy::too_many_lines)]
    fn step(&mut self, insn: u32) {
        let sf = insn >> 31 != 0;
        let size: u32 = if sf { 64 } else { 32 };
        let mask: u64 = if sf { u64::MAX } else { 0xFFFF_FFFF };
        let rd = insn & 0x1F;
        let rn = insn >> 5 & 0x1F;
        let rm = insn >> 16 & 0x1F;

        // Move wide.
        if insn & 0x7F80_0000 == 0x5280_0000
            || insn & 0x7F80_0000 == 0x7280_0000
            || insn & 0x7F80_0000 == 0x1280_0000
        {
            let hw = insn >> 21 & 3;
            let imm = u64::from(insn >> 5 & 0xFFFF) << (16 * hw);
            let v = match insn >> 29 & 3 {
                0 => !imm & mask,
                2 => imm,
                _ => self.reg(rd, true) & !(0xFFFFu64 << (16 * hw)) | imm,
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // Logical (immediate).
        if insn >> 23 & 0x3F == 0x24 {
            let imm = decode_bitmask(insn >> 22 & 1, insn >> 16 & 0x3F, insn >> 10 & 0x3F, sf);
            let a = self.reg(rn, sf);
            let (v, set) = match insn >> 29 & 3 {
                0 => (a & imm, false),
                1 => (a | imm, false),
                2 => (a ^ imm, false),
                _ => (a & imm, true),
            };
            if set {
                self.n = v >> (size - 1) & 1 != 0;
                self.z = v == 0;
                self.c = false;
                self.v = false;
            }
            self.set_reg(rd, sf, v);
            return;
        }

        // Bitfield move.
        if insn >> 23 & 0x3F == 0x26 {
            let immr = insn >> 16 & 0x3F;
            let imms = insn >> 10 & 0x3F;
            let opc = insn >> 29 & 3;
            let src = self.reg(rn, sf);
            let v = if imms >= immr {
                // Extract imms-immr+1 bits from immr into the bottom.
                let width = imms - immr + 1;
                let field = src >> immr & ones(width);
                match opc {
                    0 => sign_extend(field, width, size),
                    1 => self.reg(rd, sf) & !ones(width) | field,
                    _ => field,
                }
            } else {
                // Insert imms+1 bits at size-immr.
                let width = imms + 1;
                let pos = size - immr;
                let field = (src & ones(width)) << pos;
                match opc {
                    0 => sign_extend(field, width + pos, size),
                    1 => self.reg(rd, sf) & !(ones(width) << pos) | field,
                    _ => field,
                }
            };
            self.set_reg(rd, sf, v & mask);
            return;
        }

        // EXTR.
        if insn >> 23 & 0x3F == 0x27 {
            let lsb = insn >> 10 & 0x3F;
            let hi = u128::from(self.reg(rn, sf));
            let lo = u128::from(self.reg(rm, sf));
            let v = ((hi << size | lo) >> lsb) as u64 & mask;
            self.set_reg(rd, sf, v);
            return;
        }

        // Add/subtract (immediate).
        if insn >> 24 & 0x1F == 0x11 {
            let imm = u64::from(insn >> 10 & 0xFFF);
            let a = self.reg(rn, sf);
            let sub = insn >> 30 & 1 != 0;
            let set = insn >> 29 & 1 != 0;
            let v = if sub {
                self.add_with_flags(a, !imm & mask, 1, sf, set)
            } else {
                self.add_with_flags(a, imm, 0, sf, set)
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // Logical (shifted register).
        if insn >> 24 & 0x1F == 0x0A {
            let shift = insn >> 22 & 3;
            let amount = insn >> 10 & 0x3F;
            let negate = insn >> 21 & 1 != 0;
            let mut b = self.shifted(rm, shift, amount, sf);
            if negate {
                b = !b & mask;
            }
            let a = self.reg(rn, sf);
            let (v, set) = match insn >> 29 & 3 {
                0 => (a & b, false),
                1 => (a | b, false),
                2 => (a ^ b, false),
                _ => (a & b, true),
            };
            if set {
                self.n = v >> (size - 1) & 1 != 0;
                self.z = v == 0;
                self.c = false;
                self.v = false;
            }
            self.set_reg(rd, sf, v);
            return;
        }

        // Add/subtract (shifted register).
        if insn >> 24 & 0x1F == 0x0B && insn >> 21 & 1 == 0 {
            let b = self.shifted(rm, insn >> 22 & 3, insn >> 10 & 0x3F, sf);
            let a = self.reg(rn, sf);
            let sub = insn >> 30 & 1 != 0;
            let set = insn >> 29 & 1 != 0;
            let v = if sub {
                self.add_with_flags(a, !b & mask, 1, sf, set)
            } else {
                self.add_with_flags(a, b, 0, sf, set)
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // Conditional select.
        if insn & 0x5FE0_0800 == 0x1A80_0000 {
            let cond = insn >> 12 & 0xF;
            let inc = insn >> 10 & 1;
            let v = if self.cond(cond) {
                self.reg(rn, sf)
            } else {
                self.reg(rm, sf).wrapping_add(u64::from(inc)) & mask
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // Data processing, two sources.
        if insn & 0x5FE0_0000 == 0x1AC0_0000 && insn >> 30 & 1 == 0 {
            let a = self.reg(rn, sf);
            let b = self.reg(rm, sf);
            let v = match insn >> 10 & 0x3F {
                0b000010 => {
                    if b == 0 {
                        0
                    } else {
                        a / b
                    }
                }
                0b001000 => self.shifted_by(a, b % u64::from(size), 0, sf),
                0b001001 => self.shifted_by(a, b % u64::from(size), 1, sf),
                0b001010 => self.shifted_by(a, b % u64::from(size), 2, sf),
                0b001011 => self.shifted_by(a, b % u64::from(size), 3, sf),
                op => panic!("host model: unknown dp2 opcode {op:b}"),
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // Data processing, one source.
        if insn & 0x5FE0_F000 == 0x5AC0_0000 {
            let a = self.reg(rn, sf);
            let v = match insn >> 10 & 3 {
                0 => a.reverse_bits() >> (64 - size),
                1 => {
                    // REV16: byte swap within each halfword.
                    let mut out = 0u64;
                    for h in 0..size / 16 {
                        let half = a >> (16 * h) & 0xFFFF;
                        out |= (half >> 8 | (half & 0xFF) << 8) << (16 * h);
                    }
                    out
                }
                2 => {
                    if sf {
                        // REV32: byte swap within each word.
                        let lo = u64::from((a as u32).swap_bytes());
                        let hi = u64::from(((a >> 32) as u32).swap_bytes());
                        hi << 32 | lo
                    } else {
                        u64::from((a as u32).swap_bytes())
                    }
                }
                _ => a.swap_bytes(),
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // CLZ sits in the same group with opcode bit 12 set.
        if insn & 0x5FE0_F000 == 0x5AC0_1000 {
            let a = self.reg(rn, sf);
            let v = if sf {
                u64::from(a.leading_zeros())
            } else {
                u64::from((a as u32).leading_zeros())
            };
            self.set_reg(rd, sf, v);
            return;
        }

        // MSUB.
        if insn & 0x7FE0_8000 == 0x1B00_8000 {
            let ra = insn >> 10 & 0x1F;
            let v = self
                .reg(ra, sf)
                .wrapping_sub(self.reg(rn, sf).wrapping_mul(self.reg(rm, sf)));
            self.set_reg(rd, sf, v & mask);
            return;
        }

        // Loads/stores, unsigned offset.
        if insn & 0x3F00_0000 == 0x3900_0000 {
            let acc = insn >> 30 & 3;
            let load = insn >> 22 & 1 != 0;
            let offset = u64::from(insn >> 10 & 0xFFF) << acc;
            let addr = self.reg(rn, true).wrapping_add(offset);
            self.load_store(acc, load, rd, addr);
            return;
        }

        // Loads/stores, pre/post-index.
        if insn & 0x3F20_0000 == 0x3800_0000 && matches!(insn >> 10 & 3, 1 | 3) {
            let acc = insn >> 30 & 3;
            let load = insn >> 22 & 1 != 0;
            let pre = insn >> 10 & 3 == 3;
            let imm9 = sign_extend(u64::from(insn >> 12 & 0x1FF), 9, 64);
            let base = self.reg(rn, true);
            let addr = if pre { base.wrapping_add(imm9) } else { base };
            self.load_store(acc, load, rd, addr);
            self.set_reg(rn, true, base.wrapping_add(imm9));
            return;
        }

        panic!("host model: unhandled instruction {insn:08x}");
    }

    fn shifted_by(&self, v: u64, amount: u64, kind: u32, sf: bool) -> u64 {
        let size = if sf { 64 } else { 32 };
        let amount = amount as u32;
        let out = match kind {
            0 => v.checked_shl(amount).unwrap_or(0),
            1 => v.checked_shr(amount).unwrap_or(0),
            2 => {
                let signed = if sf { v as i64 } else { i64::from(v as u32 as i32) };
                (signed >> amount.min(size - 1)) as u64
            }
            _ => {
                if amount == 0 {
                    v
                } else {
                    v >> amount | v << (size - amount)
                }
            }
        };
        if sf { out } else { out & 0xFFFF_FFFF }
    }

    fn load_store(&mut self, acc: u32, load: bool, rt: u32, addr: u64) {
        let bytes = 1u32 << acc;
        if load {
            let v = self.read_mem(addr, bytes);
            self.set_reg(rt, true, v);
        } else {
            let v = self.reg(rt, true);
            self.write_mem(addr, bytes, v);
        }
    }
}

impl Default for HostModel {
    fn default() -> Self {
        Self::new()
    }
}

fn ones(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

fn sign_extend(v: u64, width: u32, size: u32) -> u64 {
    let shift = 64 - width;
    let x = ((v << shift) as i64 >> shift) as u64;
    if size == 64 { x } else { x & 0xFFFF_FFFF }
}

/// Decode an A64 logical-immediate field triple into the value.
fn decode_bitmask(n: u32, immr: u32, imms: u32, sf: bool) -> u64 {
    let combined = n << 6 | (!imms & 0x3F);
    assert!(combined != 0, "invalid logical immediate");
    let len = 31 - combined.leading_zeros();
    let esize = 1u32 << len;
    let s = imms & (esize - 1);
    let r = immr & (esize - 1);
    let welem = ones(s + 1);
    let emask = ones(esize);
    let rotated = if r == 0 {
        welem
    } else {
        (welem >> r | welem << (esize - r)) & emask
    };
    let mut out = rotated;
    let mut w = esize;
    while w < 64 {
        out |= out << w;
        w *= 2;
    }
    if sf { out } else { out & 0xFFFF_FFFF }
}

/// Outcome of translating and executing a word stream on the host model.
pub struct Run {
    pub guest: Guest,
    pub counts: Vec<u32>,
    pub trap: u16,
    pub model: HostModel,
}

impl Run {
    /// Read back a run of guest memory after execution.
    pub fn mem(&self, range: std::ops::Range<u32>) -> Vec<u8> {
        range.map(|a| self.model.read_mem(u64::from(a), 1) as u8).collect()
    }
}

/// Translate `words` (one `emit_line_e` call per guest instruction until
/// the stream is exhausted), execute on the host model and return the
/// final guest state plus the consumed instruction counts and trap code.
pub fn run_translated(guest: &Guest, words: &[u16], mem_init: &[(u32, u8)]) -> Run {
    run_translated_with(guest, words, mem_init, jit_m68k::CcMask::all())
}

/// As [`run_translated`], with an explicit live-flag mask for every
/// instruction in the stream.
pub fn run_translated_with(
    guest: &Guest,
    words: &[u16],
    mem_init: &[(u32, u8)],
    mask: jit_m68k::CcMask,
) -> Run {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut buf = CodeBuffer::new();
    let mut tr: Translator<'_> = Translator::new(&mut buf);
    tr.set_update_mask(mask);
    let mut stream = GuestStream::new(words);
    let mut counts = Vec::new();
    while stream.peek(0).is_some() {
        let before = tr.pos();
        let n = tr.emit_line_e(&mut stream).expect("translation failed");
        assert!(tr.pos() > before, "emitter produced no code");
        counts.push(n);
    }
    tr.finish();

    let mut model = HostModel::new();
    model.x[12] = CTX_BASE;
    for (i, v) in guest.d.iter().enumerate() {
        model.write_mem(CTX_BASE + u64::from(ctx::reg_offset(i as u8)), 4, u64::from(*v));
    }
    for (i, v) in guest.a.iter().enumerate() {
        model.write_mem(CTX_BASE + u64::from(ctx::reg_offset(8 + i as u8)), 4, u64::from(*v));
    }
    model.write_mem(CTX_BASE + u64::from(ctx::PC), 4, u64::from(guest.pc));
    model.write_mem(CTX_BASE + u64::from(ctx::CCR), 4, u64::from(guest.ccr));
    for &(addr, byte) in mem_init {
        model.mem.insert(u64::from(addr), byte);
    }

    let trap = model.run(buf.words());

    let mut out = Guest::default();
    for i in 0..8 {
        out.d[i] = model.read_mem(CTX_BASE + u64::from(ctx::reg_offset(i as u8)), 4) as u32;
        out.a[i] = model.read_mem(CTX_BASE + u64::from(ctx::reg_offset(8 + i as u8)), 4) as u32;
    }
    out.pc = model.read_mem(CTX_BASE + u64::from(ctx::PC), 4) as u32;
    out.ccr = model.read_mem(CTX_BASE + u64::from(ctx::CCR), 4) as u8;
    Run { guest: out, counts, trap, model }
}

/// Execute `words` on both the translated host code and the reference
/// model and require identical guest state and memory.
pub fn check_equiv(guest: &Guest, words: &[u16], mem_init: &[(u32, u8)]) -> Guest {
    let run = run_translated(guest, words, mem_init);
    assert_eq!(run.trap, 0, "block did not end cleanly for {words:04x?}");

    let mut expect = guest.clone();
    let mut mem: HashMap<u32, u8> = mem_init.iter().copied().collect();
    let mut i = 0;
    while i < words.len() {
        i += reference::step(&mut expect, &mut mem, &words[i..]);
    }

    assert_eq!(run.guest, expect, "guest state mismatch for {words:04x?}");
    for (&addr, &byte) in &mem {
        assert_eq!(
            run.model.read_mem(u64::from(addr), 1) as u8,
            byte,
            "memory mismatch at {addr:08x} for {words:04x?}"
        );
    }
    expect
}
