//! Reference 68000 model for the line-E family (plus SWAP, which the
//! byte-swap idiom tests need), operating directly on architectural
//! state. Semantics follow the translator's documented behaviour,
//! including the V-always-cleared deviation on ASL.

use std::collections::HashMap;

use super::Guest;

const C: u8 = 0x01;
const Z: u8 = 0x04;
const N: u8 = 0x08;
const X: u8 = 0x10;

fn set_if(ccr: u8, bit: u8, cond: bool) -> u8 {
    if cond { ccr | bit } else { ccr & !bit }
}

fn read_be(mem: &HashMap<u32, u8>, addr: u32, bytes: u32) -> u64 {
    let mut v = 0u64;
    for i in 0..bytes {
        v = v << 8 | u64::from(*mem.get(&addr.wrapping_add(i)).unwrap_or(&0));
    }
    v
}

fn write_be(mem: &mut HashMap<u32, u8>, addr: u32, bytes: u32, v: u64) {
    for i in 0..bytes {
        mem.insert(addr.wrapping_add(i), (v >> (8 * (bytes - 1 - i))) as u8);
    }
}

/// Execute one instruction; returns the number of words consumed.
pub fn step(g: &mut Guest, mem: &mut HashMap<u32, u8>, words: &[u16]) -> usize {
    let op = words[0];
    if op & 0xFFF8 == 0x4840 {
        // SWAP Dn.
        let r = (op & 7) as usize;
        let v = g.d[r].rotate_left(16);
        g.d[r] = v;
        g.ccr = set_if(g.ccr, N, v & 0x8000_0000 != 0);
        g.ccr = set_if(g.ccr, Z, v == 0);
        g.ccr &= !(C | 0x02);
        g.pc = g.pc.wrapping_add(2);
        return 1;
    }
    assert_eq!(op >> 12, 0xE, "reference model only covers line E");

    let size_bits = (op >> 6) & 3;
    if size_bits != 3 {
        step_shift_reg(g, op);
        1
    } else if op & 0x0800 == 0 {
        step_shift_mem(g, mem, words)
    } else {
        step_bitfield(g, mem, words)
    }
}

/// Core shift/rotate: returns (result, carry). Adapted 68000 semantics
/// with counts already resolved.
fn shift_alu(ccr: u8, kind: u16, left: bool, value: u32, count: u32, bits: u32) -> (u32, bool) {
    let mask = (((1u64 << bits) - 1)) as u32;
    let msb = 1u32 << (bits - 1);
    match (kind, left) {
        // ASL/LSL
        (0 | 1, true) => {
            if count == 0 {
                (value, false)
            } else if count >= bits {
                let c = count == bits && value & 1 != 0;
                (0, c)
            } else {
                let shifted = (value << count) & mask;
                let c = value >> (bits - count) & 1 != 0;
                (shifted, c)
            }
        }
        // ASR
        (0, false) => {
            if count == 0 {
                (value, false)
            } else {
                let sign = value & msb != 0;
                if count >= bits {
                    (if sign { mask } else { 0 }, sign)
                } else {
                    let mut result = value;
                    for _ in 0..count {
                        result = result >> 1 | if sign { msb } else { 0 };
                    }
                    let c = value >> (count - 1) & 1 != 0;
                    (result & mask, c)
                }
            }
        }
        // LSR
        (1, false) => {
            if count == 0 {
                (value, false)
            } else if count >= bits {
                let c = count == bits && value >> (bits - 1) & 1 != 0;
                (0, c)
            } else {
                ((value >> count) & mask, value >> (count - 1) & 1 != 0)
            }
        }
        // ROXL/ROXR
        (2, _) => {
            let total = bits + 1;
            let eff = count % total;
            let x = ccr & X != 0;
            if eff == 0 {
                (value, x)
            } else {
                let extended = u64::from(x) << bits | u64::from(value & mask);
                let rotated = if left {
                    (extended << eff | extended >> (total - eff)) & ((1u64 << total) - 1)
                } else {
                    (extended >> eff | extended << (total - eff)) & ((1u64 << total) - 1)
                };
                ((rotated as u32) & mask, rotated >> bits & 1 != 0)
            }
        }
        // ROL/ROR
        (_, true) => {
            if count == 0 {
                (value, false)
            } else {
                let eff = count % bits;
                if eff == 0 {
                    (value, value & 1 != 0)
                } else {
                    let rotated = (value << eff | value >> (bits - eff)) & mask;
                    (rotated, rotated & 1 != 0)
                }
            }
        }
        (_, false) => {
            if count == 0 {
                (value, false)
            } else {
                let eff = count % bits;
                if eff == 0 {
                    (value, value & msb != 0)
                } else {
                    let rotated = (value >> eff | value << (bits - eff)) & mask;
                    (rotated, value >> (eff - 1) & 1 != 0)
                }
            }
        }
    }
}

fn set_shift_flags(g: &mut Guest, kind: u16, result: u32, carry: bool, count: u32, bits: u32) {
    let mask = (((1u64 << bits) - 1)) as u32;
    let msb = 1u32 << (bits - 1);
    g.ccr = set_if(g.ccr, N, result & msb != 0);
    g.ccr = set_if(g.ccr, Z, result & mask == 0);
    // V is always produced as zero, ASL included.
    g.ccr &= !0x02;
    if count > 0 {
        g.ccr = set_if(g.ccr, C, carry);
        if kind < 3 {
            g.ccr = set_if(g.ccr, X, carry);
        }
    } else if kind == 2 {
        let x = g.ccr & X != 0;
        g.ccr = set_if(g.ccr, C, x);
    } else {
        g.ccr &= !C;
    }
}

fn step_shift_reg(g: &mut Guest, op: u16) {
    let count_or_reg = (op >> 9 & 7) as u32;
    let left = op & 0x0100 != 0;
    let bits = 8u32 << ((op >> 6) & 3);
    let kind = op >> 3 & 3;
    let reg = (op & 7) as usize;

    let count = if op & 0x0020 == 0 {
        if count_or_reg == 0 { 8 } else { count_or_reg }
    } else {
        g.d[count_or_reg as usize] % 64
    };

    let mask = (((1u64 << bits) - 1)) as u32;
    let value = g.d[reg] & mask;
    let (result, carry) = shift_alu(g.ccr, kind, left, value, count, bits);
    g.d[reg] = g.d[reg] & !mask | result & mask;
    set_shift_flags(g, kind, result, carry, count, bits);
    g.pc = g.pc.wrapping_add(2);
}

/// Effective address for the memory forms; consumes extension words and
/// updates address registers for the increment/decrement modes.
fn calc_ea(g: &mut Guest, mode: u16, reg: u16, words: &[u16], idx: &mut usize, operand_bytes: u32) -> u32 {
    let r = reg as usize;
    match mode {
        2 => g.a[r],
        3 => {
            let addr = g.a[r];
            g.a[r] = addr.wrapping_add(operand_bytes);
            addr
        }
        4 => {
            let addr = g.a[r].wrapping_sub(operand_bytes);
            g.a[r] = addr;
            addr
        }
        5 => {
            let disp = words[*idx] as i16;
            *idx += 1;
            (g.a[r] as i64 + i64::from(disp)) as u32
        }
        6 => {
            let ext = words[*idx];
            *idx += 1;
            index_ea(g, g.a[r], ext)
        }
        7 => match reg {
            0 => {
                let v = words[*idx] as i16 as i32 as u32;
                *idx += 1;
                v
            }
            1 => {
                let v = u32::from(words[*idx]) << 16 | u32::from(words[*idx + 1]);
                *idx += 2;
                v
            }
            2 => {
                let base = g.pc.wrapping_add(2 * (*idx as u32));
                let disp = words[*idx] as i16;
                *idx += 1;
                (base as i64 + i64::from(disp)) as u32
            }
            _ => {
                let base = g.pc.wrapping_add(2 * (*idx as u32));
                let ext = words[*idx];
                *idx += 1;
                index_ea(g, base, ext)
            }
        },
        _ => panic!("reference model: bad EA mode {mode}"),
    }
}

fn index_ea(g: &Guest, base: u32, ext: u16) -> u32 {
    let idx_reg = (ext >> 12 & 7) as usize;
    let raw = if ext & 0x8000 != 0 { g.a[idx_reg] } else { g.d[idx_reg] };
    let index = if ext & 0x0800 != 0 { raw as i32 } else { i64::from(raw as u16 as i16) as i32 };
    let disp = i32::from(ext as u8 as i8);
    (base as i64 + i64::from(index) + i64::from(disp)) as u32
}

fn step_shift_mem(g: &mut Guest, mem: &mut HashMap<u32, u8>, words: &[u16]) -> usize {
    let op = words[0];
    let kind = op >> 9 & 3;
    let left = op & 0x0100 != 0;
    let mut idx = 1usize;
    let addr = calc_ea(g, op >> 3 & 7, op & 7, words, &mut idx, 2);
    let value = read_be(mem, addr, 2) as u32;
    let (result, carry) = shift_alu(g.ccr, kind, left, value, 1, 16);
    write_be(mem, addr, 2, u64::from(result));
    set_shift_flags(g, kind, result, carry, 1, 16);
    g.pc = g.pc.wrapping_add(2 * idx as u32);
    idx
}

fn step_bitfield(g: &mut Guest, mem: &mut HashMap<u32, u8>, words: &[u16]) -> usize {
    let op = words[0];
    let op2 = words[1];
    let bf = op >> 8 & 7;
    let mode = op >> 3 & 7;
    let reg = (op & 7) as usize;
    let dn = (op2 >> 12 & 7) as usize;
    let mut idx = 2usize;

    let offset: i32 = if op2 & 0x0800 != 0 {
        g.d[(op2 >> 6 & 7) as usize] as i32
    } else {
        i32::from(op2 >> 6 & 31)
    };
    let width: u32 = if op2 & 0x0020 != 0 {
        (g.d[(op2 & 7) as usize].wrapping_sub(1) & 31) + 1
    } else {
        let w = u32::from(op2 & 31);
        if w == 0 { 32 } else { w }
    };

    let (field, place) = if mode == 0 {
        let o = (offset as u32) % 32;
        let rotated = g.d[reg].rotate_left(o);
        let field = (u64::from(rotated) >> (32 - width)) as u32;
        (field, Place::Reg(reg, o))
    } else {
        let base = calc_ea(g, mode, op & 7, words, &mut idx, 0);
        let base = (i64::from(base) + i64::from(offset >> 3)) as u32;
        let r = (offset & 7) as u32;
        let window = read_be(mem, base, 8);
        let shift = 64 - r - width;
        let field = (window >> shift) as u32 & low_run(width);
        (field, Place::Mem(base, window, shift))
    };

    // N/Z from the field (BFINS: from the inserted value); V and C clear.
    let set_nz = |g: &mut Guest, value: u32| {
        g.ccr = set_if(g.ccr, N, value >> (width - 1) & 1 != 0);
        g.ccr = set_if(g.ccr, Z, value & low_run(width) == 0);
        g.ccr &= !(0x02 | C);
    };

    match bf {
        0 => set_nz(g, field),
        1 => {
            set_nz(g, field);
            g.d[dn] = field;
        }
        3 => {
            set_nz(g, field);
            g.d[dn] = sext(field, width);
        }
        5 => {
            set_nz(g, field);
            let justified = (u64::from(field) << (64 - width)) as u64;
            let zeros = if justified == 0 { width } else { justified.leading_zeros() };
            g.d[dn] = (i64::from(zeros) + i64::from(offset)) as u32;
        }
        2 | 4 | 6 => {
            set_nz(g, field);
            let new = match bf {
                2 => field ^ low_run(width),
                4 => 0,
                _ => low_run(width),
            };
            write_field(g, mem, place, width, new);
        }
        _ => {
            let value = g.d[dn] & low_run(width);
            set_nz(g, value);
            write_field(g, mem, place, width, value);
        }
    }

    g.pc = g.pc.wrapping_add(2 * idx as u32);
    idx
}

/// Where a bit field lives, with what write-back needs.
enum Place {
    /// Register number and the rotation already applied.
    Reg(usize, u32),
    /// Base address, loaded 64-bit window, position shift of the field.
    Mem(u32, u64, u32),
}

fn write_field(g: &mut Guest, mem: &mut HashMap<u32, u8>, place: Place, width: u32, new: u32) {
    match place {
        Place::Reg(r, o) => {
            let rot = (o + width) % 32;
            let mask = low_run(width).rotate_right(rot);
            let val = (new & low_run(width)).rotate_right(rot);
            g.d[r] = g.d[r] & !mask | val;
        }
        Place::Mem(base, window, shift) => {
            let mask = u64::from(low_run(width)) << shift;
            let merged = window & !mask | u64::from(new & low_run(width)) << shift;
            write_be(mem, base, 8, merged);
        }
    }
}

fn low_run(width: u32) -> u32 {
    ((1u64 << width) - 1) as u32
}

fn sext(v: u32, width: u32) -> u32 {
    let shift = 32 - width;
    ((v << shift) as i32 >> shift) as u32
}
