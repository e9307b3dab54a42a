//! Host register allocation and the guest context layout.
//!
//! Guest registers (D0-D7, A0-A7 and the guest PC) are cached in host
//! registers on demand. A mapped register stays bound across instructions
//! until the pool runs dry, at which point the least recently used guest
//! binding is spilled back to the context. Temporaries are caller-owned:
//! every allocation must be freed on every exit path of the emitter that
//! made it.
//!
//! Emitted code addresses the guest context through the backend's dedicated
//! context base register; the layout is fixed and shared with the runtime.

use crate::backend::HostEmit;
use crate::buffer::CodeBuffer;

/// Guest register identifiers: 0-7 = D0-D7, 8-15 = A0-A7, 16 = PC.
pub const fn dreg(n: u8) -> u8 {
    n & 7
}

/// Address register identifier.
pub const fn areg(n: u8) -> u8 {
    8 + (n & 7)
}

/// Guest program counter identifier.
pub const PC: u8 = 16;

const NUM_GUEST: usize = 17;

/// Guest context field offsets (bytes), shared with the runtime and the
/// test harness.
pub mod ctx {
    /// D0-D7.
    pub const D: u32 = 0;
    /// A0-A7.
    pub const A: u32 = 32;
    /// Program counter.
    pub const PC: u32 = 64;
    /// Condition code register (low 5 bits).
    pub const CCR: u32 = 68;
    /// Pending exception vector, 0 when none.
    pub const VECTOR: u32 = 72;
    /// Exception auxiliary word (the faulting opcode).
    pub const AUX: u32 = 76;

    /// Byte offset of a guest register slot.
    #[must_use]
    pub const fn reg_offset(guest: u8) -> u32 {
        if guest == super::PC {
            PC
        } else {
            4 * guest as u32
        }
    }
}

/// Allocation state for one translated block.
#[derive(Debug)]
pub struct RegAlloc {
    free: u32,
    map: [Option<u8>; NUM_GUEST],
    bound_to: [Option<u8>; 16],
    dirty: u32,
    cc_loaded: bool,
    cc_dirty: bool,
    stamp: u64,
    last_use: [u64; NUM_GUEST],
}

impl RegAlloc {
    /// Fresh state over the backend's allocatable pool.
    #[must_use]
    pub fn new(pool: u32) -> Self {
        Self {
            free: pool,
            map: [None; NUM_GUEST],
            bound_to: [None; 16],
            dirty: 0,
            cc_loaded: false,
            cc_dirty: false,
            stamp: 0,
            last_use: [0; NUM_GUEST],
        }
    }

    fn touch(&mut self, guest: u8) {
        self.stamp += 1;
        self.last_use[guest as usize] = self.stamp;
    }

    fn take_host<B: HostEmit>(&mut self, buf: &mut CodeBuffer) -> u8 {
        if self.free != 0 {
            let host = self.free.trailing_zeros() as u8;
            self.free &= !(1 << host);
            return host;
        }
        // Pool exhausted: spill the least recently used guest binding.
        // Registers touched by the current emitter always carry newer
        // stamps, so a victim never belongs to the instruction in flight.
        let victim = (0..NUM_GUEST as u8)
            .filter(|&g| self.map[g as usize].is_some())
            .min_by_key(|&g| self.last_use[g as usize]);
        let Some(victim) = victim else {
            panic!("host register pool exhausted by temporaries");
        };
        let host = self.map[victim as usize].take().expect("victim is mapped");
        self.bound_to[host as usize] = None;
        if self.dirty & (1 << victim) != 0 {
            B::str32(buf, host, B::CTX, ctx::reg_offset(victim));
            self.dirty &= !(1 << victim);
        }
        host
    }

    /// Host register caching `guest`, loading it from the context if it is
    /// not already bound.
    pub fn map_read<B: HostEmit>(&mut self, buf: &mut CodeBuffer, guest: u8) -> u8 {
        self.touch(guest);
        if let Some(host) = self.map[guest as usize] {
            return host;
        }
        let host = self.take_host::<B>(buf);
        B::ldr32(buf, host, B::CTX, ctx::reg_offset(guest));
        self.map[guest as usize] = Some(host);
        self.bound_to[host as usize] = Some(guest);
        host
    }

    /// Host register for overwriting `guest` entirely; no load is emitted.
    pub fn map_write<B: HostEmit>(&mut self, buf: &mut CodeBuffer, guest: u8) -> u8 {
        self.touch(guest);
        let host = match self.map[guest as usize] {
            Some(host) => host,
            None => {
                let host = self.take_host::<B>(buf);
                self.map[guest as usize] = Some(host);
                self.bound_to[host as usize] = Some(guest);
                host
            }
        };
        self.dirty |= 1 << guest;
        host
    }

    /// Host register for a read-modify-write of `guest`.
    pub fn map_rmw<B: HostEmit>(&mut self, buf: &mut CodeBuffer, guest: u8) -> u8 {
        let host = self.map_read::<B>(buf, guest);
        self.dirty |= 1 << guest;
        host
    }

    /// Mark a previously mapped guest register as modified.
    pub fn set_dirty(&mut self, guest: u8) {
        debug_assert!(self.map[guest as usize].is_some());
        self.dirty |= 1 << guest;
    }

    /// Caller-owned temporary; must be released with [`RegAlloc::free`].
    pub fn alloc_temp<B: HostEmit>(&mut self, buf: &mut CodeBuffer) -> u8 {
        self.take_host::<B>(buf)
    }

    /// Caller-owned wide temporary (even/odd pair on pair backends);
    /// release with [`RegAlloc::free_wide`].
    ///
    /// Pairs come from the top of the pool while single temporaries fill
    /// from the bottom, so the two rarely contend; a pair whose slots are
    /// held only by guest bindings is reclaimed by spilling them.
    pub fn alloc_wide<B: HostEmit>(&mut self, buf: &mut CodeBuffer) -> u8 {
        if !B::WIDE_PAIRS {
            return self.take_host::<B>(buf);
        }
        let pool_pairs = (0..15u8).step_by(2).filter(|&b| B::POOL & (0b11u32 << b) == 0b11 << b);
        if let Some(base) = pool_pairs.clone().filter(|&b| self.free & (0b11u32 << b) == 0b11 << b).last() {
            self.free &= !(0b11u32 << base);
            return base;
        }
        // No free pair; only guest bindings may move, temporaries never
        // do. As with single spills, the least recently used bindings go
        // first, so registers the current emitter touched stay put.
        let reclaimable = pool_pairs
            .filter(|&b| {
                (b..=b + 1)
                    .all(|r| self.free & (1 << r) != 0 || self.bound_to[r as usize].is_some())
            })
            .min_by_key(|&b| {
                (b..=b + 1)
                    .filter_map(|r| self.bound_to[r as usize])
                    .map(|g| self.last_use[g as usize])
                    .max()
                    .unwrap_or(0)
            });
        let Some(base) = reclaimable else {
            panic!("host register pool cannot supply an aligned wide pair");
        };
        for r in base..=base + 1 {
            if let Some(guest) = self.bound_to[r as usize].take() {
                self.map[guest as usize] = None;
                if self.dirty & (1 << guest) != 0 {
                    B::str32(buf, r, B::CTX, ctx::reg_offset(guest));
                    self.dirty &= !(1 << guest);
                }
                self.free |= 1 << r;
            }
        }
        self.free &= !(0b11u32 << base);
        base
    }

    /// Temporary holding a copy of `guest`'s value.
    pub fn copy_to_temp<B: HostEmit>(&mut self, buf: &mut CodeBuffer, guest: u8) -> u8 {
        let src = self.map_read::<B>(buf, guest);
        let tmp = self.alloc_temp::<B>(buf);
        B::mov_reg(buf, tmp, src);
        tmp
    }

    /// Release a temporary.
    pub fn free(&mut self, host: u8) {
        debug_assert!(self.free & (1 << host) == 0, "double free of host register");
        debug_assert!(self.bound_to[host as usize].is_none(), "freeing a guest binding");
        self.free |= 1 << host;
    }

    /// Release a wide temporary.
    pub fn free_wide<B: HostEmit>(&mut self, host: u8) {
        self.free(host);
        if B::WIDE_PAIRS {
            self.free(host + 1);
        }
    }

    /// The CCR cache register, for reading flags the guest consumes.
    pub fn read_cc<B: HostEmit>(&mut self, buf: &mut CodeBuffer) -> u8 {
        if !self.cc_loaded {
            B::ldr32(buf, B::CCR, B::CTX, ctx::CCR);
            self.cc_loaded = true;
        }
        B::CCR
    }

    /// The CCR cache register, marked dirty for writing. Must be obtained
    /// before any flag-producing host instruction whose effect later guest
    /// instructions observe.
    pub fn modify_cc<B: HostEmit>(&mut self, buf: &mut CodeBuffer) -> u8 {
        let host = self.read_cc::<B>(buf);
        self.cc_dirty = true;
        host
    }

    /// Write all dirty state back to the context and drop every binding.
    pub fn flush<B: HostEmit>(&mut self, buf: &mut CodeBuffer) {
        for guest in 0..NUM_GUEST as u8 {
            if let Some(host) = self.map[guest as usize] {
                if self.dirty & (1 << guest) != 0 {
                    B::str32(buf, host, B::CTX, ctx::reg_offset(guest));
                }
                self.map[guest as usize] = None;
                self.bound_to[host as usize] = None;
                self.free |= 1 << host;
            }
        }
        self.dirty = 0;
        if self.cc_dirty {
            B::str32(buf, B::CCR, B::CTX, ctx::CCR);
        }
        self.cc_loaded = false;
        self.cc_dirty = false;
    }
}
