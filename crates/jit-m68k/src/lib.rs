//! Motorola 68000 "line E" JIT translator core for ARM hosts.
//!
//! Translates the 0xE opcode family — shifts, rotates, extended rotates
//! and the 68020 bit-field group — into native host code, one guest
//! instruction at a time. The host ISA (AArch64, or classic AArch32 as a
//! fallback) is selected at build time via cargo feature; per-opcode
//! emitters are written once against the [`backend::HostEmit`] trait.
//!
//! The outer translation driver owns the code buffer and the guest
//! instruction stream; this crate appends host words, maintains the guest
//! register and CCR caches through the allocator, and reports how many
//! guest instructions each call consumed.

pub mod backend;
mod bitfield;
pub mod buffer;
pub mod cc;
mod dispatch;
pub mod ea;
mod entry;
pub mod regalloc;
mod shifts;
mod stream;

pub use buffer::CodeBuffer;
pub use cc::CcMask;
pub use dispatch::{line_e_length, sr_info};
pub use ea::Size;
pub use entry::Translator;
pub use regalloc::ctx;
pub use stream::{GuestStream, TranslateError};

#[cfg(not(any(feature = "aarch64", feature = "aarch32")))]
compile_error!("select a host backend: feature \"aarch64\" or \"aarch32\"");
