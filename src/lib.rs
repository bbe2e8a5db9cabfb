// Clippy rules to disable.
#![allow(clippy::new_without_default)]

pub mod asm;
pub mod clock;
pub mod constants;
pub mod cpu;
pub mod dump;
pub mod memory;
pub mod opcodes;

pub use crate::clock::Clock;
pub use crate::cpu::{Cpu, Cycle, DecodeError};
pub use crate::dump::CpuDump;
pub use crate::memory::Memory;
