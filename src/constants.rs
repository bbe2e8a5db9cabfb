/// Fixed little-endian 16-bit pointers the CPU consults for control
/// transfers. Only the reset and BRK/IRQ vectors are exercised by this core;
/// the NMI vector is reserved for a future interrupt line.
pub enum InterruptVectors {
    NonMaskableInterrupt = 0xFFFA,
    ResetVector = 0xFFFC,
    IrqBrkVector = 0xFFFE,
}

/// Full size of the flat address space.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// The hardware stack lives in page one: the effective stack address is
/// `0x0100 + s`.
pub const STACK_PAGE: u8 = 0x01;

/// Where the assembler bases its byte image and where the test harness
/// points the reset vector.
pub const PROGRAM_ORIGIN: u16 = 0x8000;

/// Host-level end-of-program marker. Not a CPU concept: drivers check for
/// this byte at `pc` between instructions, so it is never decoded.
pub const HALT_SENTINEL: u8 = 0xFF;
