#![macro_use]

use crate::asm::assemble;
use crate::constants::{InterruptVectors, HALT_SENTINEL, PROGRAM_ORIGIN};
use crate::cpu::*;
use crate::dump::CpuDump;
use crate::memory::Memory;

/// The status baseline: the extended reset the harness performs clears
/// every flag.
pub const P: u8 = 0;
pub const C: u8 = StatusFlag::Carry as u8;
pub const Z: u8 = StatusFlag::Zero as u8;
pub const I: u8 = StatusFlag::InterruptDisable as u8;
pub const D: u8 = StatusFlag::Decimal as u8;
pub const B: u8 = StatusFlag::Break as u8;
pub const V: u8 = StatusFlag::Overflow as u8;
pub const N: u8 = StatusFlag::Negative as u8;

/// Architectural state captured when a program reached the end-of-program
/// sentinel, along with the memory image it ran against.
pub struct Halted {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub s: u8,
    pub p: u8,
    pub ir: u8,
    pub cycles: u64,
    pub mem: Memory,
}

impl Halted {
    pub fn dump(&self) -> CpuDump {
        CpuDump {
            pc: Some(self.pc),
            s: Some(self.s),
            a: Some(self.a),
            x: Some(self.x),
            y: Some(self.y),
            ir: Some(self.ir),
            status: Some(status_string(self.p)),
            cycles: Some(self.cycles),
        }
    }
}

/// Assemble `text` at the program origin, append the halt sentinel, point
/// the reset vector at the program, apply the `setup` pokes, and execute
/// from an extended reset until the sentinel is reached.
pub fn run_program_with<F>(text: &str, setup: F) -> Halted
where
    F: FnOnce(&mut Memory),
{
    let program = assemble(text);
    let mut mem = Memory::new();
    mem.load(PROGRAM_ORIGIN, &program.bytes);
    mem.write(
        PROGRAM_ORIGIN.wrapping_add(program.bytes.len() as u16),
        HALT_SENTINEL,
    );
    mem.write_u16(InterruptVectors::ResetVector as u16, PROGRAM_ORIGIN);
    setup(&mut mem);

    let snapshot;
    {
        let mut cpu = Cpu::new(&mut mem);
        cpu.reset_extended();
        let mut cycles = 0;
        while cpu.mem.read(cpu.pc) != HALT_SENTINEL {
            cycles += cpu.step_instruction().expect("hit an undefined opcode");
            assert!(cycles < 100_000, "infinite loop or runaway jump detected");
        }
        snapshot = (cpu.a, cpu.x, cpu.y, cpu.pc, cpu.s, cpu.p, cpu.ir, cycles);
    }
    let (a, x, y, pc, s, p, ir, cycles) = snapshot;
    Halted {
        a,
        x,
        y,
        pc,
        s,
        p,
        ir,
        cycles,
        mem,
    }
}

pub fn run_program(text: &str) -> Halted {
    run_program_with(text, |_| {})
}

/// Run two's complement on a u8.
pub fn negative(n: u8) -> u8 {
    !n + 1
}

pub fn assert_register_a(text: &str, value: u8, status: u8) {
    let halted = run_program(text);
    if halted.a != value {
        panic!(
            "\n{}\nExpected register A to be {:#x} ({:#b}) but it was {:#x} ({:#b})",
            text, value, value, halted.a, halted.a
        );
    }
    assert_status(&halted, status, text);
}

pub fn assert_register_x(text: &str, value: u8, status: u8) {
    let halted = run_program(text);
    if halted.x != value {
        panic!(
            "\n{}\nExpected register X to be {:#x} ({:#b}) but it was {:#x} ({:#b})",
            text, value, value, halted.x, halted.x
        );
    }
    assert_status(&halted, status, text);
}

pub fn assert_register_y(text: &str, value: u8, status: u8) {
    let halted = run_program(text);
    if halted.y != value {
        panic!(
            "\n{}\nExpected register Y to be {:#x} ({:#b}) but it was {:#x} ({:#b})",
            text, value, value, halted.y, halted.y
        );
    }
    assert_status(&halted, status, text);
}

pub fn assert_status(halted: &Halted, expected: u8, text: &str) {
    if halted.p == expected {
        return;
    }
    let flags = [
        (C, "Carry"),
        (Z, "Zero"),
        (I, "InterruptDisable"),
        (D, "Decimal"),
        (B, "Break"),
        (V, "Overflow"),
        (N, "Negative"),
    ];
    let mut details = String::new();
    for &(mask, name) in flags.iter() {
        let expected_set = expected & mask != 0;
        let actual_set = halted.p & mask != 0;
        if expected_set != actual_set {
            details.push_str(&format!(
                "  {}: expected {} but found {}\n",
                name, expected_set, actual_set
            ));
        }
    }
    panic!(
        "\n{}\nstatus 0b{:08b} does not match expected 0b{:08b}\n{}",
        text, halted.p, expected, details
    );
}

#[macro_export]
macro_rules! register_a {
    ($name:ident, $a:expr, $p:expr, $text:expr) => {
        #[test]
        fn $name() {
            assert_register_a($text, $a, $p);
        }
    };
}

#[macro_export]
macro_rules! register_x {
    ($name:ident, $x:expr, $p:expr, $text:expr) => {
        #[test]
        fn $name() {
            assert_register_x($text, $x, $p);
        }
    };
}

#[macro_export]
macro_rules! register_y {
    ($name:ident, $y:expr, $p:expr, $text:expr) => {
        #[test]
        fn $name() {
            assert_register_y($text, $y, $p);
        }
    };
}

#[macro_export]
macro_rules! status {
    ($name:ident, $p:expr, $text:expr) => {
        #[test]
        fn $name() {
            let halted = run_program($text);
            assert_status(&halted, $p, $text);
        }
    };
}

#[macro_export]
macro_rules! memory_at {
    ($name:ident, [$address:expr, $expected:expr], $text:expr) => {
        #[test]
        fn $name() {
            let halted = run_program($text);
            let actual = halted.mem.read($address);
            assert_eq!(actual, $expected, "memory at {:#06x}\n{}", $address, $text);
        }
    };
}
