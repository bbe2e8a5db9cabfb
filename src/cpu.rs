use std::fmt;

use log::debug;

use crate::constants::{InterruptVectors, HALT_SENTINEL, STACK_PAGE};
use crate::dump::CpuDump;
use crate::memory::Memory;
use crate::opcodes::{decode, AddrMode, Instruction, OpEntry};

mod operations_alu;
mod operations_jump;
mod operations_move;

use operations_alu::*;
use operations_jump::*;
use operations_move::*;

#[cfg(test)]
mod test_helpers;


#[rustfmt::skip]
#[derive(Debug, Clone, Copy)]
pub enum StatusFlag {
    Carry            = 0b0000_0001,
    Zero             = 0b0000_0010,
    InterruptDisable = 0b0000_0100,
    Decimal          = 0b0000_1000,
    Break            = 0b0001_0000,
    Reserved         = 0b0010_0000,
    Overflow         = 0b0100_0000,
    Negative         = 0b1000_0000,
}

/// One oscillator period as seen by the host. `Busy` cycles are the internal
/// micro-steps of an instruction; the terminating `Idle` publishes the
/// post-instruction architectural state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Busy,
    Idle,
}

/// Fatal: the fetched byte has no entry in the decode table. The emulated
/// program is ill-formed and there is no local recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub opcode: u8,
    /// Address the opcode byte was fetched from.
    pub pc: u16,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "undefined opcode {:02x} fetched at {:04x}",
            self.opcode, self.pc
        )
    }
}

impl std::error::Error for DecodeError {}

/// A resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Accumulator,
    Address(u16),
}

/// Micro-stage of the in-flight instruction. The stepper is a finite state
/// machine that advances one stage, and therefore one cycle, per `step`
/// call.
#[derive(Debug, Clone, Copy)]
enum Stage {
    /// The next cycle reads the opcode byte at `pc`.
    Fetch,
    /// The next cycle decodes `ir`, resolves the operand and plans the
    /// instruction's timing.
    Decode,
    /// Busy cycles still to burn before the instruction commits. `Burn(0)`
    /// means the next cycle commits and yields `Idle`.
    Burn(u8),
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    instruction: Instruction,
    operand: Operand,
}

/// This struct implements the MOS Technology 6502 central processing unit,
/// stepped one clock cycle at a time.
///
/// http://www.6502.org/
/// https://en.wikipedia.org/wiki/MOS_Technology_6502
pub struct Cpu<'a> {
    /// The CPU owns no storage of its own; it executes against a borrowed
    /// 64 KiB memory image that outlives it.
    pub mem: &'a mut Memory,

    /// "A" register - the accumulator. Typical results of operations land
    /// here, with the status register tracking carry, overflow and so on.
    pub a: u8,

    /// "X" register. An index register: easy to use as a loop counter with
    /// INC/DEC and the branch instructions, and the offset for several
    /// addressing modes.
    pub x: u8,

    /// "Y" register.
    pub y: u8,

    /// "PC" - program counter. Advanced by the CPU's own fetch logic and
    /// rewritten by the jump, branch and interrupt paths. Wraps modulo
    /// 65 536.
    pub pc: u16,

    /// "S" - stack pointer. The stack is the 256-byte page hardwired at
    /// `0x0100` and grows downwards.
    pub s: u8,

    /// "P" - status register.
    ///
    ///   7  bit  0
    /// ---- ----
    /// NVsB DIZC
    /// |||| ||||
    /// |||| |||+- Carry
    /// |||| ||+-- Zero
    /// |||| |+--- Interrupt Disable
    /// |||| +---- Decimal
    /// |||+------ Break
    /// ||+------- Reserved, reads as 1 whenever P is pushed
    /// |+-------- Overflow
    /// +--------- Negative
    pub p: u8,

    /// The last fetched opcode byte (diagnostic).
    pub ir: u8,

    stage: Stage,
    pending: Option<Pending>,
}

impl<'a> Cpu<'a> {
    pub fn new(mem: &mut Memory) -> Cpu {
        Cpu {
            mem,
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            s: 0,
            p: 0,
            ir: 0,
            stage: Stage::Fetch,
            pending: None,
        }
    }

    /// Initialize `s` and load `pc` from the reset vector. The eight bus
    /// cycles a hardware reset takes are not modeled.
    ///
    /// See https://www.pagetable.com/?p=410 for what the silicon actually
    /// does here.
    pub fn reset(&mut self) {
        self.s = 0xfd;
        self.pc = self.mem.read_u16(InterruptVectors::ResetVector as u16);
        self.stage = Stage::Fetch;
        self.pending = None;
    }

    /// Reset into a fully defined state: registers zeroed, flags cleared,
    /// stack pointer at the top. Tests use this for determinism.
    pub fn reset_extended(&mut self) {
        self.reset();
        self.s = 0xff;
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.p = 0;
    }

    /// Advance exactly one clock cycle.
    ///
    /// Every instruction emits its documented cycle count: one `Busy` for
    /// the opcode fetch, `Busy` for each internal micro-step, and a final
    /// `Idle` at which point registers, flags and memory hold the
    /// post-instruction state.
    pub fn step(&mut self) -> Result<Cycle, DecodeError> {
        match self.stage {
            Stage::Fetch => {
                self.ir = self.mem.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.stage = Stage::Decode;
                Ok(Cycle::Busy)
            }
            Stage::Decode => {
                let opcode_pc = self.pc.wrapping_sub(1);
                let entry = match decode(self.ir) {
                    Some(entry) => entry,
                    None => {
                        return Err(DecodeError {
                            opcode: self.ir,
                            pc: opcode_pc,
                        })
                    }
                };
                let (operand, resolved) = self.resolve_operand(entry.mode);
                debug!(
                    "pc {:04x}: {:?}({:02x}) {:?}",
                    opcode_pc, entry.instruction, self.ir, operand
                );
                let total = self.plan_cycles(&entry, operand, resolved);
                self.pending = Some(Pending {
                    instruction: entry.instruction,
                    operand,
                });
                if total == 2 {
                    self.commit()
                } else {
                    self.stage = Stage::Burn(total - 3);
                    Ok(Cycle::Busy)
                }
            }
            Stage::Burn(0) => self.commit(),
            Stage::Burn(remaining) => {
                self.stage = Stage::Burn(remaining - 1);
                Ok(Cycle::Busy)
            }
        }
    }

    /// Step to the end of the current instruction and return how many cycles
    /// it took. Must be called on an instruction boundary.
    pub fn step_instruction(&mut self) -> Result<u64, DecodeError> {
        let mut cycles = 0;
        loop {
            cycles += 1;
            if self.step()? == Cycle::Idle {
                return Ok(cycles);
            }
        }
    }

    /// Execute instructions until the byte at `pc` is the end-of-program
    /// sentinel `0xFF`. The check happens between instructions, so the
    /// sentinel itself is never decoded.
    pub fn run(&mut self) -> Result<(), DecodeError> {
        while self.mem.read(self.pc) != HALT_SENTINEL {
            self.step_instruction()?;
        }
        Ok(())
    }

    /// Execute whole instructions while the predicate holds. Useful for
    /// driving the CPU from tests.
    pub fn run_until<F>(&mut self, predicate: F) -> Result<(), DecodeError>
    where
        F: Fn(&Cpu<'a>) -> bool,
    {
        while !predicate(self) {
            self.step_instruction()?;
        }
        Ok(())
    }

    /// Snapshot the architectural state. `cycles` is whatever the host has
    /// been counting; the CPU itself does not track elapsed time.
    pub fn dump(&self, cycles: u64) -> CpuDump {
        CpuDump {
            pc: Some(self.pc),
            s: Some(self.s),
            a: Some(self.a),
            x: Some(self.x),
            y: Some(self.y),
            ir: Some(self.ir),
            status: Some(status_string(self.p)),
            cycles: Some(cycles),
        }
    }

    fn commit(&mut self) -> Result<Cycle, DecodeError> {
        let Pending {
            instruction,
            operand,
        } = self
            .pending
            .take()
            .expect("commit reached without a decoded instruction");
        self.execute(instruction, operand);
        self.stage = Stage::Fetch;
        Ok(Cycle::Idle)
    }

    fn execute(&mut self, instruction: Instruction, operand: Operand) {
        use Instruction::*;
        match instruction {
            ORA => ora(self, operand),
            AND => and(self, operand),
            EOR => eor(self, operand),
            ADC => adc(self, operand),
            SBC => sbc(self, operand),
            CMP => cmp(self, operand),
            CPX => cpx(self, operand),
            CPY => cpy(self, operand),
            DEC => dec(self, operand),
            DEX => dex(self),
            DEY => dey(self),
            INC => inc(self, operand),
            INX => inx(self),
            INY => iny(self),
            ASL => asl(self, operand),
            ROL => rol(self, operand),
            LSR => lsr(self, operand),
            ROR => ror(self, operand),
            LDA => lda(self, operand),
            STA => sta(self, operand),
            LDX => ldx(self, operand),
            STX => stx(self, operand),
            LDY => ldy(self, operand),
            STY => sty(self, operand),
            TAX => tax(self),
            TXA => txa(self),
            TAY => tay(self),
            TYA => tya(self),
            TSX => tsx(self),
            TXS => txs(self),
            PLA => pla(self),
            PHA => pha(self),
            PLP => plp(self),
            PHP => php(self),
            BPL | BMI | BVC | BVS | BCC | BCS | BNE | BEQ => {
                branch(self, instruction, operand)
            }
            BRK => brk(self),
            RTI => rti(self),
            JSR => jsr(self, operand),
            RTS => rts(self),
            JMP => jmp(self, operand),
            BIT => bit(self, operand),
            CLC => self.set_status_flag(StatusFlag::Carry, false),
            SEC => self.set_status_flag(StatusFlag::Carry, true),
            CLD => self.set_status_flag(StatusFlag::Decimal, false),
            SED => self.set_status_flag(StatusFlag::Decimal, true),
            CLI => self.set_status_flag(StatusFlag::InterruptDisable, false),
            SEI => self.set_status_flag(StatusFlag::InterruptDisable, true),
            CLV => self.set_status_flag(StatusFlag::Overflow, false),
            NOP => {}
        }
    }

    /// Total cycle count of the instruction just decoded, opcode fetch and
    /// terminating idle included.
    fn plan_cycles(&self, entry: &OpEntry, operand: Operand, resolved: AddrMode) -> u8 {
        if entry.instruction.is_branch() {
            return self.branch_cycles(entry.instruction, operand);
        }
        let mut cycles = entry.cycles;
        if entry.page_penalty && resolved.contains(AddrMode::PAGE_BOUNDARY_CROSSED) {
            cycles += 1;
        }
        cycles
    }

    /// 2 cycles untaken, 3 taken, 4 taken across a page boundary.
    fn branch_cycles(&self, instruction: Instruction, operand: Operand) -> u8 {
        if !self.branch_taken(instruction) {
            return 2;
        }
        let target = self.branch_target(operand);
        if page_crossing(self.pc, target).is_empty() {
            3
        } else {
            4
        }
    }

    fn branch_taken(&self, instruction: Instruction) -> bool {
        use Instruction::*;
        match instruction {
            BPL => !self.is_status_flag_set(StatusFlag::Negative),
            BMI => self.is_status_flag_set(StatusFlag::Negative),
            BVC => !self.is_status_flag_set(StatusFlag::Overflow),
            BVS => self.is_status_flag_set(StatusFlag::Overflow),
            BCC => !self.is_status_flag_set(StatusFlag::Carry),
            BCS => self.is_status_flag_set(StatusFlag::Carry),
            BNE => !self.is_status_flag_set(StatusFlag::Zero),
            BEQ => self.is_status_flag_set(StatusFlag::Zero),
            _ => panic!("{:?} is not a branch", instruction),
        }
    }

    /// Destination of a taken branch. `pc` already points past the offset
    /// byte, which is what the displacement is relative to.
    fn branch_target(&self, operand: Operand) -> u16 {
        let offset = self.mem.read(self.address_of(operand)) as i8;
        self.pc.wrapping_add(offset as u16)
    }

    /// The operand address (or the address of the operand byte for
    /// immediates), plus the resolved mode with `PAGE_BOUNDARY_CROSSED`
    /// mixed in where an indexed computation left its base page. Resolvers
    /// advance `pc` past their operand bytes and emit no cycles of their
    /// own; their cost is part of the instruction's planned timing.
    fn resolve_operand(&mut self, mode: AddrMode) -> (Operand, AddrMode) {
        match mode {
            AddrMode::IMPLIED => (Operand::None, mode),
            AddrMode::ACCUMULATOR => (Operand::Accumulator, mode),
            AddrMode::IMMEDIATE => {
                let address = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (Operand::Address(address), mode)
            }
            AddrMode::ZERO_PAGE => {
                let address = self.next_u8() as u16;
                (Operand::Address(address), mode)
            }
            AddrMode::ZERO_PAGE_X => {
                // The index stays inside the zero page: $C0,X with X=$60
                // addresses $20, not $120.
                let address = self.next_u8().wrapping_add(self.x) as u16;
                (Operand::Address(address), mode)
            }
            AddrMode::ZERO_PAGE_Y => {
                let address = self.next_u8().wrapping_add(self.y) as u16;
                (Operand::Address(address), mode)
            }
            AddrMode::ABSOLUTE => (Operand::Address(self.next_u16()), mode),
            AddrMode::ABSOLUTE_X => {
                let base = self.next_u16();
                let address = base.wrapping_add(self.x as u16);
                (Operand::Address(address), mode | page_crossing(base, address))
            }
            AddrMode::ABSOLUTE_Y => {
                let base = self.next_u16();
                let address = base.wrapping_add(self.y as u16);
                (Operand::Address(address), mode | page_crossing(base, address))
            }
            AddrMode::INDIRECT => {
                let pointer = self.next_u16();
                (Operand::Address(self.mem.read_u16(pointer)), mode)
            }
            AddrMode::INDIRECT_X => {
                let pointer = self.next_u8().wrapping_add(self.x) as u16;
                (Operand::Address(self.mem.read_u16(pointer)), mode)
            }
            AddrMode::INDIRECT_Y => {
                let base = self.next_u8() as u16;
                let pointer = self.mem.read_u16(base);
                let address = pointer.wrapping_add(self.y as u16);
                (
                    Operand::Address(address),
                    mode | page_crossing(pointer, address),
                )
            }
            _ => panic!("cannot resolve addressing mode {:?}", mode),
        }
    }

    /// Read the byte at `pc` and advance past it.
    fn next_u8(&mut self) -> u8 {
        let value = self.mem.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Read the little-endian word at `pc` and advance past it.
    fn next_u16(&mut self) -> u16 {
        let value = self.mem.read_u16(self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    fn read_operand(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Accumulator => self.a,
            Operand::Address(address) => self.mem.read(address),
            Operand::None => panic!("instruction expected an operand"),
        }
    }

    fn write_operand(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Accumulator => self.a = value,
            Operand::Address(address) => self.mem.write(address, value),
            Operand::None => panic!("instruction expected an operand"),
        }
    }

    fn address_of(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Address(address) => address,
            _ => panic!("instruction expected an address operand"),
        }
    }

    /// These flags are commonly set together.
    fn update_zero_and_negative_flag(&mut self, value: u8) {
        self.set_status_flag(StatusFlag::Zero, value == 0);
        self.set_status_flag(StatusFlag::Negative, value & 0b1000_0000 != 0);
    }

    /// ADC and SBC operate on 9 bits: register A plus the carry. Store the
    /// 9th bit of the result back onto the status flag.
    fn update_carry_flag(&mut self, result: u16) {
        self.set_status_flag(StatusFlag::Carry, result & 0b1_0000_0000 != 0);
    }

    /// Overflow for ADC and SBC: the inputs agreed on the sign bit and the
    /// result disagrees.
    fn update_overflow_flag(&mut self, operand: u8, result: u8) {
        let bit_7 = 0b1000_0000;
        let overflow = (bit_7 & !(self.a ^ operand) & (self.a ^ result)) == bit_7;
        self.set_status_flag(StatusFlag::Overflow, overflow);
    }

    fn set_status_flag(&mut self, status_flag: StatusFlag, value: bool) {
        if value {
            self.p |= status_flag as u8;
        } else {
            self.p &= !(status_flag as u8);
        }
    }

    fn is_status_flag_set(&self, status_flag: StatusFlag) -> bool {
        self.p & status_flag as u8 != 0
    }

    /// Either 0x00 or 0x01, for carrying into arithmetic and rotates.
    fn get_carry(&self) -> u8 {
        self.p & StatusFlag::Carry as u8
    }

    /// `p` the way the hardware exposes it on the bus: the reserved bit
    /// always reads as 1.
    fn status_for_push(&self) -> u8 {
        self.p | StatusFlag::Reserved as u8
    }

    /// Restore flags from a pulled byte. `B` and the reserved bit have no
    /// backing storage to restore, so they keep their current values.
    fn set_status_from_pull(&mut self, value: u8) {
        let ignored = StatusFlag::Break as u8 | StatusFlag::Reserved as u8;
        self.p = (value & !ignored) | (self.p & ignored);
    }

    /// Push onto the hardware stack at page one. The stack grows down, so
    /// `s` decrements after the write.
    fn push_stack_u8(&mut self, value: u8) {
        let address = u16::from_le_bytes([self.s, STACK_PAGE]);
        self.mem.write(address, value);
        self.s = self.s.wrapping_sub(1);
    }

    /// Pull from the hardware stack: `s` pre-increments, then the byte is
    /// read.
    fn pull_stack_u8(&mut self) -> u8 {
        self.s = self.s.wrapping_add(1);
        let address = u16::from_le_bytes([self.s, STACK_PAGE]);
        self.mem.read(address)
    }
}

/// The extra-cycle marker for an effective address that left its base page.
fn page_crossing(base: u16, effective: u16) -> AddrMode {
    let [_, base_page] = base.to_le_bytes();
    let [_, effective_page] = effective.to_le_bytes();
    if base_page == effective_page {
        AddrMode::empty()
    } else {
        AddrMode::PAGE_BOUNDARY_CROSSED
    }
}

/// Seven characters `NVBDIZC`, uppercase for a set flag.
pub fn status_string(p: u8) -> String {
    [
        (StatusFlag::Negative, 'N'),
        (StatusFlag::Overflow, 'V'),
        (StatusFlag::Break, 'B'),
        (StatusFlag::Decimal, 'D'),
        (StatusFlag::InterruptDisable, 'I'),
        (StatusFlag::Zero, 'Z'),
        (StatusFlag::Carry, 'C'),
    ]
    .iter()
    .map(|&(flag, letter)| {
        if p & flag as u8 != 0 {
            letter
        } else {
            letter.to_ascii_lowercase()
        }
    })
    .collect()
}
