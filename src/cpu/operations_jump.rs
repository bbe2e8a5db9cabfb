use crate::constants::InterruptVectors;
use crate::cpu::{Cpu, Operand, StatusFlag};
use crate::opcodes::Instruction;

/// The shared body of the eight conditional branches. The taken/untaken
/// decision and the extra-cycle accounting already happened when the
/// instruction was planned, against the same flag state seen here.
/// Function: branch on condition
/// Flags:
pub fn branch(cpu: &mut Cpu, instruction: Instruction, operand: Operand) {
    if cpu.branch_taken(instruction) {
        cpu.pc = cpu.branch_target(operand);
    }
}

/// Break - the synchronous software interrupt through the IRQ/BRK vector.
/// The pushed status byte has B and the reserved bit set.
/// Function: (S)-:=PC+1,P PC:=($FFFE)
/// Flags: B I
pub fn brk(cpu: &mut Cpu) {
    let return_address = cpu.pc.wrapping_add(1);
    let [low, high] = return_address.to_le_bytes();
    cpu.push_stack_u8(high);
    cpu.push_stack_u8(low);
    cpu.set_status_flag(StatusFlag::Break, true);
    let status = cpu.status_for_push();
    cpu.push_stack_u8(status);
    cpu.set_status_flag(StatusFlag::InterruptDisable, true);
    cpu.pc = cpu.mem.read_u16(InterruptVectors::IrqBrkVector as u16);
}

/// Return from Interrupt
/// Function: P,PC:=+(S)
/// Flags: N V D I Z C
pub fn rti(cpu: &mut Cpu) {
    let status = cpu.pull_stack_u8();
    cpu.set_status_from_pull(status);
    let low = cpu.pull_stack_u8();
    let high = cpu.pull_stack_u8();
    cpu.pc = u16::from_le_bytes([low, high]);
}

/// Jump to subroutine. The address of the JSR's last byte goes on the
/// stack, high byte first; RTS compensates with its +1.
/// Function: (S)-:=PC-1 PC:={adr}
/// Flags:
pub fn jsr(cpu: &mut Cpu, operand: Operand) {
    let return_address = cpu.pc.wrapping_sub(1);
    let [low, high] = return_address.to_le_bytes();
    cpu.push_stack_u8(high);
    cpu.push_stack_u8(low);
    cpu.pc = cpu.address_of(operand);
}

/// Return from Subroutine
/// Function: PC:=+(S)+1
/// Flags:
pub fn rts(cpu: &mut Cpu) {
    let low = cpu.pull_stack_u8();
    let high = cpu.pull_stack_u8();
    cpu.pc = u16::from_le_bytes([low, high]).wrapping_add(1);
}

/// Jump
/// Function: PC:={adr}
/// Flags:
pub fn jmp(cpu: &mut Cpu, operand: Operand) {
    cpu.pc = cpu.address_of(operand);
}

/// Bit test
/// Function: N:=b7 V:=b6 Z:=A&{adr}
/// Flags: N V Z
pub fn bit(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    cpu.set_status_flag(StatusFlag::Negative, value & 0b1000_0000 != 0);
    cpu.set_status_flag(StatusFlag::Overflow, value & 0b0100_0000 != 0);
    let masked = cpu.a & value;
    cpu.set_status_flag(StatusFlag::Zero, masked == 0);
}
