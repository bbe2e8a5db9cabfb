use crate::cpu::{Cpu, Operand, StatusFlag};

/// Load the value into register A
/// Function: A:={adr}
/// Flags: N Z
pub fn lda(cpu: &mut Cpu, operand: Operand) {
    cpu.a = cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Store register A at address
/// Function: {adr}:=A
/// Flags:
pub fn sta(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.a;
    cpu.write_operand(operand, value);
}

/// Load register X with the value
/// Function: X:={adr}
/// Flags: N Z
pub fn ldx(cpu: &mut Cpu, operand: Operand) {
    cpu.x = cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Store register X at address
/// Function: {adr}:=X
/// Flags:
pub fn stx(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.x;
    cpu.write_operand(operand, value);
}

/// Load register Y with the value
/// Function: Y:={adr}
/// Flags: N Z
pub fn ldy(cpu: &mut Cpu, operand: Operand) {
    cpu.y = cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(cpu.y);
}

/// Store register Y at address
/// Function: {adr}:=Y
/// Flags:
pub fn sty(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.y;
    cpu.write_operand(operand, value);
}

/// Transfer A to X
/// Function: X:=A
/// Flags: N Z
pub fn tax(cpu: &mut Cpu) {
    cpu.x = cpu.a;
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Transfer X to A
/// Function: A:=X
/// Flags: N Z
pub fn txa(cpu: &mut Cpu) {
    cpu.a = cpu.x;
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Transfer A to Y
/// Function: Y:=A
/// Flags: N Z
pub fn tay(cpu: &mut Cpu) {
    cpu.y = cpu.a;
    cpu.update_zero_and_negative_flag(cpu.y);
}

/// Transfer Y to A
/// Function: A:=Y
/// Flags: N Z
pub fn tya(cpu: &mut Cpu) {
    cpu.a = cpu.y;
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Transfer S to X
/// Function: X:=S
/// Flags: N Z
pub fn tsx(cpu: &mut Cpu) {
    cpu.x = cpu.s;
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Transfer X to S. The stack pointer is not a result, so no flags.
/// Function: S:=X
/// Flags:
pub fn txs(cpu: &mut Cpu) {
    cpu.s = cpu.x;
}

/// Pull A
/// Function: A:=+(S)
/// Flags: N Z
pub fn pla(cpu: &mut Cpu) {
    cpu.a = cpu.pull_stack_u8();
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Push A to the stack
/// Function: (S)-:=A
/// Flags:
pub fn pha(cpu: &mut Cpu) {
    let value = cpu.a;
    cpu.push_stack_u8(value);
}

/// Pull the status register from the stack. B and the reserved bit are not
/// restored; they have no backing storage.
/// Function: P:=+(S)
/// Flags: N V D I Z C
pub fn plp(cpu: &mut Cpu) {
    let value = cpu.pull_stack_u8();
    cpu.set_status_from_pull(value);
}

/// Push the status register with B and the reserved bit forced to 1.
/// Function: (S)-:=P
/// Flags:
pub fn php(cpu: &mut Cpu) {
    let value = cpu.status_for_push() | StatusFlag::Break as u8;
    cpu.push_stack_u8(value);
}
