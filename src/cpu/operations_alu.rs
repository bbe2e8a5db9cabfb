use crate::cpu::{Cpu, Operand, StatusFlag};

/// Apply the logical "or" operator on the accumulator.
/// Function: A:=A or {adr}
/// Flags: N Z
pub fn ora(cpu: &mut Cpu, operand: Operand) {
    cpu.a |= cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Apply the logical "and" operator on the accumulator.
/// Function: A:=A&{adr}
/// Flags: N Z
pub fn and(cpu: &mut Cpu, operand: Operand) {
    cpu.a &= cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Logical Exclusive OR
/// Function: A:=A exor {adr}
/// Flags: N Z
pub fn eor(cpu: &mut Cpu, operand: Operand) {
    cpu.a ^= cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// The shared 9-bit add: A + operand + carry, operated on in u16 space so
/// the carry-out lands in bit 8.
fn add_binary(cpu: &mut Cpu, operand: u8) {
    let result_u16 = cpu.get_carry() as u16 + cpu.a as u16 + operand as u16;
    let result = result_u16 as u8;
    cpu.update_zero_and_negative_flag(result);
    cpu.update_carry_flag(result_u16);
    cpu.update_overflow_flag(operand, result);
    cpu.a = result;
}

fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0f)
}

fn to_bcd(value: u8) -> u8 {
    (value / 10) * 16 + value % 10
}

/// Add with Carry
/// Function: A:=A+{adr}+C
/// Flags: N V Z C binary; the decimal path touches only A and C, the other
/// flags being architecturally undefined on the NMOS part.
pub fn adc(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    if cpu.is_status_flag_set(StatusFlag::Decimal) {
        let sum = from_bcd(value) as u16 + from_bcd(cpu.a) as u16 + cpu.get_carry() as u16;
        cpu.a = to_bcd((sum % 100) as u8);
        cpu.set_status_flag(StatusFlag::Carry, sum > 99);
    } else {
        add_binary(cpu, value);
    }
}

/// Subtract with Carry
/// Function: A:=A-{adr}+C-1
/// Flags: N V Z C binary; decimal as for ADC.
pub fn sbc(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    if cpu.is_status_flag_set(StatusFlag::Decimal) {
        sbc_decimal(cpu, value);
    } else {
        // Two's complement via the inverted operand: the +1 comes from the
        // carry flag, which is why assembly runs SEC before a subtraction.
        add_binary(cpu, value ^ 0xff);
    }
}

/// Packed-BCD subtraction with the NMOS half-carry corrections: adjust by
/// -6 on a low-nibble borrow and by -0x60 on a high-nibble borrow. Carry
/// ends up as the inverted borrow.
fn sbc_decimal(cpu: &mut Cpu, value: u8) {
    let mut low = 0x0f + (cpu.a & 0x0f) as i16 - (value & 0x0f) as i16 + cpu.get_carry() as i16;
    let mut result: i16;
    if low < 0x10 {
        result = 0;
        low -= 6;
    } else {
        result = 0x10;
        low -= 0x10;
    }
    result += 0xf0 + (cpu.a & 0xf0) as i16 - (value & 0xf0) as i16;
    if result < 0x100 {
        cpu.set_status_flag(StatusFlag::Carry, false);
        result -= 0x60;
    } else {
        cpu.set_status_flag(StatusFlag::Carry, true);
    }
    result += low;
    cpu.a = result as u8;
}

/// http://6502.org/tutorials/compare_instructions.html
fn compare(cpu: &mut Cpu, register: u8, operand: Operand) {
    let value = cpu.read_operand(operand);
    cpu.update_zero_and_negative_flag(register.wrapping_sub(value));
    cpu.set_status_flag(StatusFlag::Carry, register >= value);
}

/// Compare A with source
/// Function: A-{adr}
/// Flags: N Z C
pub fn cmp(cpu: &mut Cpu, operand: Operand) {
    let register = cpu.a;
    compare(cpu, register, operand);
}

/// Compare X with source
/// Function: X-{adr}
/// Flags: N Z C
pub fn cpx(cpu: &mut Cpu, operand: Operand) {
    let register = cpu.x;
    compare(cpu, register, operand);
}

/// Compare Y with source
/// Function: Y-{adr}
/// Flags: N Z C
pub fn cpy(cpu: &mut Cpu, operand: Operand) {
    let register = cpu.y;
    compare(cpu, register, operand);
}

/// Decrement at an address
/// Function: {adr}:={adr}-1
/// Flags: N Z
pub fn dec(cpu: &mut Cpu, operand: Operand) {
    let result = cpu.read_operand(operand).wrapping_sub(1);
    cpu.update_zero_and_negative_flag(result);
    cpu.write_operand(operand, result);
}

/// Decrement X
/// Function: X:=X-1
/// Flags: N Z
pub fn dex(cpu: &mut Cpu) {
    cpu.x = cpu.x.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Decrement Y
/// Function: Y:=Y-1
/// Flags: N Z
pub fn dey(cpu: &mut Cpu) {
    cpu.y = cpu.y.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(cpu.y);
}

/// Increment at an address
/// Function: {adr}:={adr}+1
/// Flags: N Z
pub fn inc(cpu: &mut Cpu, operand: Operand) {
    let result = cpu.read_operand(operand).wrapping_add(1);
    cpu.update_zero_and_negative_flag(result);
    cpu.write_operand(operand, result);
}

/// Increment X
/// Function: X:=X+1
/// Flags: N Z
pub fn inx(cpu: &mut Cpu) {
    cpu.x = cpu.x.wrapping_add(1);
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Increment Y
/// Function: Y:=Y+1
/// Flags: N Z
pub fn iny(cpu: &mut Cpu) {
    cpu.y = cpu.y.wrapping_add(1);
    cpu.update_zero_and_negative_flag(cpu.y);
}

/// Arithmetic shift left, on the accumulator or a memory byte.
/// Function: {adr}:={adr}*2
/// Flags: N Z C
pub fn asl(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    let result = value << 1;
    // The carry flag receives the bit that was shifted out.
    cpu.set_status_flag(StatusFlag::Carry, value & 0b1000_0000 != 0);
    cpu.update_zero_and_negative_flag(result);
    cpu.write_operand(operand, result);
}

/// Rotate left through the carry.
/// Function: {adr}:={adr}*2+C
/// Flags: N Z C
pub fn rol(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    let result = (value << 1) | cpu.get_carry();
    cpu.set_status_flag(StatusFlag::Carry, value & 0b1000_0000 != 0);
    cpu.update_zero_and_negative_flag(result);
    cpu.write_operand(operand, result);
}

/// Logical shift right.
/// Function: {adr}:={adr}/2
/// Flags: N Z C
pub fn lsr(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    let result = value >> 1;
    cpu.set_status_flag(StatusFlag::Carry, value & 0b0000_0001 != 0);
    cpu.update_zero_and_negative_flag(result);
    cpu.write_operand(operand, result);
}

/// Rotate right through the carry.
/// Function: {adr}:={adr}/2+C*128
/// Flags: N Z C
pub fn ror(cpu: &mut Cpu, operand: Operand) {
    let value = cpu.read_operand(operand);
    let result = (value >> 1) | (cpu.get_carry() << 7);
    cpu.set_status_flag(StatusFlag::Carry, value & 0b0000_0001 != 0);
    cpu.update_zero_and_negative_flag(result);
    cpu.write_operand(operand, result);
}
