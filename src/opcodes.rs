use bitflags::bitflags;

bitflags! {
    /// Addressing mode of an instruction. Every mode is a single bit so
    /// that `PAGE_BOUNDARY_CROSSED` can be OR'd into a resolved mode when an
    /// indexed computation lands on a different 256-byte page.
    ///
    /// Branch operands are encoded as `IMMEDIATE`: the resolver hands the
    /// branch the address of its offset byte and the branch interprets it as
    /// a signed displacement.
    pub struct AddrMode: u16 {
        const IMPLIED               = 1 << 0;
        const IMMEDIATE             = 1 << 1;
        const ACCUMULATOR           = 1 << 2;
        const ZERO_PAGE             = 1 << 3;
        const ZERO_PAGE_X           = 1 << 4;
        const ZERO_PAGE_Y           = 1 << 5;
        const ABSOLUTE              = 1 << 6;
        const ABSOLUTE_X            = 1 << 7;
        const ABSOLUTE_Y            = 1 << 8;
        const INDIRECT              = 1 << 9;
        const INDIRECT_X            = 1 << 10;
        const INDIRECT_Y            = 1 << 11;
        const PAGE_BOUNDARY_CROSSED = 1 << 12;
    }
}

/// The 56 documented instruction mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Instruction {
    // Logical and arithmetic
    ORA, AND, EOR, ADC, SBC, CMP, CPX, CPY,
    DEC, DEX, DEY, INC, INX, INY,
    ASL, ROL, LSR, ROR,
    // Moves
    LDA, STA, LDX, STX, LDY, STY,
    TAX, TXA, TAY, TYA, TSX, TXS,
    PLA, PHA, PLP, PHP,
    // Jumps, branches and flags
    BPL, BMI, BVC, BVS, BCC, BCS, BNE, BEQ,
    BRK, RTI, JSR, RTS, JMP, BIT,
    CLC, SEC, CLD, SED, CLI, SEI, CLV,
    NOP,
}

impl Instruction {
    /// Branches take their timing from the branch planner instead of the
    /// decode table's cycle column.
    pub fn is_branch(self) -> bool {
        use Instruction::*;
        matches!(self, BPL | BMI | BVC | BVS | BCC | BCS | BNE | BEQ)
    }
}

/// Look a mnemonic up case-insensitively, for the assembler.
pub fn match_instruction(string: &str) -> Option<Instruction> {
    let instruction = match string.to_lowercase().as_ref() {
        "ora" => Instruction::ORA,
        "and" => Instruction::AND,
        "eor" => Instruction::EOR,
        "adc" => Instruction::ADC,
        "sbc" => Instruction::SBC,
        "cmp" => Instruction::CMP,
        "cpx" => Instruction::CPX,
        "cpy" => Instruction::CPY,
        "dec" => Instruction::DEC,
        "dex" => Instruction::DEX,
        "dey" => Instruction::DEY,
        "inc" => Instruction::INC,
        "inx" => Instruction::INX,
        "iny" => Instruction::INY,
        "asl" => Instruction::ASL,
        "rol" => Instruction::ROL,
        "lsr" => Instruction::LSR,
        "ror" => Instruction::ROR,
        "lda" => Instruction::LDA,
        "sta" => Instruction::STA,
        "ldx" => Instruction::LDX,
        "stx" => Instruction::STX,
        "ldy" => Instruction::LDY,
        "sty" => Instruction::STY,
        "tax" => Instruction::TAX,
        "txa" => Instruction::TXA,
        "tay" => Instruction::TAY,
        "tya" => Instruction::TYA,
        "tsx" => Instruction::TSX,
        "txs" => Instruction::TXS,
        "pla" => Instruction::PLA,
        "pha" => Instruction::PHA,
        "plp" => Instruction::PLP,
        "php" => Instruction::PHP,
        "bpl" => Instruction::BPL,
        "bmi" => Instruction::BMI,
        "bvc" => Instruction::BVC,
        "bvs" => Instruction::BVS,
        "bcc" => Instruction::BCC,
        "bcs" => Instruction::BCS,
        "bne" => Instruction::BNE,
        "beq" => Instruction::BEQ,
        "brk" => Instruction::BRK,
        "rti" => Instruction::RTI,
        "jsr" => Instruction::JSR,
        "rts" => Instruction::RTS,
        "jmp" => Instruction::JMP,
        "bit" => Instruction::BIT,
        "clc" => Instruction::CLC,
        "sec" => Instruction::SEC,
        "cld" => Instruction::CLD,
        "sed" => Instruction::SED,
        "cli" => Instruction::CLI,
        "sei" => Instruction::SEI,
        "clv" => Instruction::CLV,
        "nop" => Instruction::NOP,
        _ => return None,
    };
    Some(instruction)
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy)]
pub struct OpEntry {
    pub instruction: Instruction,
    pub mode: AddrMode,
    /// Base cycle count from the canonical NMOS timing table.
    pub cycles: u8,
    /// Whether an indexed page crossing costs one extra cycle.
    pub page_penalty: bool,
}

macro_rules! op {
    ($instruction:ident, $mode:ident, $cycles:expr) => {
        OpEntry {
            instruction: Instruction::$instruction,
            mode: AddrMode::$mode,
            cycles: $cycles,
            page_penalty: false,
        }
    };
    ($instruction:ident, $mode:ident, $cycles:expr, +1) => {
        OpEntry {
            instruction: Instruction::$instruction,
            mode: AddrMode::$mode,
            cycles: $cycles,
            page_penalty: true,
        }
    };
}

/// Decode an opcode byte into its table row. `None` marks the 105
/// undocumented bytes; reaching one of those at execution time is a fatal
/// decode error.
#[rustfmt::skip]
pub fn decode(opcode: u8) -> Option<OpEntry> {
    let entry = match opcode {
        0x00 => op!(BRK, IMPLIED, 7),
        0x01 => op!(ORA, INDIRECT_X, 6),
        0x05 => op!(ORA, ZERO_PAGE, 3),
        0x06 => op!(ASL, ZERO_PAGE, 5),
        0x08 => op!(PHP, IMPLIED, 3),
        0x09 => op!(ORA, IMMEDIATE, 2),
        0x0a => op!(ASL, ACCUMULATOR, 2),
        0x0d => op!(ORA, ABSOLUTE, 4),
        0x0e => op!(ASL, ABSOLUTE, 6),
        0x10 => op!(BPL, IMMEDIATE, 2),
        0x11 => op!(ORA, INDIRECT_Y, 5, +1),
        0x15 => op!(ORA, ZERO_PAGE_X, 4),
        0x16 => op!(ASL, ZERO_PAGE_X, 6),
        0x18 => op!(CLC, IMPLIED, 2),
        0x19 => op!(ORA, ABSOLUTE_Y, 4, +1),
        0x1d => op!(ORA, ABSOLUTE_X, 4, +1),
        0x1e => op!(ASL, ABSOLUTE_X, 7),
        0x20 => op!(JSR, ABSOLUTE, 6),
        0x21 => op!(AND, INDIRECT_X, 6),
        0x24 => op!(BIT, ZERO_PAGE, 3),
        0x25 => op!(AND, ZERO_PAGE, 3),
        0x26 => op!(ROL, ZERO_PAGE, 5),
        0x28 => op!(PLP, IMPLIED, 4),
        0x29 => op!(AND, IMMEDIATE, 2),
        0x2a => op!(ROL, ACCUMULATOR, 2),
        0x2c => op!(BIT, ABSOLUTE, 4),
        0x2d => op!(AND, ABSOLUTE, 4),
        0x2e => op!(ROL, ABSOLUTE, 6),
        0x30 => op!(BMI, IMMEDIATE, 2),
        0x31 => op!(AND, INDIRECT_Y, 5, +1),
        0x35 => op!(AND, ZERO_PAGE_X, 4),
        0x36 => op!(ROL, ZERO_PAGE_X, 6),
        0x38 => op!(SEC, IMPLIED, 2),
        0x39 => op!(AND, ABSOLUTE_Y, 4, +1),
        0x3d => op!(AND, ABSOLUTE_X, 4, +1),
        0x3e => op!(ROL, ABSOLUTE_X, 7),
        0x40 => op!(RTI, IMPLIED, 6),
        0x41 => op!(EOR, INDIRECT_X, 6),
        0x45 => op!(EOR, ZERO_PAGE, 3),
        0x46 => op!(LSR, ZERO_PAGE, 5),
        0x48 => op!(PHA, IMPLIED, 3),
        0x49 => op!(EOR, IMMEDIATE, 2),
        0x4a => op!(LSR, ACCUMULATOR, 2),
        0x4c => op!(JMP, ABSOLUTE, 3),
        0x4d => op!(EOR, ABSOLUTE, 4),
        0x4e => op!(LSR, ABSOLUTE, 6),
        0x50 => op!(BVC, IMMEDIATE, 2),
        0x51 => op!(EOR, INDIRECT_Y, 5, +1),
        0x55 => op!(EOR, ZERO_PAGE_X, 4),
        0x56 => op!(LSR, ZERO_PAGE_X, 6),
        0x58 => op!(CLI, IMPLIED, 2),
        0x59 => op!(EOR, ABSOLUTE_Y, 4, +1),
        0x5d => op!(EOR, ABSOLUTE_X, 4, +1),
        0x5e => op!(LSR, ABSOLUTE_X, 7),
        0x60 => op!(RTS, IMPLIED, 6),
        0x61 => op!(ADC, INDIRECT_X, 6),
        0x65 => op!(ADC, ZERO_PAGE, 3),
        0x66 => op!(ROR, ZERO_PAGE, 5),
        0x68 => op!(PLA, IMPLIED, 4),
        0x69 => op!(ADC, IMMEDIATE, 2),
        0x6a => op!(ROR, ACCUMULATOR, 2),
        0x6c => op!(JMP, INDIRECT, 5),
        0x6d => op!(ADC, ABSOLUTE, 4),
        0x6e => op!(ROR, ABSOLUTE, 6),
        0x70 => op!(BVS, IMMEDIATE, 2),
        0x71 => op!(ADC, INDIRECT_Y, 5, +1),
        0x75 => op!(ADC, ZERO_PAGE_X, 4),
        0x76 => op!(ROR, ZERO_PAGE_X, 6),
        0x78 => op!(SEI, IMPLIED, 2),
        0x79 => op!(ADC, ABSOLUTE_Y, 4, +1),
        0x7d => op!(ADC, ABSOLUTE_X, 4, +1),
        0x7e => op!(ROR, ABSOLUTE_X, 7),
        0x81 => op!(STA, INDIRECT_X, 6),
        0x84 => op!(STY, ZERO_PAGE, 3),
        0x85 => op!(STA, ZERO_PAGE, 3),
        0x86 => op!(STX, ZERO_PAGE, 3),
        0x88 => op!(DEY, IMPLIED, 2),
        0x8a => op!(TXA, IMPLIED, 2),
        0x8c => op!(STY, ABSOLUTE, 4),
        0x8d => op!(STA, ABSOLUTE, 4),
        0x8e => op!(STX, ABSOLUTE, 4),
        0x90 => op!(BCC, IMMEDIATE, 2),
        0x91 => op!(STA, INDIRECT_Y, 6),
        0x94 => op!(STY, ZERO_PAGE_X, 4),
        0x95 => op!(STA, ZERO_PAGE_X, 4),
        0x96 => op!(STX, ZERO_PAGE_Y, 4),
        0x98 => op!(TYA, IMPLIED, 2),
        0x99 => op!(STA, ABSOLUTE_Y, 5),
        0x9a => op!(TXS, IMPLIED, 2),
        0x9d => op!(STA, ABSOLUTE_X, 5),
        0xa0 => op!(LDY, IMMEDIATE, 2),
        0xa1 => op!(LDA, INDIRECT_X, 6),
        0xa2 => op!(LDX, IMMEDIATE, 2),
        0xa4 => op!(LDY, ZERO_PAGE, 3),
        0xa5 => op!(LDA, ZERO_PAGE, 3),
        0xa6 => op!(LDX, ZERO_PAGE, 3),
        0xa8 => op!(TAY, IMPLIED, 2),
        0xa9 => op!(LDA, IMMEDIATE, 2),
        0xaa => op!(TAX, IMPLIED, 2),
        0xac => op!(LDY, ABSOLUTE, 4),
        0xad => op!(LDA, ABSOLUTE, 4),
        0xae => op!(LDX, ABSOLUTE, 4),
        0xb0 => op!(BCS, IMMEDIATE, 2),
        0xb1 => op!(LDA, INDIRECT_Y, 5, +1),
        0xb4 => op!(LDY, ZERO_PAGE_X, 4),
        0xb5 => op!(LDA, ZERO_PAGE_X, 4),
        0xb6 => op!(LDX, ZERO_PAGE_Y, 4),
        0xb8 => op!(CLV, IMPLIED, 2),
        0xb9 => op!(LDA, ABSOLUTE_Y, 4, +1),
        0xba => op!(TSX, IMPLIED, 2),
        0xbc => op!(LDY, ABSOLUTE_X, 4, +1),
        0xbd => op!(LDA, ABSOLUTE_X, 4, +1),
        0xbe => op!(LDX, ABSOLUTE_Y, 4, +1),
        0xc0 => op!(CPY, IMMEDIATE, 2),
        0xc1 => op!(CMP, INDIRECT_X, 6),
        0xc4 => op!(CPY, ZERO_PAGE, 3),
        0xc5 => op!(CMP, ZERO_PAGE, 3),
        0xc6 => op!(DEC, ZERO_PAGE, 5),
        0xc8 => op!(INY, IMPLIED, 2),
        0xc9 => op!(CMP, IMMEDIATE, 2),
        0xca => op!(DEX, IMPLIED, 2),
        0xcc => op!(CPY, ABSOLUTE, 4),
        0xcd => op!(CMP, ABSOLUTE, 4),
        0xce => op!(DEC, ABSOLUTE, 6),
        0xd0 => op!(BNE, IMMEDIATE, 2),
        0xd1 => op!(CMP, INDIRECT_Y, 5, +1),
        0xd5 => op!(CMP, ZERO_PAGE_X, 4),
        0xd6 => op!(DEC, ZERO_PAGE_X, 6),
        0xd8 => op!(CLD, IMPLIED, 2),
        0xd9 => op!(CMP, ABSOLUTE_Y, 4, +1),
        0xdd => op!(CMP, ABSOLUTE_X, 4, +1),
        0xde => op!(DEC, ABSOLUTE_X, 7),
        0xe0 => op!(CPX, IMMEDIATE, 2),
        0xe1 => op!(SBC, INDIRECT_X, 6),
        0xe4 => op!(CPX, ZERO_PAGE, 3),
        0xe5 => op!(SBC, ZERO_PAGE, 3),
        0xe6 => op!(INC, ZERO_PAGE, 5),
        0xe8 => op!(INX, IMPLIED, 2),
        0xe9 => op!(SBC, IMMEDIATE, 2),
        0xea => op!(NOP, IMPLIED, 2),
        0xec => op!(CPX, ABSOLUTE, 4),
        0xed => op!(SBC, ABSOLUTE, 4),
        0xee => op!(INC, ABSOLUTE, 6),
        0xf0 => op!(BEQ, IMMEDIATE, 2),
        0xf1 => op!(SBC, INDIRECT_Y, 5, +1),
        0xf5 => op!(SBC, ZERO_PAGE_X, 4),
        0xf6 => op!(INC, ZERO_PAGE_X, 6),
        0xf8 => op!(SED, IMPLIED, 2),
        0xf9 => op!(SBC, ABSOLUTE_Y, 4, +1),
        0xfd => op!(SBC, ABSOLUTE_X, 4, +1),
        0xfe => op!(INC, ABSOLUTE_X, 7),
        _ => return None,
    };
    Some(entry)
}

/// Reverse lookup used by the assembler: the opcode byte that encodes an
/// (instruction, addressing mode) pair.
pub fn opcode_for(instruction: Instruction, mode: AddrMode) -> Option<u8> {
    (0..=255u8).find(|&byte| match decode(byte) {
        Some(entry) => entry.instruction == instruction && entry.mode == mode,
        None => false,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn the_table_holds_exactly_the_documented_opcodes() {
        let documented = (0..=255u8).filter(|&byte| decode(byte).is_some()).count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn base_cycle_counts_are_plausible() {
        for byte in 0..=255u8 {
            if let Some(entry) = decode(byte) {
                assert!(
                    entry.cycles >= 2 && entry.cycles <= 7,
                    "opcode {:02x} claims {} cycles",
                    byte,
                    entry.cycles
                );
            }
        }
    }

    #[test]
    fn page_penalties_only_apply_to_indexed_reads() {
        for byte in 0..=255u8 {
            if let Some(entry) = decode(byte) {
                if entry.page_penalty {
                    assert!(
                        entry.mode == AddrMode::ABSOLUTE_X
                            || entry.mode == AddrMode::ABSOLUTE_Y
                            || entry.mode == AddrMode::INDIRECT_Y,
                        "opcode {:02x} flags a penalty in mode {:?}",
                        byte,
                        entry.mode
                    );
                    assert!(!matches!(
                        entry.instruction,
                        Instruction::STA | Instruction::STX | Instruction::STY
                    ));
                }
            }
        }
    }

    #[test]
    fn branches_are_immediate_two_cycle_entries() {
        for byte in [0x10u8, 0x30, 0x50, 0x70, 0x90, 0xb0, 0xd0, 0xf0].iter() {
            let entry = decode(*byte).unwrap();
            assert!(entry.instruction.is_branch());
            assert_eq!(entry.mode, AddrMode::IMMEDIATE);
            assert_eq!(entry.cycles, 2);
            assert!(!entry.page_penalty);
        }
    }

    #[test]
    fn spot_check_canonical_rows() {
        let lda_imm = decode(0xa9).unwrap();
        assert_eq!(lda_imm.instruction, Instruction::LDA);
        assert_eq!(lda_imm.mode, AddrMode::IMMEDIATE);
        assert_eq!(lda_imm.cycles, 2);

        let asl_abx = decode(0x1e).unwrap();
        assert_eq!(asl_abx.instruction, Instruction::ASL);
        assert_eq!(asl_abx.mode, AddrMode::ABSOLUTE_X);
        assert_eq!(asl_abx.cycles, 7);
        assert!(!asl_abx.page_penalty);

        let sta_izy = decode(0x91).unwrap();
        assert_eq!(sta_izy.instruction, Instruction::STA);
        assert_eq!(sta_izy.cycles, 6);
        assert!(!sta_izy.page_penalty);

        let brk = decode(0x00).unwrap();
        assert_eq!(brk.instruction, Instruction::BRK);
        assert_eq!(brk.cycles, 7);
    }

    #[test]
    fn reverse_lookup_round_trips() {
        for byte in 0..=255u8 {
            if let Some(entry) = decode(byte) {
                assert_eq!(opcode_for(entry.instruction, entry.mode), Some(byte));
            }
        }
    }

    #[test]
    fn undefined_bytes_do_not_decode() {
        for byte in [0x02u8, 0x3f, 0x80, 0x9e, 0xff].iter() {
            assert!(decode(*byte).is_none(), "{:02x} is not documented", byte);
        }
    }
}
