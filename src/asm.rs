use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use colored::*;

use crate::constants::PROGRAM_ORIGIN;
use crate::opcodes::{match_instruction, opcode_for, AddrMode, Instruction};

/// What an operand's spelling says about its addressing mode. A bare `$NN`
/// cannot distinguish a zero-page access from a branch displacement until
/// the instruction is known, hence `ZeroPageOrRelative`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenMode {
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Immediate,
    Indirect,
    IndirectX,
    IndirectY,
    RegisterA,
    Relative,
    ZeroPageOrRelative,
    ZeroPageX,
    ZeroPageY,
    None,
}

/// The addressing modes a spelling may encode to, in preference order.
fn encodings(token_mode: TokenMode) -> &'static [AddrMode] {
    match token_mode {
        TokenMode::Absolute => &[AddrMode::ABSOLUTE],
        TokenMode::AbsoluteX => &[AddrMode::ABSOLUTE_X],
        TokenMode::AbsoluteY => &[AddrMode::ABSOLUTE_Y],
        TokenMode::Immediate => &[AddrMode::IMMEDIATE],
        TokenMode::Indirect => &[AddrMode::INDIRECT],
        TokenMode::IndirectX => &[AddrMode::INDIRECT_X],
        TokenMode::IndirectY => &[AddrMode::INDIRECT_Y],
        TokenMode::RegisterA => &[AddrMode::ACCUMULATOR],
        // Branches carry their displacement as the immediate operand byte.
        TokenMode::Relative => &[AddrMode::IMMEDIATE],
        TokenMode::ZeroPageOrRelative => &[AddrMode::ZERO_PAGE, AddrMode::IMMEDIATE],
        TokenMode::ZeroPageX => &[AddrMode::ZERO_PAGE_X],
        TokenMode::ZeroPageY => &[AddrMode::ZERO_PAGE_Y],
        TokenMode::None => &[AddrMode::IMPLIED, AddrMode::ACCUMULATOR],
    }
}

fn opcode_for_token(instruction: Instruction, token_mode: TokenMode) -> Result<u8, String> {
    for mode in encodings(token_mode) {
        if let Some(byte) = opcode_for(instruction, *mode) {
            return Ok(byte);
        }
    }
    Err(format!(
        "{:?} does not support {:?} addressing",
        instruction, token_mode
    ))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Instruction(Instruction),
    Mode(TokenMode),
    U8(u8),
    U16(u16),
    LabelDefinition(String),
    LabelOperand(String),
}

enum Width {
    U8(u8),
    U16(u16),
}

enum LabelKind {
    Absolute,
    Relative,
}

/// An assembled byte image, based at the program origin, plus the addresses
/// the labels resolved to.
pub struct Program {
    pub bytes: Vec<u8>,
    pub labels: HashMap<String, u16>,
}

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    nice_message: String,
    pub row: u64,
    pub column: u64,
}

impl ParseError {
    fn new(message: String, assembler: &Assembler) -> ParseError {
        let error_row_index = assembler.row as usize - 1;
        let context = 3;
        let first = error_row_index.saturating_sub(context);

        let mut nice_message = String::from("\n\n");
        for (row_index, row_text) in assembler.text.lines().enumerate() {
            if row_index > error_row_index + context {
                break;
            }
            if row_index < first {
                continue;
            }
            let gutter = format!("{:>4}: ", row_index + 1);
            nice_message.push_str(&format!("{}", gutter.cyan()));
            nice_message.push_str(&format!("{}", row_text.bright_white()));
            nice_message.push('\n');

            if row_index == error_row_index {
                let indent = " ".repeat((assembler.column + 5) as usize);
                let caret = format!(
                    "^ parse error on row {} column {}",
                    assembler.row, assembler.column
                );
                nice_message.push_str(&indent);
                nice_message.push_str(&format!("{}", caret.bright_red()));
                nice_message.push('\n');
                nice_message.push_str(&indent);
                nice_message.push_str(&format!("{}", message.bright_red()));
                nice_message.push('\n');
            }
        }
        nice_message.push('\n');

        ParseError {
            message,
            nice_message,
            row: assembler.row,
            column: assembler.column,
        }
    }

    pub fn panic_nicely(self) -> ! {
        panic!("{}", self.nice_message);
    }
}

/// A line-oriented assembler over the documented instruction set. Labels,
/// `.byte`/`.word` pragmas, `$`/`%`/decimal literals and `;` comments are
/// supported; programs are based at the program origin. This is host
/// tooling for the test suites; the CPU never depends on it.
pub struct Assembler<'a> {
    text: &'a str,
    characters: Peekable<Chars<'a>>,
    tokens: Vec<Token>,
    row: u64,
    column: u64,
}

impl<'a> Assembler<'a> {
    pub fn new(text: &'a str) -> Assembler<'a> {
        Assembler {
            text,
            characters: "".chars().peekable(),
            tokens: Vec::new(),
            row: 1,
            column: 0,
        }
    }

    /// Tokenize the whole source. Label addresses are fixed up later, when
    /// the token stream is lowered to bytes.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        let lines: Vec<&str> = self.text.lines().collect();
        for line in lines {
            self.characters = line.chars().peekable();
            self.column = 0;
            if let Err(message) = self.parse_line() {
                return Err(ParseError::new(message, self));
            }
            self.row += 1;
        }
        Ok(())
    }

    fn parse_line(&mut self) -> Result<(), String> {
        loop {
            match self.next_character() {
                None => return Ok(()),
                Some(character) if character.is_whitespace() => {}
                Some(';') => return self.skip_comment(),
                Some(character) if character.is_alphabetic() => {
                    let word = self.get_word(Some(character))?;
                    match match_instruction(&word) {
                        Some(instruction) => {
                            self.tokens.push(Token::Instruction(instruction));
                            self.parse_operand(instruction)?;
                        }
                        None => {
                            self.expect_character(':')?;
                            self.tokens.push(Token::LabelDefinition(word));
                        }
                    }
                }
                Some('.') => self.parse_pragma()?,
                Some(character) => {
                    return Err(format!("Unknown next token: {:?}", character));
                }
            }
        }
    }

    fn parse_pragma(&mut self) -> Result<(), String> {
        let pragma = self.get_word(None)?;
        match pragma.as_ref() {
            "byte" => loop {
                self.skip_whitespace();
                let value = self.next_number_u8()?;
                self.tokens.push(Token::U8(value));
                if !self.find_comma()? {
                    return Ok(());
                }
            },
            "word" => loop {
                self.skip_whitespace();
                let value = self.next_number_u16()?;
                self.tokens.push(Token::U16(value));
                if !self.find_comma()? {
                    return Ok(());
                }
            },
            _ => Err(format!("Unknown pragma \".{}\"", pragma)),
        }
    }

    /// imm = #$00
    /// zp = $00
    /// zpx = $00,X
    /// zpy = $00,Y
    /// izx = ($00,X)
    /// izy = ($00),Y
    /// abs = $0000
    /// abx = $0000,X
    /// aby = $0000,Y
    /// ind = ($0000)
    /// rel = a label or a raw displacement byte
    fn parse_operand(&mut self, instruction: Instruction) -> Result<(), String> {
        loop {
            let character = match self.characters.peek() {
                None => break,
                Some(&character) => character,
            };
            if character.is_whitespace() {
                self.next_character();
                continue;
            }
            if character == ';' {
                opcode_for_token(instruction, TokenMode::None)?;
                self.next_character();
                return self.skip_comment();
            }
            if character.is_alphabetic() {
                let word = self.get_word(None)?;
                if word == "A" || word == "a" {
                    self.tokens.push(Token::Mode(TokenMode::RegisterA));
                } else {
                    self.tokens.push(Token::LabelOperand(word));
                }
                return self.continue_to_end_of_line();
            }
            if character == '#' {
                self.next_character();
                self.tokens.push(Token::Mode(TokenMode::Immediate));
                let value = self.next_number_u8()?;
                self.tokens.push(Token::U8(value));
                return self.continue_to_end_of_line();
            }
            if character == '(' {
                self.next_character();
                return self.parse_indirect_operand();
            }
            if character == '$' || character == '%' || character.is_numeric() {
                return self.parse_address_operand();
            }
            return Err(format!(
                "Unknown character when parsing an operand: {:?}",
                character
            ));
        }
        // Nothing followed the mnemonic at all.
        opcode_for_token(instruction, TokenMode::None)?;
        Ok(())
    }

    /// jmp ($1234) ; indirect
    /// and ($aa,X) ; indexed indirect
    /// and ($aa),Y ; indirect indexed
    fn parse_indirect_operand(&mut self) -> Result<(), String> {
        match self.next_number()? {
            Width::U8(value) => {
                match self.next_character_or_err()? {
                    ',' => {
                        self.expect_character_ignore_casing('X')?;
                        self.expect_character(')')?;
                        self.tokens.push(Token::Mode(TokenMode::IndirectX));
                    }
                    ')' => {
                        self.expect_character(',')?;
                        self.expect_character_ignore_casing('Y')?;
                        self.tokens.push(Token::Mode(TokenMode::IndirectY));
                    }
                    character => {
                        return Err(format!("Unexpected character {:?}", character));
                    }
                }
                self.tokens.push(Token::U8(value));
            }
            Width::U16(value) => {
                self.expect_character(')')?;
                self.tokens.push(Token::Mode(TokenMode::Indirect));
                self.tokens.push(Token::U16(value));
            }
        }
        self.continue_to_end_of_line()
    }

    fn parse_address_operand(&mut self) -> Result<(), String> {
        match self.next_number()? {
            Width::U8(value) => {
                if self.peek_is(',') {
                    self.next_character();
                    let token = self.index_mode_token(true)?;
                    self.tokens.push(token);
                } else {
                    self.tokens.push(Token::Mode(TokenMode::ZeroPageOrRelative));
                }
                self.tokens.push(Token::U8(value));
            }
            Width::U16(value) => {
                if self.peek_is(',') {
                    self.next_character();
                    let token = self.index_mode_token(false)?;
                    self.tokens.push(token);
                } else {
                    self.tokens.push(Token::Mode(TokenMode::Absolute));
                }
                self.tokens.push(Token::U16(value));
            }
        }
        self.continue_to_end_of_line()
    }

    fn index_mode_token(&mut self, zero_page: bool) -> Result<Token, String> {
        let register = self.next_character_or_err()?;
        let mode = match (register.to_ascii_lowercase(), zero_page) {
            ('x', true) => TokenMode::ZeroPageX,
            ('y', true) => TokenMode::ZeroPageY,
            ('x', false) => TokenMode::AbsoluteX,
            ('y', false) => TokenMode::AbsoluteY,
            _ => return Err(format!("Unexpected index register: {:?}", register)),
        };
        Ok(Token::Mode(mode))
    }

    /// Lower the token stream to bytes, then patch the label references.
    pub fn into_bytes(self) -> Result<Program, String> {
        let mut bytes = Vec::new();
        let mut definitions: HashMap<String, usize> = HashMap::new();
        let mut references: Vec<(String, usize, LabelKind)> = Vec::new();

        let mut tokens = self.tokens.iter().peekable();
        while let Some(token) = tokens.next() {
            match token {
                Token::Instruction(instruction) => match tokens.peek() {
                    Some(Token::LabelOperand(label)) => {
                        if instruction.is_branch() {
                            bytes.push(opcode_for_token(*instruction, TokenMode::Relative)?);
                            references.push((label.clone(), bytes.len(), LabelKind::Relative));
                            bytes.push(0);
                        } else {
                            bytes.push(opcode_for_token(*instruction, TokenMode::Absolute)?);
                            references.push((label.clone(), bytes.len(), LabelKind::Absolute));
                            bytes.push(0);
                            bytes.push(0);
                        }
                        tokens.next();
                    }
                    Some(Token::Mode(mode)) => {
                        bytes.push(opcode_for_token(*instruction, *mode)?);
                        tokens.next();
                        match mode {
                            TokenMode::Absolute
                            | TokenMode::AbsoluteX
                            | TokenMode::AbsoluteY
                            | TokenMode::Indirect => match tokens.next() {
                                Some(Token::U16(value)) => {
                                    let [low, high] = value.to_le_bytes();
                                    bytes.push(low);
                                    bytes.push(high);
                                }
                                token => {
                                    return Err(format!(
                                        "Expected a u16 operand, found {:?}",
                                        token
                                    ))
                                }
                            },
                            TokenMode::Immediate
                            | TokenMode::IndirectX
                            | TokenMode::IndirectY
                            | TokenMode::Relative
                            | TokenMode::ZeroPageOrRelative
                            | TokenMode::ZeroPageX
                            | TokenMode::ZeroPageY => match tokens.next() {
                                Some(Token::U8(value)) => bytes.push(*value),
                                token => {
                                    return Err(format!(
                                        "Expected a u8 operand, found {:?}",
                                        token
                                    ))
                                }
                            },
                            TokenMode::RegisterA | TokenMode::None => {}
                        }
                    }
                    _ => {
                        bytes.push(opcode_for_token(*instruction, TokenMode::None)?);
                    }
                },
                Token::LabelDefinition(label) => {
                    definitions.insert(label.clone(), bytes.len());
                }
                Token::LabelOperand(label) => {
                    return Err(format!(
                        "The label {:?} does not follow an instruction",
                        label
                    ));
                }
                Token::U8(value) => bytes.push(*value),
                Token::U16(value) => {
                    let [low, high] = value.to_le_bytes();
                    bytes.push(low);
                    bytes.push(high);
                }
                Token::Mode(mode) => {
                    return Err(format!("Unexpected mode token at the root level: {:?}", mode));
                }
            }
        }

        for (label, operand_offset, kind) in references {
            let target = *definitions
                .get(&label)
                .ok_or_else(|| format!("The label {:?} was never defined", label))?;
            match kind {
                LabelKind::Relative => {
                    // Displacements are relative to the instruction after
                    // the branch, one byte past the operand.
                    let displacement = target as i32 - (operand_offset as i32 + 1);
                    if displacement > 127 || displacement < -128 {
                        return Err(format!(
                            "The label {:?} is too far away for a branch",
                            label
                        ));
                    }
                    bytes[operand_offset] = displacement as u8;
                }
                LabelKind::Absolute => {
                    let address = PROGRAM_ORIGIN.wrapping_add(target as u16);
                    let [low, high] = address.to_le_bytes();
                    bytes[operand_offset] = low;
                    bytes[operand_offset + 1] = high;
                }
            }
        }

        let labels = definitions
            .into_iter()
            .map(|(label, offset)| (label, PROGRAM_ORIGIN.wrapping_add(offset as u16)))
            .collect();

        Ok(Program { bytes, labels })
    }

    fn next_character(&mut self) -> Option<char> {
        let character = self.characters.next();
        if character.is_some() {
            self.column += 1;
        }
        character
    }

    fn next_character_or_err(&mut self) -> Result<char, String> {
        self.next_character()
            .ok_or_else(|| "Unexpected end of line.".to_string())
    }

    fn peek_is(&mut self, value: char) -> bool {
        self.characters.peek() == Some(&value)
    }

    fn expect_character(&mut self, value: char) -> Result<(), String> {
        let next = self.next_character_or_err()?;
        if next == value {
            Ok(())
        } else {
            Err(format!("Expected the character {:?} but found {:?}", value, next))
        }
    }

    fn expect_character_ignore_casing(&mut self, value: char) -> Result<(), String> {
        let next = self.next_character_or_err()?;
        if next.to_ascii_lowercase() == value.to_ascii_lowercase() {
            Ok(())
        } else {
            Err(format!("Expected the character {:?} but found {:?}", value, next))
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(character) = self.characters.peek() {
            if !character.is_whitespace() {
                return;
            }
            self.next_character();
        }
    }

    fn skip_comment(&mut self) -> Result<(), String> {
        while self.next_character().is_some() {}
        Ok(())
    }

    /// The rest of the line may hold only whitespace or a comment.
    fn continue_to_end_of_line(&mut self) -> Result<(), String> {
        loop {
            match self.next_character() {
                None => return Ok(()),
                Some(character) if character.is_whitespace() => {}
                Some(';') => return self.skip_comment(),
                Some(character) => {
                    return Err(format!("Unknown character encountered: {:?}", character));
                }
            }
        }
    }

    /// Attempt to find a comma after a pragma value. False means the end of
    /// the line was reached instead.
    fn find_comma(&mut self) -> Result<bool, String> {
        self.skip_whitespace();
        loop {
            match self.characters.peek() {
                None => return Ok(false),
                Some(',') => {
                    self.next_character();
                    self.skip_whitespace();
                    return Ok(true);
                }
                Some(';') => {
                    self.skip_comment()?;
                    return Ok(false);
                }
                Some(&character) => {
                    return Err(format!(
                        "Unknown character when expecting a comma: {:?}",
                        character
                    ));
                }
            }
        }
    }

    fn get_word(&mut self, starting_character: Option<char>) -> Result<String, String> {
        let mut word = String::new();
        if let Some(starting_character) = starting_character {
            word.push(starting_character);
        }
        while let Some(&character) = self.characters.peek() {
            if character.is_alphanumeric() || character == '_' {
                word.push(character);
                self.next_character();
            } else {
                break;
            }
        }
        if word.is_empty() {
            return Err("Expected an alphanumeric word.".to_string());
        }
        Ok(word)
    }

    /// `$` hex (2 or 4 digits), `%` binary (8 or 16 digits) or a bare
    /// decimal byte.
    fn next_number(&mut self) -> Result<Width, String> {
        match self.next_character_or_err()? {
            '$' => {
                let word = self.get_word(None)?;
                match word.len() {
                    2 => u8::from_str_radix(&word, 16)
                        .map(Width::U8)
                        .map_err(|_| format!("Unable to parse \"${}\" as hex", word)),
                    4 => u16::from_str_radix(&word, 16)
                        .map(Width::U16)
                        .map_err(|_| format!("Unable to parse \"${}\" as hex", word)),
                    _ => Err("A hex number must be either 2 or 4 digits long.".to_string()),
                }
            }
            '%' => {
                let word = self.get_word(None)?;
                match word.len() {
                    8 => u8::from_str_radix(&word, 2)
                        .map(Width::U8)
                        .map_err(|_| format!("Unable to parse \"%{}\" as binary", word)),
                    16 => u16::from_str_radix(&word, 2)
                        .map(Width::U16)
                        .map_err(|_| format!("Unable to parse \"%{}\" as binary", word)),
                    _ => Err("A binary number must be either 8 or 16 digits long.".to_string()),
                }
            }
            character => {
                let word = self.get_word(Some(character))?;
                word.parse::<u8>()
                    .map(Width::U8)
                    .map_err(|_| format!("Unable to parse {:?} as an integer", word))
            }
        }
    }

    fn next_number_u8(&mut self) -> Result<u8, String> {
        match self.next_number()? {
            Width::U8(value) => Ok(value),
            Width::U16(_) => Err("Expected a byte, found a word.".to_string()),
        }
    }

    fn next_number_u16(&mut self) -> Result<u16, String> {
        match self.next_number()? {
            Width::U8(value) => Ok(value as u16),
            Width::U16(value) => Ok(value),
        }
    }
}

/// Assemble or panic with a readable, source-quoting message. The
/// convenience entry point for tests.
pub fn assemble(text: &str) -> Program {
    let mut assembler = Assembler::new(text);
    match assembler.parse() {
        Ok(()) => match assembler.into_bytes() {
            Ok(program) => program,
            Err(message) => panic!("assembly failed: {}", message),
        },
        Err(parse_error) => parse_error.panic_nicely(),
    }
}
