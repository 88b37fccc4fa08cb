use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Identifies a warrior. Also used as the owner tag of a cell.
pub type WarriorId = u32;

/// The closed set of opcodes understood by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Copy A to B.
    Mov,
    /// Add A to the B-field of B.
    Add,
    /// Subtract A from the B-field of B.
    Sub,
    /// Jump to A.
    Jmp,
    /// Jump to A if the B-field of B is zero.
    Jmz,
    /// Decrement the B-field of B, jump to A if the result is non-zero.
    Djn,
    /// Start a new process at A.
    Spl,
    /// Data. Kills the process that executes it.
    Dat,
}

impl Opcode {
    pub const ALL: [Opcode; 8] = [
        Opcode::Mov,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Jmp,
        Opcode::Jmz,
        Opcode::Djn,
        Opcode::Spl,
        Opcode::Dat,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Jmp => "JMP",
            Opcode::Jmz => "JMZ",
            Opcode::Djn => "DJN",
            Opcode::Spl => "SPL",
            Opcode::Dat => "DAT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for Opcode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownOpcode(s.to_string()))
    }
}

/// Operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `#`: the value is the operand itself.
    Immediate,
    /// `$`: the value is an offset from the executing instruction.
    Direct,
    /// `@`: the offset is the B-field found at `ip + value`, applied to `ip`.
    Indirect,
}

impl Mode {
    pub fn sigil(self) -> char {
        match self {
            Mode::Immediate => '#',
            Mode::Direct => '$',
            Mode::Indirect => '@',
        }
    }

    fn from_sigil(c: char) -> Option<Mode> {
        match c {
            '#' => Some(Mode::Immediate),
            '$' => Some(Mode::Direct),
            '@' => Some(Mode::Indirect),
            _ => None,
        }
    }
}

/// One instruction as stored in a core cell.
///
/// Instructions are plain values: the interpreter never patches a stored
/// instruction, it builds a new one and writes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub a_mode: Mode,
    pub a_value: i64,
    pub b_mode: Mode,
    pub b_value: i64,
    /// Warrior whose process last wrote this cell, if any.
    pub owner: Option<WarriorId>,
}

impl Instruction {
    pub fn new(opcode: Opcode, a_mode: Mode, a_value: i64, b_mode: Mode, b_value: i64) -> Self {
        Self {
            opcode,
            a_mode,
            a_value,
            b_mode,
            b_value,
            owner: None,
        }
    }

    /// Unowned `DAT #a, #b`.
    pub fn dat(a_value: i64, b_value: i64) -> Self {
        Self::new(Opcode::Dat, Mode::Immediate, a_value, Mode::Immediate, b_value)
    }

    pub fn with_owner(self, owner: Option<WarriorId>) -> Self {
        Self { owner, ..self }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}, {}{}",
            self.opcode,
            self.a_mode.sigil(),
            self.a_value,
            self.b_mode.sigil(),
            self.b_value
        )
    }
}

fn parse_operand(operand: &str) -> Result<(Mode, i64), ParseError> {
    let operand = operand.trim();
    let (mode, digits) = match operand.chars().next().and_then(Mode::from_sigil) {
        Some(mode) => (mode, &operand[1..]),
        // Unprefixed operands are direct.
        None => (Mode::Direct, operand),
    };
    let value = digits
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidValue(operand.to_string()))?;
    Ok((mode, value))
}

/// Parses a single line of the form `OPCODE A, B`, e.g. `MOV #0, $1`.
///
/// This is not an assembler: there are no labels, expressions or comments.
/// The result is unowned; the loader stamps ownership.
impl FromStr for Instruction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(',').collect();
        if parts.len() != 2 {
            return Err(ParseError::Shape(s.to_string()));
        }
        let mut head = parts[0].split_whitespace();
        let (Some(opcode), Some(a), None) = (head.next(), head.next(), head.next()) else {
            return Err(ParseError::Shape(s.to_string()));
        };
        let opcode: Opcode = opcode.parse()?;
        let (a_mode, a_value) = parse_operand(a)?;
        let (b_mode, b_value) = parse_operand(parts[1])?;
        Ok(Instruction::new(opcode, a_mode, a_value, b_mode, b_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let instr = Instruction::new(Opcode::Mov, Mode::Immediate, 0, Mode::Direct, 1);
        assert_eq!(instr.to_string(), "MOV #0, $1");
        let instr = Instruction::new(Opcode::Djn, Mode::Direct, -3, Mode::Indirect, 7);
        assert_eq!(instr.to_string(), "DJN $-3, @7");
    }

    #[test]
    fn test_parse_basic() {
        let instr: Instruction = "MOV #0, $1".parse().unwrap();
        assert_eq!(instr, Instruction::new(Opcode::Mov, Mode::Immediate, 0, Mode::Direct, 1));
        assert_eq!(instr.owner, None);
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        let instr: Instruction = "  jmp   $-2 ,#0 ".parse().unwrap();
        assert_eq!(instr, Instruction::new(Opcode::Jmp, Mode::Direct, -2, Mode::Immediate, 0));
    }

    #[test]
    fn test_parse_unprefixed_is_direct() {
        let instr: Instruction = "DAT 0, 300".parse().unwrap();
        assert_eq!(instr.a_mode, Mode::Direct);
        assert_eq!(instr.b_mode, Mode::Direct);
        assert_eq!(instr.b_value, 300);
    }

    #[test]
    fn test_parse_indirect_negative() {
        let instr: Instruction = "MOV $3, @-980".parse().unwrap();
        assert_eq!(instr.b_mode, Mode::Indirect);
        assert_eq!(instr.b_value, -980);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("MOV #0".parse::<Instruction>(), Err(ParseError::Shape(_))));
        assert!(matches!("MOV #0, $1, $2".parse::<Instruction>(), Err(ParseError::Shape(_))));
        assert!(matches!("NOP #0, $1".parse::<Instruction>(), Err(ParseError::UnknownOpcode(_))));
        assert!(matches!("MOV #x, $1".parse::<Instruction>(), Err(ParseError::InvalidValue(_))));
        assert!(matches!("MOV #, $1".parse::<Instruction>(), Err(ParseError::InvalidValue(_))));
    }

    #[test]
    fn test_display_parse_agree() {
        for op in Opcode::ALL {
            let instr = Instruction::new(op, Mode::Indirect, -12, Mode::Immediate, 4095);
            let parsed: Instruction = instr.to_string().parse().unwrap();
            assert_eq!(parsed, instr);
        }
    }

    #[test]
    fn test_with_owner_builds_new_value() {
        let original = Instruction::dat(0, 5);
        let owned = original.with_owner(Some(3));
        assert_eq!(original.owner, None);
        assert_eq!(owned.owner, Some(3));
        assert_eq!(owned.b_value, 5);
    }
}
