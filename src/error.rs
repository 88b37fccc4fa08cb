use thiserror::Error;

use crate::instruction::{Opcode, WarriorId};

/// Errors raised while building a match. No match is started when one occurs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("no warriors to load")]
    NoWarriors,
    #[error("warrior {0} has no code")]
    EmptyCode(WarriorId),
    #[error("warrior {0} is placed more than once")]
    DuplicateWarrior(WarriorId),
    /// Every cell of this warrior was overwritten by a later placement.
    #[error("warrior {0} owns no cell after loading; cannot seed a process")]
    Unseeded(WarriorId),
    #[error("core size must be positive")]
    CoreTooSmall,
    #[error("cycles per tick must be at least 1")]
    ZeroCyclesPerTick,
}

/// Scheduler invariant violations. The match halts when one is raised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("rotation cursor {cursor} outside process queue of length {len}")]
    CursorOutOfBounds { cursor: usize, len: usize },
    #[error("match halted after an engine error")]
    Halted,
}

/// Errors from the one-line instruction parser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected `OPCODE A, B`, got `{0}`")]
    Shape(String),
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("invalid operand `{0}`")]
    InvalidValue(String),
}

/// Errors from looking up built-in warriors.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("unknown warrior `{0}`")]
    UnknownWarrior(String),
    #[error("warrior `{name}` line {line}: {source}")]
    Code {
        name: &'static str,
        line: usize,
        #[source]
        source: ParseError,
    },
}

/// A recoverable oddity hit while executing an instruction.
///
/// Anomalies never stop a match; they are counted and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// ADD, SUB, DJN or JMZ addressed an empty cell.
    EmptyTarget { opcode: Opcode, address: usize },
    /// An immediate operand was used where a location was required; the
    /// executing cell was used instead.
    ImmediateTarget { opcode: Opcode, ip: usize },
}
