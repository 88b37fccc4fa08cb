use crate::core::Core;
use crate::error::Anomaly;
use crate::instruction::{Instruction, Mode, Opcode, WarriorId};

/// Unique id of a process within a match.
pub type ProcessId = u64;

/// One independently scheduled instruction pointer of a warrior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Process {
    pub id: ProcessId,
    pub warrior: WarriorId,
    pub ip: usize,
}

/// Result of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    /// `false` means the process must be removed.
    pub survived: bool,
    /// `true` means the instruction already repositioned `ip`.
    pub ip_advanced: bool,
    /// Start address of a process requested by SPL.
    pub split: Option<usize>,
    /// Every anomaly hit while executing, in the order they arose.
    pub anomalies: Vec<Anomaly>,
}

impl Outcome {
    fn died() -> Self {
        Self::default()
    }

    fn next() -> Self {
        Self {
            survived: true,
            ..Self::default()
        }
    }

    fn jumped() -> Self {
        Self {
            survived: true,
            ip_advanced: true,
            ..Self::default()
        }
    }

    fn with_anomaly(mut self, anomaly: Option<Anomaly>) -> Self {
        self.anomalies.extend(anomaly);
        self
    }
}

/// Resolve the cell an operand designates.
///
/// An immediate operand designates the executing cell itself; that case is
/// reported back as an anomaly.
fn target(core: &Core, ip: usize, opcode: Opcode, mode: Mode, value: i64) -> (usize, Option<Anomaly>) {
    match core.effective_address(ip, mode, value) {
        Some(address) => (address, None),
        None => (ip, Some(Anomaly::ImmediateTarget { opcode, ip })),
    }
}

/// Execute the instruction at `process.ip` on behalf of `process`.
///
/// Mutates the core and, for jumps, `process.ip`. The caller applies the
/// rest of the returned [`Outcome`]: removing dead processes, advancing the
/// IP when `ip_advanced` is false, and admitting split processes.
pub fn execute(core: &mut Core, process: &mut Process) -> Outcome {
    let ip = process.ip;
    let instr = match core.get(ip) {
        None => return Outcome::died(),
        Some(instr) if instr.opcode == Opcode::Dat => return Outcome::died(),
        Some(instr) => instr,
    };
    let owner = Some(process.warrior);
    let op = instr.opcode;

    match op {
        Opcode::Mov => {
            let (dest, anomaly) = target(core, ip, op, instr.b_mode, instr.b_value);
            let source = match core.effective_address(ip, instr.a_mode, instr.a_value) {
                None => Instruction::new(Opcode::Dat, Mode::Immediate, 0, Mode::Immediate, instr.a_value),
                Some(address) => core.get(address).unwrap_or(Instruction::dat(0, 0)),
            };
            core.set(dest, source.with_owner(owner));
            Outcome::next().with_anomaly(anomaly)
        }
        Opcode::Add | Opcode::Sub => {
            let (dest, anomaly) = target(core, ip, op, instr.b_mode, instr.b_value);
            let Some(current) = core.get(dest) else {
                return Outcome::next()
                    .with_anomaly(anomaly)
                    .with_anomaly(Some(Anomaly::EmptyTarget { opcode: op, address: dest }));
            };
            let a = core.operand_value(ip, instr.a_mode, instr.a_value);
            let b = if op == Opcode::Add {
                core.offset(core.wrap(current.b_value), a)
            } else {
                core.offset(core.wrap(current.b_value), -(a % core.size() as i64))
            };
            core.set(
                dest,
                Instruction {
                    b_value: b as i64,
                    owner,
                    ..current
                },
            );
            Outcome::next().with_anomaly(anomaly)
        }
        Opcode::Jmp => {
            let (jump, anomaly) = target(core, ip, op, instr.a_mode, instr.a_value);
            process.ip = jump;
            Outcome::jumped().with_anomaly(anomaly)
        }
        Opcode::Jmz => {
            let (dest, anomaly) = target(core, ip, op, instr.b_mode, instr.b_value);
            let empty = core
                .get(dest)
                .is_none()
                .then_some(Anomaly::EmptyTarget { opcode: op, address: dest });
            if core.b_field(dest) == 0 {
                let (jump, jump_anomaly) = target(core, ip, op, instr.a_mode, instr.a_value);
                process.ip = jump;
                Outcome::jumped()
                    .with_anomaly(anomaly)
                    .with_anomaly(jump_anomaly)
                    .with_anomaly(empty)
            } else {
                Outcome::next().with_anomaly(anomaly)
            }
        }
        Opcode::Djn => {
            let (dest, anomaly) = target(core, ip, op, instr.b_mode, instr.b_value);
            let Some(current) = core.get(dest) else {
                return Outcome::next()
                    .with_anomaly(anomaly)
                    .with_anomaly(Some(Anomaly::EmptyTarget { opcode: op, address: dest }));
            };
            let b = core.offset(core.wrap(current.b_value), -1);
            core.set(
                dest,
                Instruction {
                    b_value: b as i64,
                    owner,
                    ..current
                },
            );
            if b != 0 {
                let (jump, jump_anomaly) = target(core, ip, op, instr.a_mode, instr.a_value);
                process.ip = jump;
                Outcome::jumped().with_anomaly(anomaly).with_anomaly(jump_anomaly)
            } else {
                Outcome::next().with_anomaly(anomaly)
            }
        }
        Opcode::Spl => {
            let (spawn, anomaly) = target(core, ip, op, instr.a_mode, instr.a_value);
            Outcome {
                split: Some(spawn),
                ..Outcome::next()
            }
            .with_anomaly(anomaly)
        }
        Opcode::Dat => Outcome::died(),
    }
}
