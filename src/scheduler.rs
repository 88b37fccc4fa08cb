use log::{debug, info, trace};

use crate::core::{Core, MEMORY_SIZE};
use crate::error::{Anomaly, EngineError, LoadError};
use crate::instruction::{Instruction, WarriorId};
use crate::interpreter::{Process, ProcessId, execute};
use crate::loader::Placement;

/// Where a process created by SPL enters the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitPlacement {
    /// After every current process.
    #[default]
    Append,
    /// Directly after the process that split, so it runs on the next cycle.
    AfterCurrent,
}

/// Configuration for a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Number of cells in the core.
    pub core_size: usize,
    /// Cycles executed by each [`Match::tick`].
    pub cycles_per_tick: usize,
    /// Cycle cutoff after which a still-running match is a draw.
    pub max_cycles: Option<u64>,
    pub split_placement: SplitPlacement,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            core_size: MEMORY_SIZE,
            cycles_per_tick: 1,
            max_cycles: Some(80_000),
            split_placement: SplitPlacement::Append,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchState {
    /// At least two warriors still have processes (or only one warrior ever
    /// participated and it is still alive).
    Running,
    /// Only this warrior's processes remain.
    Won(WarriorId),
    /// No processes remain.
    Drained,
    /// The cycle cutoff was reached.
    Draw,
}

impl MatchState {
    pub fn is_terminal(self) -> bool {
        self != MatchState::Running
    }

    pub fn winner(self) -> Option<WarriorId> {
        match self {
            MatchState::Won(w) => Some(w),
            _ => None,
        }
    }
}

/// What the tick driver gets back after running cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: MatchState,
    pub winner: Option<WarriorId>,
    /// Cycles actually executed by this call.
    pub executed: u64,
}

/// Running counters, for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchStats {
    pub deaths: u64,
    pub splits: u64,
    pub anomalies: u64,
}

/// An owned copy of a match, for observers that outlive a borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub cells: Vec<Option<Instruction>>,
    pub processes: Vec<Process>,
    pub cycle: u64,
    pub state: MatchState,
}

/// One match: the core, the process queue and the rotation cursor.
///
/// Processes execute one at a time in queue order. A dead process is
/// removed at the cursor without advancing it, so the next process slides
/// into its slot. Terminal conditions are re-checked after every cycle.
pub struct Match {
    core: Core,
    processes: Vec<Process>,
    cursor: usize,
    next_process: ProcessId,
    participants: Vec<WarriorId>,
    cycle: u64,
    state: MatchState,
    halted: bool,
    stats: MatchStats,
    config: MatchConfig,
}

impl Match {
    /// Load warriors into a fresh core and seed one process per warrior.
    pub fn load(config: MatchConfig, placements: &[Placement]) -> Result<Self, LoadError> {
        if config.core_size == 0 {
            return Err(LoadError::CoreTooSmall);
        }
        if config.cycles_per_tick == 0 {
            return Err(LoadError::ZeroCyclesPerTick);
        }
        let mut core = Core::new(config.core_size);
        crate::loader::write_placements(&mut core, placements)?;
        let participants: Vec<WarriorId> = placements.iter().map(|p| p.warrior).collect();
        let seeds = crate::loader::seed_processes(&core, &participants)?;

        let processes: Vec<Process> = seeds
            .into_iter()
            .enumerate()
            .map(|(id, (warrior, ip))| Process {
                id: id as ProcessId,
                warrior,
                ip,
            })
            .collect();
        for p in &processes {
            info!("seeded process {} for warrior {} at {}", p.id, p.warrior, p.ip);
        }

        let mut m = Self {
            core,
            next_process: processes.len() as ProcessId,
            processes,
            cursor: 0,
            participants,
            cycle: 0,
            state: MatchState::Running,
            halted: false,
            stats: MatchStats::default(),
            config,
        };
        m.state = m.evaluate();
        Ok(m)
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn participants(&self) -> &[WarriorId] {
        &self.participants
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cells: self.core.cells().to_vec(),
            processes: self.processes.clone(),
            cycle: self.cycle,
            state: self.state,
        }
    }

    /// Run `cycles_per_tick` cycles.
    pub fn tick(&mut self) -> Result<Status, EngineError> {
        self.run_cycles(self.config.cycles_per_tick as u64)
    }

    /// Run up to `n` cycles, stopping early once the match is decided.
    pub fn run_cycles(&mut self, n: u64) -> Result<Status, EngineError> {
        if self.halted {
            return Err(EngineError::Halted);
        }
        let mut executed = 0;
        while executed < n && !self.state.is_terminal() {
            if let Err(e) = self.step() {
                self.halted = true;
                return Err(e);
            }
            executed += 1;
            self.state = self.evaluate();
        }
        if self.state.is_terminal() && executed > 0 {
            info!("match ended after {} cycles: {:?}", self.cycle, self.state);
        }
        Ok(Status {
            state: self.state,
            winner: self.state.winner(),
            executed,
        })
    }

    /// Run until the match is decided. Requires a cycle cutoff or a match
    /// that terminates on its own.
    pub fn run_to_end(&mut self) -> Result<Status, EngineError> {
        let mut executed = 0;
        loop {
            let status = self.run_cycles(u64::MAX)?;
            executed += status.executed;
            if status.state.is_terminal() {
                return Ok(Status { executed, ..status });
            }
        }
    }

    fn step(&mut self) -> Result<(), EngineError> {
        let len = self.processes.len();
        if len == 0 {
            return Err(EngineError::CursorOutOfBounds { cursor: self.cursor, len });
        }
        self.cursor %= len;
        let cursor = self.cursor;
        let Some(process) = self.processes.get_mut(cursor) else {
            return Err(EngineError::CursorOutOfBounds { cursor, len });
        };

        trace!(
            "#{} process {} warrior {} @{}: {}",
            self.cycle,
            process.id,
            process.warrior,
            process.ip,
            self.core
                .get(process.ip)
                .map_or_else(|| "<empty>".to_string(), |i| i.to_string())
        );
        let outcome = execute(&mut self.core, process);
        self.cycle += 1;

        for &anomaly in &outcome.anomalies {
            self.stats.anomalies += 1;
            log_anomaly(anomaly, process);
        }

        if !outcome.survived {
            trace!("process {} of warrior {} died at {}", process.id, process.warrior, process.ip);
            self.processes.remove(cursor);
            self.stats.deaths += 1;
            return Ok(());
        }

        if !outcome.ip_advanced {
            process.ip = (process.ip + 1) % self.core.size();
        }
        let warrior = process.warrior;
        self.cursor += 1;

        if let Some(ip) = outcome.split {
            let child = Process {
                id: self.next_process,
                warrior,
                ip,
            };
            self.next_process += 1;
            self.stats.splits += 1;
            match self.config.split_placement {
                SplitPlacement::Append => self.processes.push(child),
                SplitPlacement::AfterCurrent => self.processes.insert(cursor + 1, child),
            }
        }
        Ok(())
    }

    fn evaluate(&self) -> MatchState {
        let Some(first) = self.processes.first() else {
            return MatchState::Drained;
        };
        if self.participants.len() > 1 && self.processes.iter().all(|p| p.warrior == first.warrior) {
            return MatchState::Won(first.warrior);
        }
        match self.config.max_cycles {
            Some(max) if self.cycle >= max => MatchState::Draw,
            _ => MatchState::Running,
        }
    }
}

fn log_anomaly(anomaly: Anomaly, process: &Process) {
    match anomaly {
        Anomaly::EmptyTarget { opcode, address } => {
            debug!("{opcode} of process {} targets empty cell {address}; skipped", process.id)
        }
        Anomaly::ImmediateTarget { opcode, ip } => {
            debug!("{opcode} of process {} uses an immediate location at {ip}", process.id)
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::instruction::{Mode, Opcode};
    use proptest::prelude::*;

    fn instruction() -> impl Strategy<Value = Instruction> {
        let opcode = prop::sample::select(Opcode::ALL.to_vec());
        let mode = prop_oneof![Just(Mode::Immediate), Just(Mode::Direct), Just(Mode::Indirect)];
        (opcode, mode.clone(), -300i64..300, mode, -300i64..300)
            .prop_map(|(op, am, a, bm, b)| Instruction::new(op, am, a, bm, b))
    }

    fn warriors() -> impl Strategy<Value = Vec<Placement>> {
        prop::collection::vec(prop::collection::vec(instruction(), 1..8), 2..4).prop_map(|codes| {
            codes
                .into_iter()
                .enumerate()
                .map(|(i, code)| Placement {
                    warrior: i as WarriorId + 1,
                    start: i * 64,
                    code,
                })
                .collect()
        })
    }

    fn config(split_placement: SplitPlacement) -> MatchConfig {
        MatchConfig {
            core_size: 256,
            max_cycles: Some(2_000),
            split_placement,
            ..Default::default()
        }
    }

    proptest! {
        #[test]
        fn batch_matches_single_steps(placements in warriors(), after in any::<bool>()) {
            let split = if after { SplitPlacement::AfterCurrent } else { SplitPlacement::Append };
            let mut batch = Match::load(config(split), &placements).unwrap();
            let mut single = Match::load(config(split), &placements).unwrap();
            batch.run_cycles(2_000).unwrap();
            for _ in 0..2_000 {
                single.run_cycles(1).unwrap();
            }
            prop_assert_eq!(batch.snapshot(), single.snapshot());
        }

        #[test]
        fn queue_length_tracks_deaths_and_splits(placements in warriors()) {
            let mut m = Match::load(config(SplitPlacement::Append), &placements).unwrap();
            for _ in 0..500 {
                let before = m.processes().len() as i64;
                let stats = m.stats();
                m.run_cycles(1).unwrap();
                let after = m.processes().len() as i64;
                let deaths = (m.stats().deaths - stats.deaths) as i64;
                let splits = (m.stats().splits - stats.splits) as i64;
                prop_assert_eq!(after - before, splits - deaths);
                prop_assert!(deaths + splits <= 1);
            }
        }

        #[test]
        fn processes_stay_in_core(placements in warriors()) {
            let mut m = Match::load(config(SplitPlacement::Append), &placements).unwrap();
            m.run_to_end().unwrap();
            prop_assert!(m.state().is_terminal());
            prop_assert!(m.processes().iter().all(|p| p.ip < 256));
            prop_assert!(m.processes().iter().all(|p| m.participants().contains(&p.warrior)));
        }
    }
}
