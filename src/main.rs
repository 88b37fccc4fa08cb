use std::collections::BTreeMap;

use clap::Parser;
use corewar::instruction::WarriorId;
use corewar::loader::spread_placements;
use corewar::metrics::{core_entropy, ownership_census, process_census};
use corewar::scheduler::{Match, MatchConfig, MatchState, SplitPlacement};
use corewar::warriors::{self, Warrior};
use log::LevelFilter;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[command(name = "corewar", about = "Core War: warriors fighting over a shared circular memory")]
struct Cli {
    /// Random seed for warrior placement.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Comma-separated built-in warriors to load (see --list).
    #[arg(long, value_delimiter = ',', default_value = "imp,dwarf")]
    warriors: Vec<String>,

    /// Number of cells in the core.
    #[arg(long, default_value_t = corewar::core::MEMORY_SIZE)]
    core_size: usize,

    /// Cycles executed per tick.
    #[arg(long, default_value_t = 100)]
    cycles_per_tick: usize,

    /// Cycle cutoff after which the match is a draw (0 for no cutoff).
    #[arg(long, default_value_t = 80_000)]
    max_cycles: u64,

    /// Stop after this many ticks even if the match is undecided.
    #[arg(long)]
    ticks: Option<usize>,

    /// Insert split processes right after their parent instead of at the end.
    #[arg(long)]
    split_after_current: bool,

    /// Play this many matches in parallel (seeds seed..seed+rounds) and tally results.
    #[arg(long, default_value_t = 1)]
    rounds: u64,

    /// Output metrics every N ticks.
    #[arg(long, default_value_t = 1)]
    metrics_interval: usize,

    /// Run in benchmark mode: suppress CSV, print throughput stats.
    #[arg(long)]
    benchmark: bool,

    /// List the built-in warriors and exit.
    #[arg(long)]
    list: bool,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level).init() {
        eprintln!("Failed to install logger: {e}");
    }

    if cli.list {
        list_warriors();
        return;
    }

    let roster = match cli
        .warriors
        .iter()
        .map(|name| warriors::by_name(name))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(roster) => roster,
        Err(e) => {
            eprintln!("{e}. Available: {}", warriors::names().collect::<Vec<_>>().join(", "));
            std::process::exit(1);
        }
    };

    let config = MatchConfig {
        core_size: cli.core_size,
        cycles_per_tick: cli.cycles_per_tick,
        max_cycles: (cli.max_cycles > 0).then_some(cli.max_cycles),
        split_placement: if cli.split_after_current {
            SplitPlacement::AfterCurrent
        } else {
            SplitPlacement::Append
        },
    };

    if let Some(flag) = needs_cutoff(&config, cli.rounds, cli.benchmark) {
        eprintln!("{flag} needs a cycle cutoff (--max-cycles > 0)");
        std::process::exit(1);
    }

    if cli.rounds > 1 {
        run_tournament(&roster, config, cli.seed, cli.rounds);
    } else if cli.benchmark {
        run_benchmark(&roster, config, cli.seed);
    } else {
        run_match(&roster, config, cli.seed, cli.ticks, cli.metrics_interval.max(1));
    }
}

/// The flag that would run without end under `config`, if any. Single
/// matches are bounded by `--ticks`; tournaments and benchmarks are not.
fn needs_cutoff(config: &MatchConfig, rounds: u64, benchmark: bool) -> Option<&'static str> {
    if config.max_cycles.is_some() {
        None
    } else if rounds > 1 {
        Some("--rounds")
    } else if benchmark {
        Some("--benchmark")
    } else {
        None
    }
}

fn list_warriors() {
    let roster = match warriors::roster() {
        Ok(roster) => roster,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    for w in roster {
        println!("{} (id {})", w.name, w.id);
        for instr in &w.code {
            println!("    {instr}");
        }
    }
}

/// Place the roster with a seeded RNG and load a match, or exit on error.
fn load(roster: &[Warrior], config: MatchConfig, seed: u64) -> Match {
    let mut rng = SmallRng::seed_from_u64(seed);
    let placements = spread_placements(roster, config.core_size, &mut rng);
    match Match::load(config, &placements) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Cannot start match: {e}");
            std::process::exit(1);
        }
    }
}

fn name_of(roster: &[Warrior], id: WarriorId) -> &str {
    roster.iter().find(|w| w.id == id).map_or("?", |w| w.name)
}

fn describe(roster: &[Warrior], state: MatchState) -> String {
    match state {
        MatchState::Running => "undecided".to_string(),
        MatchState::Won(id) => format!("{} wins", name_of(roster, id)),
        MatchState::Drained => "no survivors".to_string(),
        MatchState::Draw => "draw".to_string(),
    }
}

fn print_row(m: &Match, tick: usize) {
    let owned = ownership_census(m.core());
    let procs = process_census(m.processes());
    let mut row = format!(
        "{tick},{},{},{:.6}",
        m.cycle(),
        m.processes().len(),
        core_entropy(m.core())
    );
    for id in m.participants() {
        row.push_str(&format!(
            ",{},{}",
            owned.get(id).copied().unwrap_or(0),
            procs.get(id).copied().unwrap_or(0)
        ));
    }
    println!("{row}");
}

fn run_match(
    roster: &[Warrior],
    config: MatchConfig,
    seed: u64,
    ticks: Option<usize>,
    metrics_interval: usize,
) {
    let mut m = load(roster, config, seed);

    let mut header = "tick,cycle,processes,hoe".to_string();
    for id in m.participants() {
        let name = name_of(roster, *id);
        header.push_str(&format!(",{name}_cells,{name}_processes"));
    }
    println!("{header}");
    print_row(&m, 0);

    let mut tick = 0;
    while !m.state().is_terminal() && ticks.is_none_or(|limit| tick < limit) {
        tick += 1;
        if let Err(e) = m.tick() {
            eprintln!("\nMatch halted: {e}");
            std::process::exit(1);
        }
        if tick % metrics_interval == 0 || m.state().is_terminal() {
            print_row(&m, tick);
        }
        if tick % 100 == 0 {
            eprint!("\rtick {tick}, cycle {}", m.cycle());
        }
    }
    eprintln!();

    let stats = m.stats();
    eprintln!("Result after {} cycles: {}", m.cycle(), describe(roster, m.state()));
    eprintln!("  Deaths:    {}", stats.deaths);
    eprintln!("  Splits:    {}", stats.splits);
    eprintln!("  Anomalies: {}", stats.anomalies);
}

fn run_benchmark(roster: &[Warrior], config: MatchConfig, seed: u64) {
    let mut m = load(roster, config, seed);

    let start = std::time::Instant::now();
    let status = match m.run_to_end() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("Match halted: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    let cycles_per_sec = status.executed as f64 / elapsed.as_secs_f64();

    eprintln!("Benchmark results:");
    eprintln!("  Warriors:          {}", roster.len());
    eprintln!("  Core size:         {}", config.core_size);
    eprintln!("  Cycles:            {}", status.executed);
    eprintln!("  Result:            {}", describe(roster, status.state));
    eprintln!("  Elapsed:           {elapsed:.2?}");
    eprintln!("  Cycles/sec:        {cycles_per_sec:.0}");
}

/// Round outcomes of a tournament. A round that hit an engine error counts
/// as halted rather than as any match result.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    wins: BTreeMap<WarriorId, u64>,
    draws: u64,
    drained: u64,
    halted: u64,
}

fn tally(roster: &[Warrior], results: impl IntoIterator<Item = Option<MatchState>>) -> Tally {
    let mut tally = Tally {
        wins: roster.iter().map(|w| (w.id, 0)).collect(),
        ..Default::default()
    };
    for result in results {
        match result {
            Some(MatchState::Won(id)) => *tally.wins.entry(id).or_insert(0) += 1,
            Some(MatchState::Draw | MatchState::Running) => tally.draws += 1,
            Some(MatchState::Drained) => tally.drained += 1,
            None => tally.halted += 1,
        }
    }
    tally
}

fn run_tournament(roster: &[Warrior], config: MatchConfig, seed: u64, rounds: u64) {
    let results: Vec<Option<MatchState>> = (seed..seed + rounds)
        .into_par_iter()
        .map(|s| {
            let mut m = load(roster, config, s);
            match m.run_to_end() {
                Ok(status) => Some(status.state),
                Err(e) => {
                    log::error!("round with seed {s} halted: {e}");
                    None
                }
            }
        })
        .collect();

    let tally = tally(roster, results);
    println!("warrior,wins");
    for (id, count) in &tally.wins {
        println!("{},{count}", name_of(roster, *id));
    }
    eprintln!(
        "{rounds} rounds: {} draws, {} with no survivors, {} halted",
        tally.draws, tally.drained, tally.halted
    );
}
