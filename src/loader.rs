use std::collections::HashSet;

use log::info;
use rand::Rng;
use rand::rngs::SmallRng;

use crate::core::Core;
use crate::error::LoadError;
use crate::instruction::{Instruction, WarriorId};
use crate::warriors::Warrior;

/// A warrior's code and where to write it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub warrior: WarriorId,
    pub start: usize,
    pub code: Vec<Instruction>,
}

/// Write every placement into the core, stamping ownership.
///
/// Placements are written in order; where they overlap, the later one wins.
pub(crate) fn write_placements(core: &mut Core, placements: &[Placement]) -> Result<(), LoadError> {
    if placements.is_empty() {
        return Err(LoadError::NoWarriors);
    }
    let mut seen = HashSet::new();
    for p in placements {
        if !seen.insert(p.warrior) {
            return Err(LoadError::DuplicateWarrior(p.warrior));
        }
        if p.code.is_empty() {
            return Err(LoadError::EmptyCode(p.warrior));
        }
    }
    for p in placements {
        for (i, instr) in p.code.iter().enumerate() {
            let address = core.offset(p.start, i as i64);
            core.set(address, instr.with_owner(Some(p.warrior)));
        }
        info!(
            "loaded warrior {} ({} instructions) at {}",
            p.warrior,
            p.code.len(),
            p.start % core.size()
        );
    }
    Ok(())
}

/// Find each warrior's initial process address: the lowest cell it owns.
pub(crate) fn seed_processes(
    core: &Core,
    warriors: &[WarriorId],
) -> Result<Vec<(WarriorId, usize)>, LoadError> {
    warriors
        .iter()
        .map(|&w| {
            core.first_owned_by(w)
                .map(|ip| (w, ip))
                .ok_or(LoadError::Unseeded(w))
        })
        .collect()
}

/// Spread warriors evenly around the core with random jitter.
///
/// Warrior `i` starts near `i * size / n`, shifted by up to a fifth of the
/// spacing in either direction. Returns nothing for an empty roster or an
/// empty core.
pub fn spread_placements(warriors: &[Warrior], core_size: usize, rng: &mut SmallRng) -> Vec<Placement> {
    if warriors.is_empty() || core_size == 0 {
        return Vec::new();
    }
    let spacing = core_size / warriors.len();
    let jitter = (spacing as f64 * 0.2) as i64;
    warriors
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let shift = if jitter > 0 { rng.gen_range(-jitter..jitter) } else { 0 };
            let start = ((i * spacing) as i64 + shift).rem_euclid(core_size as i64) as usize;
            Placement {
                warrior: w.id,
                start,
                code: w.code.clone(),
            }
        })
        .collect()
}
