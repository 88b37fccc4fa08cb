use std::collections::BTreeMap;

use crate::core::Core;
use crate::instruction::{Opcode, WarriorId};
use crate::interpreter::Process;

/// Compute the high-order entropy (HOE) of a byte slice.
///
/// HOE = compressed_size / raw_size, where compression uses brotli at quality 2.
/// Applied to [`Core::to_bytes`], it tracks how much structure the warriors
/// have stamped onto the core: an empty core compresses to almost nothing,
/// a core full of varied bombs and copies much less so.
pub fn high_order_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut compressed = Vec::new();
    let params = brotli::enc::BrotliEncoderParams {
        quality: 2,
        ..Default::default()
    };
    brotli::BrotliCompress(&mut &data[..], &mut compressed, &params)
        .expect("brotli compression should not fail on valid input");

    compressed.len() as f64 / data.len() as f64
}

/// HOE of the whole core.
pub fn core_entropy(core: &Core) -> f64 {
    high_order_entropy(&core.to_bytes())
}

/// Number of cells owned by each warrior. Unowned cells are not counted.
pub fn ownership_census(core: &Core) -> BTreeMap<WarriorId, usize> {
    let mut census = BTreeMap::new();
    for owner in core.cells().iter().filter_map(|cell| cell.and_then(|i| i.owner)) {
        *census.entry(owner).or_insert(0) += 1;
    }
    census
}

/// Number of live processes of each warrior.
pub fn process_census(processes: &[Process]) -> BTreeMap<WarriorId, usize> {
    let mut census = BTreeMap::new();
    for p in processes {
        *census.entry(p.warrior).or_insert(0) += 1;
    }
    census
}

/// Histogram of opcodes across occupied cells, indexed like [`Opcode::ALL`].
pub fn opcode_histogram(core: &Core) -> [usize; Opcode::ALL.len()] {
    let mut hist = [0usize; Opcode::ALL.len()];
    for instr in core.cells().iter().flatten() {
        hist[instr.opcode as usize] += 1;
    }
    hist
}
