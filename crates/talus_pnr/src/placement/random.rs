//! Random initial placement (`--random`, §6).
//!
//! Assigns every block to a distinct device site of its own type, drawn
//! from a seeded RNG so that `--random` runs are reproducible byte-for-byte
//! (§8 scenario 3).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use talus_arch::ids::BlockTypeId;
use talus_arch::types::Grid;
use talus_common::PnrError;

use crate::circuit::{Circuit, SiteAssignment};

/// Randomly assigns every block in `circuit` to a free site of its own
/// block type, seeded for determinism.
///
/// # Errors
/// `PnrError::PlacementInfeasible` if some block type has more blocks than
/// device slots.
pub fn place_random(circuit: &mut Circuit, grid: &Grid, seed: u64) -> Result<(), PnrError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut types: Vec<BlockTypeId> = circuit.blocks.iter().map(|b| b.block_type).collect();
    types.sort();
    types.dedup();

    for ty in types {
        let mut slots: Vec<(u32, u32, u32)> = grid
            .sites()
            .filter(|s| s.block_type == ty)
            .flat_map(|s| (0..s.capacity).map(move |sub| (s.x, s.y, sub)))
            .collect();
        slots.shuffle(&mut rng);

        let block_ids: Vec<_> = circuit.blocks.iter().filter(|b| b.block_type == ty).map(|b| b.id).collect();
        if block_ids.len() > slots.len() {
            return Err(PnrError::PlacementInfeasible(format!(
                "{} blocks of type {:?} but only {} device slots",
                block_ids.len(),
                ty,
                slots.len()
            )));
        }
        for (block, (x, y, subblock)) in block_ids.into_iter().zip(slots) {
            circuit.block_mut(block).site = Some(SiteAssignment { x, y, subblock });
            circuit.block_mut(block).continuous = (x as f64, y as f64);
        }
    }
    Ok(())
}
