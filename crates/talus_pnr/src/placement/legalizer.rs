//! Area-based recursive-bipartition legalizer (§4.4).
//!
//! Legalizes one block type at a time: given continuous `(x, y)` coordinates
//! for every movable block of that type and the list of device sites (slots)
//! of that type, assigns each block to exactly one slot by recursively
//! bisecting the slot set along its longer axis and partitioning blocks to
//! match, by rank, along the same axis (median-cut).

use talus_arch::ids::BlockTypeId;
use talus_arch::types::Grid;
use talus_common::PnrError;

use crate::circuit::{Circuit, SiteAssignment};
use crate::ids::GlobalBlockId;

/// One assignable slot: a site plus a sub-slot index (IO capacity > 1).
#[derive(Debug, Clone, Copy)]
struct Slot {
    x: u32,
    y: u32,
    subblock: u32,
}

/// Legalizes every movable block of `block_type`, snapping each one's
/// continuous coordinates onto a distinct device slot.
///
/// # Errors
/// `PnrError::PlacementInfeasible` if there are more blocks of this type
/// than slots of this type on the device.
pub fn legalize_block_type(circuit: &mut Circuit, grid: &Grid, block_type: BlockTypeId) -> Result<(), PnrError> {
    let slots: Vec<Slot> = grid
        .sites()
        .filter(|s| s.block_type == block_type)
        .flat_map(|s| (0..s.capacity).map(move |sub| Slot { x: s.x, y: s.y, subblock: sub }))
        .collect();

    let blocks: Vec<GlobalBlockId> = circuit
        .blocks
        .iter()
        .filter(|b| !b.is_io && b.block_type == block_type)
        .map(|b| b.id)
        .collect();

    if blocks.is_empty() {
        return Ok(());
    }
    if blocks.len() > slots.len() {
        return Err(PnrError::PlacementInfeasible(format!(
            "{} blocks of type {:?} but only {} device slots",
            blocks.len(),
            block_type,
            slots.len()
        )));
    }

    let assignment = bipartition(circuit, &blocks, slots);
    for (block, slot) in assignment {
        circuit.block_mut(block).site = Some(SiteAssignment { x: slot.x, y: slot.y, subblock: slot.subblock });
    }
    Ok(())
}

/// Legalizes IO blocks specifically: IO sites carry `ioCapacity` sub-slots
/// per site (§3), already expanded into one [`Slot`] per sub-slot above, so
/// this reuses [`legalize_block_type`] directly — kept as a distinct
/// entrypoint name since IO legalization is invariant-checked separately
/// (§4.4: "IO blocks are placed only on IO sites respecting `ioCapacity`").
pub fn legalize_io(circuit: &mut Circuit, grid: &Grid, io_type: BlockTypeId) -> Result<(), PnrError> {
    let slots: Vec<Slot> = grid
        .sites()
        .filter(|s| s.block_type == io_type)
        .flat_map(|s| (0..s.capacity).map(move |sub| Slot { x: s.x, y: s.y, subblock: sub }))
        .collect();

    let blocks: Vec<GlobalBlockId> = circuit.blocks.iter().filter(|b| b.is_io).map(|b| b.id).collect();

    if blocks.is_empty() {
        return Ok(());
    }
    if blocks.len() > slots.len() {
        return Err(PnrError::PlacementInfeasible(format!(
            "{} IO blocks but only {} IO slots",
            blocks.len(),
            slots.len()
        )));
    }

    let assignment = bipartition(circuit, &blocks, slots);
    for (block, slot) in assignment {
        circuit.block_mut(block).site = Some(SiteAssignment { x: slot.x, y: slot.y, subblock: slot.subblock });
    }
    Ok(())
}

/// Recursively bipartitions `slots` and `blocks` together, returning the
/// final one-to-one assignment.
fn bipartition(circuit: &Circuit, blocks: &[GlobalBlockId], mut slots: Vec<Slot>) -> Vec<(GlobalBlockId, Slot)> {
    let mut blocks: Vec<GlobalBlockId> = blocks.to_vec();

    if blocks.is_empty() {
        return vec![];
    }
    if slots.len() == 1 {
        debug_assert_eq!(blocks.len(), 1);
        return vec![(blocks[0], slots[0])];
    }

    let xspan = slots.iter().map(|s| s.x).max().unwrap_or(0) as i64 - slots.iter().map(|s| s.x).min().unwrap_or(0) as i64;
    let yspan = slots.iter().map(|s| s.y).max().unwrap_or(0) as i64 - slots.iter().map(|s| s.y).min().unwrap_or(0) as i64;
    let split_on_x = xspan >= yspan;

    if split_on_x {
        slots.sort_by_key(|s| (s.x, s.y, s.subblock));
        blocks.sort_by(|&a, &b| continuous_x(circuit, a).total_cmp(&continuous_x(circuit, b)));
    } else {
        slots.sort_by_key(|s| (s.y, s.x, s.subblock));
        blocks.sort_by(|&a, &b| continuous_y(circuit, a).total_cmp(&continuous_y(circuit, b)));
    }

    let mid = slots.len().div_ceil(2);
    let (lower_slots, upper_slots) = slots.split_at(mid);
    let (lower_blocks, upper_blocks) = blocks.split_at(mid.min(blocks.len()));

    let mut result = bipartition(circuit, lower_blocks, lower_slots.to_vec());
    result.extend(bipartition(circuit, upper_blocks, upper_slots.to_vec()));
    result
}

fn continuous_x(circuit: &Circuit, block: GlobalBlockId) -> f64 {
    circuit.block(block).continuous.0
}

fn continuous_y(circuit: &Circuit, block: GlobalBlockId) -> f64 {
    circuit.block(block).continuous.1
}
