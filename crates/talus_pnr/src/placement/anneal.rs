//! Simulated-annealing placement refiner (§4.5): optional polish of an
//! already-legal placement via windowed block swaps, accepted by the
//! Metropolis criterion with a VPR-style cooling schedule.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use talus_arch::types::Grid;
use talus_config::SaConfig;

use crate::circuit::{Circuit, SiteAssignment};
use crate::cost;
use crate::ids::{GlobalBlockId, NetId};

type Occupant = HashMap<(u32, u32, u32), GlobalBlockId>;

fn build_occupancy(circuit: &Circuit) -> Occupant {
    let mut occ = Occupant::new();
    for b in &circuit.blocks {
        if let Some(s) = b.site {
            occ.insert((s.x, s.y, s.subblock), b.id);
        }
    }
    occ
}

/// Per-net criticality, used as a placement-time timing-cost surrogate:
/// the wire delay before routing is itself a placement estimate (§4.1), so
/// `net_cost * criticality` stands in for the timing term without needing
/// a full static-timing recompute on every trial move.
pub type NetCriticality = HashMap<NetId, f64>;

fn touched_nets(circuit: &Circuit, blocks: &[GlobalBlockId]) -> Vec<NetId> {
    let mut nets = Vec::new();
    for &b in blocks {
        for n in cost::nets_touching(circuit, b) {
            if !nets.contains(&n) {
                nets.push(n);
            }
        }
    }
    nets
}

fn blended_cost(
    circuit: &Circuit,
    nets: &[NetId],
    criticality: &NetCriticality,
    lambda: f64,
    bb_norm: f64,
    timing_norm: f64,
) -> (f64, f64) {
    let mut bb = 0.0;
    let mut timing = 0.0;
    for &n in nets {
        let nc = cost::net_cost(circuit, n);
        bb += nc;
        timing += nc * criticality.get(&n).copied().unwrap_or(0.0);
    }
    let blended = (1.0 - lambda) * bb / bb_norm.max(1e-9) + lambda * timing / timing_norm.max(1e-9);
    (blended, bb)
}

/// Refines `circuit`'s placement in place using simulated annealing.
///
/// `criticality` may be empty (pure wire-length optimization, `lambda`
/// effectively masked out since the timing term is zero either way).
pub fn simulated_anneal(circuit: &mut Circuit, grid: &Grid, criticality: &NetCriticality, config: &SaConfig, seed: u64) {
    let movable: Vec<GlobalBlockId> = circuit.blocks.iter().map(|b| b.id).collect();
    if movable.len() < 2 {
        return;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut occ = build_occupancy(circuit);

    let bb_norm = cost::total_cost(circuit).max(1.0);
    let timing_norm = circuit
        .nets
        .iter()
        .map(|n| cost::net_cost(circuit, n.id) * criticality.get(&n.id).copied().unwrap_or(0.0))
        .sum::<f64>()
        .max(1.0);

    let max_dim = grid.width.max(grid.height) as f64;
    let mut distance = max_dim;

    // Estimate initial temperature from the standard deviation of trial-move
    // cost deltas, without committing any of the trial moves.
    let mut deltas = Vec::new();
    for _ in 0..(20 * movable.len()).min(2000) {
        if let Some(delta) = trial_delta(circuit, grid, &mut occ, &mut rng, distance, criticality, config.lambda, bb_norm, timing_norm) {
            deltas.push(delta);
        }
    }
    let mean = deltas.iter().sum::<f64>() / deltas.len().max(1) as f64;
    let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / deltas.len().max(1) as f64;
    let mut temperature = (20.0 * variance.sqrt()).max(1e-6);

    let moves_per_temp = ((config.moves_per_temp_multiplier * movable.len() as f64) as usize).max(1);
    let stop_threshold = 0.005 * cost::total_cost(circuit) / circuit.nets.len().max(1) as f64;

    loop {
        let mut accepted = 0usize;
        for _ in 0..moves_per_temp {
            if try_move(circuit, grid, &mut occ, &mut rng, distance, criticality, config.lambda, bb_norm, timing_norm, temperature) {
                accepted += 1;
            }
        }
        let accept_rate = accepted as f64 / moves_per_temp as f64;

        temperature *= cooling_alpha(accept_rate, config.cooling_rate);
        distance = (distance * (1.0 - config.target_accept_rate + accept_rate)).clamp(1.0, max_dim);

        if temperature < stop_threshold {
            break;
        }
    }
}

fn cooling_alpha(accept_rate: f64, floor: f64) -> f64 {
    if accept_rate > 0.96 {
        0.5
    } else if accept_rate > 0.8 {
        0.9
    } else if accept_rate > 0.15 {
        0.95
    } else {
        floor
    }
}

/// Picks a random movable block and a random same-type site within a
/// Chebyshev-radius window, swapping occupants if the window target is
/// occupied by a block of the same type.
fn propose_move(
    circuit: &Circuit,
    grid: &Grid,
    occ: &Occupant,
    rng: &mut StdRng,
    distance: f64,
) -> Option<(GlobalBlockId, (u32, u32, u32), Option<GlobalBlockId>)> {
    if circuit.blocks.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..circuit.blocks.len());
    let block = &circuit.blocks[idx];
    let site = block.site?;
    let ty = block.block_type;

    let radius = distance.round().max(1.0) as i64;
    let candidates: Vec<(u32, u32, u32)> = grid
        .sites()
        .filter(|s| {
            s.block_type == ty
                && (s.x as i64 - site.x as i64).abs() <= radius
                && (s.y as i64 - site.y as i64).abs() <= radius
        })
        .flat_map(|s| (0..s.capacity).map(move |sub| (s.x, s.y, sub)))
        .filter(|&t| t != (site.x, site.y, site.subblock))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let target = candidates[rng.gen_range(0..candidates.len())];
    let occupant = occ.get(&target).copied();
    if let Some(other) = occupant {
        if circuit.block(other).block_type != ty {
            return None;
        }
    }
    Some((block.id, target, occupant))
}

#[allow(clippy::too_many_arguments)]
fn trial_delta(
    circuit: &mut Circuit,
    grid: &Grid,
    occ: &mut Occupant,
    rng: &mut StdRng,
    distance: f64,
    criticality: &NetCriticality,
    lambda: f64,
    bb_norm: f64,
    timing_norm: f64,
) -> Option<f64> {
    let (block, target, occupant) = propose_move(circuit, grid, occ, rng, distance)?;
    let old_site = circuit.block(block).site.unwrap();
    let touched = touched_nets(circuit, &[block, occupant.unwrap_or(block)]);
    let (before, _) = blended_cost(circuit, &touched, criticality, lambda, bb_norm, timing_norm);

    apply_swap(circuit, occ, block, target, occupant, old_site);
    let (after, _) = blended_cost(circuit, &touched, criticality, lambda, bb_norm, timing_norm);
    apply_swap(circuit, occ, block, old_site_key(old_site), occupant, SiteAssignment { x: target.0, y: target.1, subblock: target.2 });

    Some(after - before)
}

fn old_site_key(s: SiteAssignment) -> (u32, u32, u32) {
    (s.x, s.y, s.subblock)
}

fn apply_swap(
    circuit: &mut Circuit,
    occ: &mut Occupant,
    block: GlobalBlockId,
    target: (u32, u32, u32),
    occupant: Option<GlobalBlockId>,
    source_site: SiteAssignment,
) {
    circuit.block_mut(block).site = Some(SiteAssignment { x: target.0, y: target.1, subblock: target.2 });
    circuit.block_mut(block).continuous = (target.0 as f64, target.1 as f64);
    occ.insert(target, block);
    if let Some(other) = occupant {
        circuit.block_mut(other).site = Some(source_site);
        circuit.block_mut(other).continuous = (source_site.x as f64, source_site.y as f64);
        occ.insert((source_site.x, source_site.y, source_site.subblock), other);
    } else {
        occ.remove(&(source_site.x, source_site.y, source_site.subblock));
    }
}

#[allow(clippy::too_many_arguments)]
fn try_move(
    circuit: &mut Circuit,
    grid: &Grid,
    occ: &mut Occupant,
    rng: &mut StdRng,
    distance: f64,
    criticality: &NetCriticality,
    lambda: f64,
    bb_norm: f64,
    timing_norm: f64,
    temperature: f64,
) -> bool {
    let Some((block, target, occupant)) = propose_move(circuit, grid, occ, rng, distance) else {
        return false;
    };
    let old_site = circuit.block(block).site.unwrap();
    let touched = touched_nets(circuit, &[block, occupant.unwrap_or(block)]);
    let (before, _) = blended_cost(circuit, &touched, criticality, lambda, bb_norm, timing_norm);

    apply_swap(circuit, occ, block, target, occupant, old_site);
    let (after, _) = blended_cost(circuit, &touched, criticality, lambda, bb_norm, timing_norm);
    let delta = after - before;

    if delta < 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
        true
    } else {
        apply_swap(circuit, occ, block, old_site_key(old_site), occupant, SiteAssignment { x: target.0, y: target.1, subblock: target.2 });
        false
    }
}
