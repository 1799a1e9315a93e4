//! Placement and routing engine for the Talus FPGA toolchain.
//!
//! Consumes a [`circuit::Circuit`] (built from a `.net` netlist) and an
//! [`talus_arch::ArchitectureContext`], runs the configured placer sequence
//! (§4), then negotiated-congestion routing (§4.7), reporting progress and
//! final metrics the way the driving CLI expects.

#![warn(missing_docs)]

pub mod circuit;
pub mod cost;
pub mod ids;
pub mod io;
pub mod placement;
pub mod routing;
pub mod timing_bridge;

use std::collections::HashMap;

use talus_arch::ArchitectureContext;
use talus_common::PnrError;
use talus_config::PnrConfig;

pub use circuit::Circuit;

/// Finds the smallest square device size `n` such that every block type's
/// capacity at that size meets its occupancy in `circuit` (§3). Bounded
/// rather than unbounded: gives up past `max_n` with `PlacementInfeasible`
/// instead of looping forever on a circuit no device could ever fit.
///
/// `n` never drops below 2: a 1x1 grid is a single perimeter IO site with no
/// interior at all, too degenerate to be a device; an empty circuit sizes to
/// the smallest real one.
pub fn autosize_device(circuit: &Circuit, arch: &ArchitectureContext) -> Result<u32, PnrError> {
    const MIN_N: u32 = 2;
    const MAX_N: u32 = 4096;

    let mut occupancy: HashMap<talus_arch::ids::BlockTypeId, u32> = HashMap::new();
    for block in &circuit.blocks {
        *occupancy.entry(block.block_type).or_insert(0) += 1;
    }

    let mut n = MIN_N;
    loop {
        let fits = occupancy
            .iter()
            .map(|(&ty, &count)| arch.capacity_for_type(n, ty).map(|cap| cap >= count))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .all(|ok| ok);
        if fits {
            return Ok(n);
        }
        if n >= MAX_N {
            return Err(PnrError::PlacementInfeasible(format!(
                "no device up to {MAX_N} x {MAX_N} has enough capacity for this circuit"
            )));
        }
        n += 1;
    }
}

/// Runs the full placement-and-routing flow against an already-built
/// circuit: resolves the device size (auto-sizing if `device_size` is
/// `None`), runs the configured placer sequence, then negotiated-congestion
/// routing. Returns the device size actually used.
///
/// # Errors
/// Propagates `PnrError` from device sizing, placement, or routing.
/// `PnrError::RoutingNotConverged` still leaves `circuit` in a usable
/// (merely congested) routed state.
pub fn run_flow(
    circuit: &mut Circuit,
    arch: &ArchitectureContext,
    device_size: Option<u32>,
    config: &PnrConfig,
    seed: u64,
) -> Result<u32, PnrError> {
    let device_size = match device_size {
        Some(n) => n,
        None => autosize_device(circuit, arch)?,
    };

    placement::run_placer_sequence(circuit, arch, device_size, &config.placers, config, seed)?;
    routing::route(circuit, arch, device_size, &config.router)?;

    Ok(device_size)
}
