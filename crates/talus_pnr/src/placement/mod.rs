//! Placement pipeline (§4): random seeding, B2B analytical placement,
//! area-based legalization, and an optional simulated-annealing polish,
//! run in the sequence named by the project's `--placer` specs.

pub mod analytical;
pub mod anneal;
pub mod legalizer;
pub mod random;

use std::collections::BTreeMap;

use talus_arch::ArchitectureContext;
use talus_common::PnrError;
use talus_config::PlacerSpec;

use crate::circuit::Circuit;
use anneal::NetCriticality;

/// Runs the configured placer sequence against `circuit`, mutating its
/// block sites in place.
///
/// Each [`PlacerSpec`] names one of `"random"`, `"analytical"`, or `"SA"`
/// (case-insensitive), with inline `opt=value` overrides layered on top of
/// the crate-wide defaults in `config`. An empty sequence defaults to
/// `random` followed by `analytical` (§6), since a legal placement is a
/// precondition for everything downstream.
pub fn run_placer_sequence(
    circuit: &mut Circuit,
    arch: &ArchitectureContext,
    device_size: u32,
    specs: &[PlacerSpec],
    config: &talus_config::PnrConfig,
    seed: u64,
) -> Result<(), PnrError> {
    let grid = arch.build_grid(device_size)?;

    let default_sequence = [
        PlacerSpec { name: "random".to_string(), options: Default::default() },
        PlacerSpec { name: "analytical".to_string(), options: Default::default() },
    ];
    let specs: &[PlacerSpec] = if specs.is_empty() { &default_sequence } else { specs };

    for spec in specs {
        match spec.name.to_ascii_lowercase().as_str() {
            "random" => {
                let run_seed = parse_option(&spec.options, "seed").unwrap_or(seed as f64) as u64;
                random::place_random(circuit, &grid, run_seed)?;
            }
            "analytical" => {
                let mut analytical_config = config.analytical.clone();
                apply_analytical_overrides(&mut analytical_config, &spec.options);
                analytical::place_analytical(circuit, arch, &grid, &analytical_config)?;
            }
            "sa" => {
                let mut sa_config = config.sa.clone();
                apply_sa_overrides(&mut sa_config, &spec.options);
                let run_seed = parse_option(&spec.options, "seed").unwrap_or(seed as f64) as u64;
                anneal::simulated_anneal(circuit, &grid, &NetCriticality::new(), &sa_config, run_seed);
            }
            other => {
                return Err(PnrError::InputFormat {
                    path: std::path::PathBuf::from("--placer"),
                    message: format!("unknown placer \"{other}\""),
                });
            }
        }
    }

    if !circuit.is_fully_placed() {
        return Err(PnrError::PlacementInfeasible(
            "placer sequence finished without placing every block".to_string(),
        ));
    }
    Ok(())
}

fn parse_option(options: &BTreeMap<String, String>, key: &str) -> Option<f64> {
    options.get(key).and_then(|v| v.parse().ok())
}

fn apply_analytical_overrides(config: &mut talus_config::AnalyticalConfig, options: &BTreeMap<String, String>) {
    if let Some(v) = options.get("epsilon").and_then(|v| v.parse().ok()) {
        config.epsilon = v;
    }
    if let Some(v) = options.get("max_cg_iterations").and_then(|v| v.parse().ok()) {
        config.max_cg_iterations = v;
    }
    if let Some(v) = options.get("max_outer_iterations").and_then(|v| v.parse().ok()) {
        config.max_outer_iterations = v;
    }
    if let Some(v) = options.get("convergence_gap").and_then(|v| v.parse().ok()) {
        config.convergence_gap = v;
    }
}

fn apply_sa_overrides(config: &mut talus_config::SaConfig, options: &BTreeMap<String, String>) {
    if let Some(v) = options.get("lambda").and_then(|v| v.parse().ok()) {
        config.lambda = v;
    }
    if let Some(v) = options.get("cooling_rate").and_then(|v| v.parse().ok()) {
        config.cooling_rate = v;
    }
    if let Some(v) = options.get("target_accept_rate").and_then(|v| v.parse().ok()) {
        config.target_accept_rate = v;
    }
    if let Some(v) = options.get("moves_per_temp_multiplier").and_then(|v| v.parse().ok()) {
        config.moves_per_temp_multiplier = v;
    }
}
