//! The `talus-pnr` driver: resolves configuration, reads a starting-stage
//! input file, runs placement and/or routing, and writes a place file.
//!
//! Mirrors the teacher's `lint`/`sim` command modules: a `run(args, global)`
//! entry point returning a process exit code, with each pipeline step
//! commented in order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use talus_arch::ArchitectureContext;
use talus_config::{ConfigError, PlacerSpec, PnrConfig};
use talus_pnr::circuit::Circuit;

use crate::{Cli, GlobalArgs};

/// Runs the full `talus-pnr` pipeline described by `args`.
///
/// Returns the process exit code: 0 on success (including a non-fatal
/// routing-convergence warning), 1 is never returned here — fatal errors
/// propagate as `Err` for `main` to report and exit 1 on, per §7's policy.
pub fn run(args: &Cli, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    // Step 1: load config file (if given) over built-in defaults.
    let config = load_config(global)?;

    // Step 2: resolve the architecture and build its context.
    let arch_ref = args
        .architecture
        .clone()
        .or_else(|| config.architecture.clone())
        .ok_or("no --architecture given and none set in the config file")?;
    let arch_path = resolve_architecture_path(&arch_ref)?;
    let arch = talus_arch::load_architecture_json(&arch_path)?;

    // Step 3: build a circuit from the starting-stage input, and note
    // whether placement still needs to run.
    let (mut circuit, needs_placement) = read_starting_stage(args, &arch)?;

    // Step 4: assemble the placer sequence (CLI --placer flags, if any,
    // replace the config file's sequence entirely) and run it.
    let mut config = config;
    let mut placers = parse_placer_specs(&args.placers)?;
    if args.random {
        placers.insert(0, PlacerSpec { name: "random".to_string(), options: BTreeMap::from([("seed".to_string(), "1".to_string())]) });
    }
    if !placers.is_empty() {
        config.placers = placers;
    }

    let device_size = talus_pnr::autosize_device(&circuit, &arch)?;
    if !global.quiet {
        eprintln!("   Device size: {device_size} x {device_size}");
    }

    if needs_placement {
        talus_pnr::placement::run_placer_sequence(&mut circuit, &arch, device_size, &config.placers, &config, 1)?;
        if global.verbose {
            eprintln!("   Placement cost: {:.3}", talus_pnr::cost::total_cost(&circuit));
        }
    }

    // Step 5: route. A routing-not-converged failure is non-fatal (§7):
    // the last routing attempt is still applied to `circuit` and still
    // gets written out, just with a congestion warning instead of an error.
    let mut converged = true;
    if let Err(e) = talus_pnr::routing::route(&mut circuit, &arch, device_size, &config.router) {
        match e {
            talus_common::PnrError::RoutingNotConverged { max_trials, overused_nodes } => {
                converged = false;
                if !global.quiet {
                    eprintln!("warning: routing did not converge after {max_trials} trials ({overused_nodes} nodes still overused)");
                }
            }
            other => return Err(Box::new(other)),
        }
    }

    // Step 6: write the place file.
    let place_text = talus_pnr::io::write_place_file(&circuit, device_size);
    std::fs::write(&args.output, place_text)?;

    if !global.quiet {
        eprintln!(
            "   Result: {} block(s), {} net(s), {}",
            circuit.blocks.len(),
            circuit.nets.len(),
            if converged { "routing converged" } else { "routing congested" }
        );
    }

    Ok(0)
}

fn load_config(global: &GlobalArgs) -> Result<PnrConfig, ConfigError> {
    match &global.config {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
            talus_config::load_config_from_str(&content)
        }
        None => Ok(PnrConfig::default()),
    }
}

/// Resolves `--architecture <name>` to a JSON file path: a literal path if
/// `name` exists as a file, otherwise `architectures/<name>.json` relative
/// to the current directory (the preset convention named but left
/// unspecified by §6/§AMBIENT).
fn resolve_architecture_path(name: &str) -> Result<PathBuf, ConfigError> {
    let literal = PathBuf::from(name);
    if literal.is_file() {
        return Ok(literal);
    }
    let preset = PathBuf::from("architectures").join(format!("{name}.json"));
    if preset.is_file() {
        return Ok(preset);
    }
    Err(ConfigError::UnknownTarget(name.to_string()))
}

/// Builds a [`Circuit`] from whichever starting-stage flag was given, and
/// reports whether placement still needs to run.
///
/// `--place <path>` loads a serde-serialized [`Circuit`] snapshot that
/// already carries site assignments (the documented place-file text format
/// in §4.9 only records geometry, not netlist structure, so a stage that
/// skips straight to routing needs a format that carries both).
fn read_starting_stage(args: &Cli, arch: &ArchitectureContext) -> Result<(Circuit, bool), Box<dyn std::error::Error>> {
    if let Some(path) = &args.blif {
        return Err(Box::new(talus_pnr::io::reject_blif(path)));
    }
    if let Some(path) = &args.net {
        let text = std::fs::read_to_string(path)?;
        let circuit = talus_pnr::io::parse_net_file(path, &text, arch)?;
        return Ok((circuit, true));
    }
    if let Some(path) = &args.place {
        let text = std::fs::read_to_string(path)?;
        let mut circuit: Circuit = serde_json::from_str(&text)?;
        circuit.rebuild_indices();
        if !circuit.is_fully_placed() {
            return Err(format!("{}: circuit snapshot is missing site assignments", path.display()).into());
        }
        return Ok((circuit, false));
    }
    unreachable!("clap's \"stage\" ArgGroup requires exactly one of --blif/--net/--place")
}

/// Parses `--placer` CLI values of the form `name` or `name,opt=value,...`.
fn parse_placer_specs(raw: &[String]) -> Result<Vec<PlacerSpec>, Box<dyn std::error::Error>> {
    raw.iter()
        .map(|spec| {
            let mut parts = spec.split(',');
            let name = parts.next().unwrap_or_default().to_string();
            if name.is_empty() {
                return Err(format!("empty --placer value \"{spec}\"").into());
            }
            let mut options = BTreeMap::new();
            for part in parts {
                let (k, v) = part
                    .split_once('=')
                    .ok_or_else(|| format!("malformed --placer option \"{part}\" (expected opt=value)"))?;
                options.insert(k.to_string(), v.to_string());
            }
            Ok(PlacerSpec { name, options })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_placer_name() {
        let specs = parse_placer_specs(&["analytical".to_string()]).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "analytical");
        assert!(specs[0].options.is_empty());
    }

    #[test]
    fn parses_placer_with_options() {
        let specs = parse_placer_specs(&["sa,lambda=0.3,cooling_rate=0.9".to_string()]).unwrap();
        assert_eq!(specs[0].name, "sa");
        assert_eq!(specs[0].options.get("lambda").map(String::as_str), Some("0.3"));
        assert_eq!(specs[0].options.get("cooling_rate").map(String::as_str), Some("0.9"));
    }

    #[test]
    fn rejects_malformed_option() {
        let err = parse_placer_specs(&["sa,lambda".to_string()]);
        assert!(err.is_err());
    }

    #[test]
    fn resolve_architecture_path_rejects_unknown_preset() {
        let err = resolve_architecture_path("definitely-not-a-real-preset-name").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTarget(_)));
    }

    #[test]
    fn resolve_architecture_path_accepts_literal_file() {
        let tmp = std::env::temp_dir().join(format!("talus_arch_test_{}.json", std::process::id()));
        std::fs::write(&tmp, "{}").unwrap();
        let resolved = resolve_architecture_path(tmp.to_str().unwrap()).unwrap();
        assert_eq!(resolved, tmp);
        let _ = std::fs::remove_file(&tmp);
    }
}
