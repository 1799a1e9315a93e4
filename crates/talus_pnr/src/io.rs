//! BLIF/net/place file I/O (§4.9, §6): minimal, real, but not
//! conformance-complete. A genuine gate-level BLIF netlist is out of scope
//! and rejected with [`PnrError::UnsupportedFormat`] directing the user to
//! pre-pack to the documented `.net` subset.
//!
//! The `.net` subset recognized:
//! ```text
//! .input  <name>                          # IO pad driving net <name>
//! .output <name>                          # IO pad sinking net <name>
//! .clb    <name> <port>=<signal> ...      # a CLB instance; "open" = unconnected
//! ```
//! Blank lines and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use talus_arch::ArchitectureContext;
use talus_common::PnrError;

use crate::circuit::{BlockPin, Circuit, GlobalBlock, SiteAssignment};
use crate::ids::GlobalBlockId;

struct PendingNet {
    driver: Option<(GlobalBlockId, usize)>,
    sinks: Vec<(GlobalBlockId, usize)>,
}

/// Parses the `.net` subset into a [`Circuit`], resolving port assignments
/// against `arch`'s CLB and IO block types.
///
/// # Errors
/// `PnrError::InputFormat` on malformed lines, an unknown port name, or a
/// net with more than one driver.
pub fn parse_net_file(path: &Path, text: &str, arch: &ArchitectureContext) -> Result<Circuit, PnrError> {
    let (io_id, io_type) = arch.io_block_type()?;
    let (clb_id, clb_type) = arch.clb_block_type()?;
    let io_in_port = io_type.input_ports.first().map(|(n, _)| n.clone());
    let io_out_port = io_type.output_ports.first().map(|(n, _)| n.clone());

    let mut circuit = Circuit::new();
    let mut nets: HashMap<String, PendingNet> = HashMap::new();

    let fmt_err = |line_no: usize, message: String| PnrError::InputFormat {
        path: path.to_path_buf(),
        message: format!("line {line_no}: {message}"),
    };

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let directive = tokens.next().unwrap();
        match directive {
            ".input" => {
                let name = tokens.next().ok_or_else(|| fmt_err(line_no, ".input missing a name".to_string()))?;
                let Some(port) = &io_out_port else {
                    return Err(fmt_err(line_no, "IO block type declares no output port".to_string()));
                };
                let block = circuit.add_block(GlobalBlock {
                    id: GlobalBlockId::from_raw(0),
                    name: name.to_string(),
                    block_type: io_id,
                    is_io: true,
                    inputs: vec![],
                    outputs: vec![BlockPin { port: port.clone(), bit: 0, net: None }],
                    site: None,
                    continuous: (0.0, 0.0),
                });
                bind_driver(&mut nets, name, block, 0, line_no, path)?;
            }
            ".output" => {
                let name = tokens.next().ok_or_else(|| fmt_err(line_no, ".output missing a name".to_string()))?;
                let Some(port) = &io_in_port else {
                    return Err(fmt_err(line_no, "IO block type declares no input port".to_string()));
                };
                let block = circuit.add_block(GlobalBlock {
                    id: GlobalBlockId::from_raw(0),
                    name: name.to_string(),
                    block_type: io_id,
                    is_io: true,
                    inputs: vec![BlockPin { port: port.clone(), bit: 0, net: None }],
                    outputs: vec![],
                    site: None,
                    continuous: (0.0, 0.0),
                });
                nets.entry(name.to_string()).or_insert_with(|| PendingNet { driver: None, sinks: vec![] }).sinks.push((block, 0));
            }
            ".clb" => {
                let name = tokens.next().ok_or_else(|| fmt_err(line_no, ".clb missing a name".to_string()))?;
                let mut inputs = Vec::new();
                let mut outputs = Vec::new();
                let mut assignments = Vec::new();
                for tok in tokens {
                    let (port, signal) = tok
                        .split_once('=')
                        .ok_or_else(|| fmt_err(line_no, format!("malformed pin assignment \"{tok}\"")))?;
                    if clb_type.input_ports.iter().any(|(n, _)| n == port) {
                        inputs.push(BlockPin { port: port.to_string(), bit: 0, net: None });
                        assignments.push((true, inputs.len() - 1, signal.to_string()));
                    } else if clb_type.output_ports.iter().any(|(n, _)| n == port) {
                        outputs.push(BlockPin { port: port.to_string(), bit: 0, net: None });
                        assignments.push((false, outputs.len() - 1, signal.to_string()));
                    } else {
                        return Err(fmt_err(line_no, format!("unknown CLB port \"{port}\"")));
                    }
                }
                let block = circuit.add_block(GlobalBlock {
                    id: GlobalBlockId::from_raw(0),
                    name: name.to_string(),
                    block_type: clb_id,
                    is_io: false,
                    inputs,
                    outputs,
                    site: None,
                    continuous: (0.0, 0.0),
                });
                for (is_input, idx, signal) in assignments {
                    if signal == "open" {
                        continue;
                    }
                    if is_input {
                        nets.entry(signal).or_insert_with(|| PendingNet { driver: None, sinks: vec![] }).sinks.push((block, idx));
                    } else {
                        bind_driver(&mut nets, &signal, block, idx, line_no, path)?;
                    }
                }
            }
            other => return Err(fmt_err(line_no, format!("unrecognized directive \"{other}\""))),
        }
    }

    let mut names: Vec<&String> = nets.keys().collect();
    names.sort();
    for name in names {
        let pending = &nets[name];
        let Some((driver, driver_pin)) = pending.driver else {
            return Err(PnrError::InputFormat {
                path: path.to_path_buf(),
                message: format!("net \"{name}\" has sinks but no driver"),
            });
        };
        let net_id = circuit.add_net(name.clone(), driver, pending.sinks.iter().map(|(b, _)| *b).collect());
        circuit.block_mut(driver).outputs[driver_pin].net = Some(net_id);
        for &(sink, pin) in &pending.sinks {
            circuit.block_mut(sink).inputs[pin].net = Some(net_id);
        }
    }

    circuit.rebuild_indices();
    Ok(circuit)
}

fn bind_driver(
    nets: &mut HashMap<String, PendingNet>,
    name: &str,
    block: GlobalBlockId,
    pin: usize,
    line_no: usize,
    path: &Path,
) -> Result<(), PnrError> {
    let entry = nets.entry(name.to_string()).or_insert_with(|| PendingNet { driver: None, sinks: vec![] });
    if entry.driver.is_some() {
        return Err(PnrError::InputFormat {
            path: path.to_path_buf(),
            message: format!("line {line_no}: net \"{name}\" already has a driver"),
        });
    }
    entry.driver = Some((block, pin));
    Ok(())
}

/// Rejects a genuine BLIF netlist; BLIF/packing is out of scope (§1, §4.9).
pub fn reject_blif(path: &Path) -> PnrError {
    PnrError::UnsupportedFormat {
        format: "blif".to_string(),
        note: format!("{}: pre-pack to the documented .net subset (§4.9) before running this tool", path.display()),
    }
}

/// Writes the Place file format: a device-size header followed by one line
/// per global block (`<name> <x> <y> <subblock>  # <block-index>`).
pub fn write_place_file(circuit: &Circuit, device_size: u32) -> String {
    let mut out = format!("Device: {device_size} x {device_size}\n");
    for (i, block) in circuit.blocks.iter().enumerate() {
        let site = block.site.unwrap_or(SiteAssignment { x: 0, y: 0, subblock: 0 });
        out.push_str(&format!("{} {} {} {}  # {}\n", block.name, site.x, site.y, site.subblock, i));
    }
    out
}

/// Parses a previously written place file and applies its site assignments
/// onto an already-built `circuit` (the `--place` starting stage: netlist
/// structure comes from `.net`, placement from this file, routing proceeds
/// directly).
///
/// # Errors
/// `PnrError::InputFormat` if a line names a block absent from `circuit`.
pub fn apply_place_file(circuit: &mut Circuit, path: &PathBuf, text: &str) -> Result<(), PnrError> {
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("Device:") {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or_else(|| fmt_place_err(path, line_no, "missing block name".to_string()))?;
        let x: u32 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| fmt_place_err(path, line_no, "missing or malformed x".to_string()))?;
        let y: u32 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| fmt_place_err(path, line_no, "missing or malformed y".to_string()))?;
        let subblock: u32 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| fmt_place_err(path, line_no, "missing or malformed subblock".to_string()))?;

        let id = *circuit
            .block_by_name
            .get(name)
            .ok_or_else(|| fmt_place_err(path, line_no, format!("unknown block \"{name}\"")))?;
        circuit.block_mut(id).site = Some(SiteAssignment { x, y, subblock });
        circuit.block_mut(id).continuous = (x as f64, y as f64);
    }
    Ok(())
}

fn fmt_place_err(path: &Path, line_no: usize, message: String) -> PnrError {
    PnrError::InputFormat { path: path.to_path_buf(), message: format!("line {line_no}: {message}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_arch::parse_architecture_json;

    const SAMPLE: &str = r#"
    {
        "io_capacity": 2,
        "blocks": {
            "io": { "global_category": "IO", "ports": { "input": { "in": 1 }, "output": { "out": 1 } } },
            "clb": { "global_category": "CLB", "ports": { "input": { "i0": 1, "i1": 1 }, "output": { "o": 1 } } }
        }
    }
    "#;

    const NET: &str = r#"
    .input a
    .clb lut0 i0=a i1=open o=n1
    .output b
    "#;

    #[test]
    fn parses_minimal_net() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let circuit = parse_net_file(Path::new("t.net"), NET, &ctx).unwrap();
        assert_eq!(circuit.blocks.len(), 3);
        assert_eq!(circuit.block_by_name.len(), 3);
    }

    #[test]
    fn net_with_two_drivers_is_rejected() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let bad = ".input a\n.input a\n";
        let err = parse_net_file(Path::new("t.net"), bad, &ctx).unwrap_err();
        assert!(matches!(err, PnrError::InputFormat { .. }));
    }

    #[test]
    fn open_pin_creates_no_net() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let circuit = parse_net_file(Path::new("t.net"), NET, &ctx).unwrap();
        assert!(circuit.nets.iter().all(|n| n.name != "open"));
    }

    #[test]
    fn write_and_reapply_place_file_roundtrips() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let mut circuit = parse_net_file(Path::new("t.net"), NET, &ctx).unwrap();
        for (i, b) in circuit.blocks.iter_mut().enumerate() {
            b.site = Some(SiteAssignment { x: i as u32, y: 0, subblock: 0 });
        }
        let text = write_place_file(&circuit, 6);

        let mut restored = parse_net_file(Path::new("t.net"), NET, &ctx).unwrap();
        apply_place_file(&mut restored, &PathBuf::from("p.place"), &text).unwrap();
        for (a, b) in circuit.blocks.iter().zip(restored.blocks.iter()) {
            assert_eq!(a.site, b.site);
        }
    }

    #[test]
    fn blif_is_rejected() {
        let err = reject_blif(Path::new("design.blif"));
        assert!(matches!(err, PnrError::UnsupportedFormat { .. }));
    }
}
