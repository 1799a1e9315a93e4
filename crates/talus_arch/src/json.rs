//! Deserialization of the architecture JSON schema (§6) into an
//! [`ArchitectureContext`](crate::ArchitectureContext).

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use talus_common::PnrError;

use crate::ids::BlockTypeId;
use crate::types::{parse_delay_key, BlockCategory, BlockType, DelayKey, Mode};
use crate::ArchitectureContext;

/// Raw deserialization target for the top-level architecture JSON document.
#[derive(Debug, Deserialize)]
struct ArchitectureJson {
    io_capacity: u32,
    blocks: HashMap<String, BlockDefJson>,
    #[serde(default)]
    delays: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct BlockDefJson {
    #[serde(default)]
    leaf: bool,
    #[serde(default)]
    clocked: bool,
    #[serde(default)]
    global_category: Option<String>,
    #[serde(default = "default_one")]
    height: u32,
    #[serde(default)]
    start: u32,
    #[serde(default = "default_one")]
    repeat: u32,
    #[serde(default)]
    ports: PortsJson,
    #[serde(default)]
    modes: HashMap<String, ModeJson>,
    #[serde(default)]
    children: HashMap<String, u32>,
}

fn default_one() -> u32 {
    1
}

#[derive(Debug, Default, Deserialize)]
struct PortsJson {
    #[serde(default)]
    input: HashMap<String, u32>,
    #[serde(default)]
    output: HashMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct ModeJson {
    children: HashMap<String, u32>,
}

/// Loads and validates an architecture JSON file into an [`ArchitectureContext`].
pub fn load_architecture_json(path: &Path) -> Result<ArchitectureContext, PnrError> {
    let content = std::fs::read_to_string(path).map_err(|e| PnrError::InputFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_architecture_json(&content).map_err(|message| PnrError::InputFormat {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses architecture JSON content into an [`ArchitectureContext`].
///
/// Separated from [`load_architecture_json`] for testing without touching
/// the filesystem.
pub fn parse_architecture_json(content: &str) -> Result<ArchitectureContext, String> {
    let doc: ArchitectureJson =
        serde_json::from_str(content).map_err(|e| format!("invalid architecture JSON: {e}"))?;
    build_context(doc)
}

fn build_context(doc: ArchitectureJson) -> Result<ArchitectureContext, String> {
    // Assign stable IDs up front so modes/children can reference them during
    // the single resolution pass below.
    let mut name_to_id: HashMap<String, BlockTypeId> = HashMap::new();
    let mut ordered_names: Vec<&String> = doc.blocks.keys().collect();
    ordered_names.sort();
    for (i, name) in ordered_names.iter().enumerate() {
        if name_to_id
            .insert((*name).clone(), BlockTypeId::from_raw(i as u32))
            .is_some()
        {
            return Err(format!("duplicate block type name {name:?}"));
        }
    }

    let mut block_types = Vec::with_capacity(ordered_names.len());
    for name in &ordered_names {
        let def = &doc.blocks[*name];
        let category = resolve_category(def)?;
        if def.height < 1 {
            return Err(format!("block type {name:?}: height must be >= 1"));
        }
        if def.repeat < 1 {
            return Err(format!("block type {name:?}: repeat must be >= 1"));
        }
        if matches!(category, BlockCategory::Io | BlockCategory::Clb)
            && (def.height != 1 || def.repeat != 1)
        {
            return Err(format!(
                "block type {name:?}: IO/CLB blocks must have height = 1, repeat = 1"
            ));
        }

        let modes = resolve_modes(name, def, &name_to_id)?;

        let mut input_ports: Vec<(String, u32)> = def.ports.input.clone().into_iter().collect();
        let mut output_ports: Vec<(String, u32)> = def.ports.output.clone().into_iter().collect();
        input_ports.sort();
        output_ports.sort();

        block_types.push(BlockType {
            name: (*name).clone(),
            category,
            height: def.height,
            start: def.start,
            repeat: def.repeat,
            clocked: def.clocked,
            input_ports,
            output_ports,
            modes,
        });
    }

    let mut delays: HashMap<DelayKey, f64> = HashMap::new();
    for (key, value) in &doc.delays {
        let parsed = parse_delay_key(key).map_err(|e| format!("delay key {key:?}: {e}"))?;
        validate_delay_key_blocks(&parsed, &name_to_id)?;
        delays.insert(parsed, *value);
    }

    Ok(ArchitectureContext {
        io_capacity: doc.io_capacity,
        block_types,
        name_to_id,
        delays,
    })
}

fn resolve_category(def: &BlockDefJson) -> Result<BlockCategory, String> {
    if def.leaf {
        return Ok(BlockCategory::Leaf);
    }
    match def.global_category.as_deref() {
        Some("IO") => Ok(BlockCategory::Io),
        Some("CLB") => Ok(BlockCategory::Clb),
        Some("hardblock") => Ok(BlockCategory::Hardblock),
        Some(other) => Err(format!("unrecognized global_category {other:?}")),
        None => Ok(BlockCategory::Intermediate),
    }
}

fn resolve_modes(
    name: &str,
    def: &BlockDefJson,
    name_to_id: &HashMap<String, BlockTypeId>,
) -> Result<Vec<Mode>, String> {
    if def.leaf {
        return Ok(vec![Mode {
            name: "default".to_string(),
            children: Vec::new(),
        }]);
    }
    if !def.modes.is_empty() {
        let mut mode_names: Vec<&String> = def.modes.keys().collect();
        mode_names.sort();
        let mut modes = Vec::with_capacity(mode_names.len());
        for mode_name in mode_names {
            let mode_def = &def.modes[mode_name];
            modes.push(Mode {
                name: mode_name.clone(),
                children: resolve_children(name, &mode_def.children, name_to_id)?,
            });
        }
        return Ok(modes);
    }
    if !def.children.is_empty() {
        return Ok(vec![Mode {
            name: "default".to_string(),
            children: resolve_children(name, &def.children, name_to_id)?,
        }]);
    }
    Ok(vec![Mode {
        name: "default".to_string(),
        children: Vec::new(),
    }])
}

fn resolve_children(
    owner: &str,
    children: &HashMap<String, u32>,
    name_to_id: &HashMap<String, BlockTypeId>,
) -> Result<Vec<(BlockTypeId, u32)>, String> {
    let mut names: Vec<&String> = children.keys().collect();
    names.sort();
    let mut resolved = Vec::with_capacity(names.len());
    for child_name in names {
        let id = name_to_id.get(child_name).ok_or_else(|| {
            format!("block type {owner:?} references unknown child block type {child_name:?}")
        })?;
        resolved.push((*id, children[child_name]));
    }
    Ok(resolved)
}

fn validate_delay_key_blocks(
    key: &DelayKey,
    name_to_id: &HashMap<String, BlockTypeId>,
) -> Result<(), String> {
    let check = |block: &str| -> Result<(), String> {
        if name_to_id.contains_key(block) {
            Ok(())
        } else {
            Err(format!("delay key references unknown block type {block:?}"))
        }
    };
    match key {
        DelayKey::ClockSetupTime => Ok(()),
        DelayKey::PinToPin {
            src_block, dst_block, ..
        } => {
            check(src_block)?;
            check(dst_block)
        }
        DelayKey::SinkSetup {
            src_block, dst_block, ..
        } => {
            check(src_block)?;
            check(dst_block)
        }
        DelayKey::SourceSetup {
            src_block, dst_block, ..
        } => {
            check(src_block)?;
            check(dst_block)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
    {
        "io_capacity": 4,
        "blocks": {
            "io": { "global_category": "IO", "ports": { "input": { "in": 1 }, "output": { "out": 1 } } },
            "clb": { "global_category": "CLB", "modes": { "default": { "children": { "lut": 1 } } },
                     "ports": { "input": { "in": 4 }, "output": { "out": 1 } } },
            "lut": { "leaf": true, "ports": { "input": { "in": 4 }, "output": { "out": 1 } } }
        },
        "delays": {
            "lut.in-lut.out": 300.0,
            "clock_setup_time": 50.0
        }
    }
    "#;

    #[test]
    fn parses_minimal_architecture() {
        let ctx = parse_architecture_json(MINIMAL).unwrap();
        assert_eq!(ctx.io_capacity, 4);
        assert_eq!(ctx.block_types.len(), 3);
        let clb = ctx.block_type_by_name("clb").unwrap();
        assert_eq!(clb.modes.len(), 1);
        assert_eq!(clb.modes[0].children.len(), 1);
    }

    #[test]
    fn rejects_unknown_child_reference() {
        let bad = MINIMAL.replace("\"lut\": 1", "\"nonexistent\": 1");
        let err = parse_architecture_json(&bad).unwrap_err();
        assert!(err.contains("unknown child block type"));
    }

    #[test]
    fn rejects_zero_height() {
        let bad = r#"
        {
            "io_capacity": 1,
            "blocks": { "bram": { "global_category": "hardblock", "height": 0 } }
        }
        "#;
        let err = parse_architecture_json(bad).unwrap_err();
        assert!(err.contains("height must be >= 1"));
    }

    #[test]
    fn rejects_tall_clb() {
        let bad = r#"
        {
            "io_capacity": 1,
            "blocks": { "clb": { "global_category": "CLB", "height": 2 } }
        }
        "#;
        let err = parse_architecture_json(bad).unwrap_err();
        assert!(err.contains("IO/CLB blocks must have height"));
    }

    #[test]
    fn rejects_malformed_delay_key() {
        let bad = MINIMAL.replace("\"lut.in-lut.out\": 300.0,", "\"nonsense\": 300.0,");
        let err = parse_architecture_json(&bad).unwrap_err();
        assert!(err.contains("delay key"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_architecture_json("not json").unwrap_err();
        assert!(err.contains("invalid architecture JSON"));
    }

    #[test]
    fn delay_table_parses_clock_setup() {
        let ctx = parse_architecture_json(MINIMAL).unwrap();
        assert_eq!(ctx.delays.get(&DelayKey::ClockSetupTime), Some(&50.0));
    }
}
