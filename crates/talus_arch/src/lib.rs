//! FPGA device architecture models for the Talus placement/routing toolchain.
//!
//! An [`ArchitectureContext`] is built once from an architecture JSON file
//! (§6) and is immutable in structure thereafter — the "singletons become
//! explicit context" design note: block-type and port-type identity reduces
//! to integer index comparison via [`ids::BlockTypeId`].
//!
//! The device [`types::Grid`] and the [`rrg::Rrg`] routing resource graph
//! are derived from the context on demand, since the grid's size depends on
//! circuit occupancy (device auto-sizing), which this crate does not itself
//! know about.

#![warn(missing_docs)]

pub mod ids;
pub mod json;
pub mod rrg;
pub mod types;

use std::collections::HashMap;

use ids::BlockTypeId;
use talus_common::PnrError;
use types::{BlockCategory, BlockType, DelayKey, Grid};

pub use json::{load_architecture_json, parse_architecture_json};
pub use rrg::{NodeKind, Rrg, RrgNode, IPIN_BASE_COST};
pub use types::{parse_delay_key, BlockCategory as Category, Mode, Site};

/// The fully resolved architecture: block types, port delay table, and I/O
/// capacity. Built once via [`load_architecture_json`] or
/// [`parse_architecture_json`].
#[derive(Debug, Clone)]
pub struct ArchitectureContext {
    /// Pin capacity of every IO site.
    pub io_capacity: u32,
    /// All declared block types, indexed by [`BlockTypeId`].
    pub block_types: Vec<BlockType>,
    /// Block type name -> id, for lookups from file formats that name types.
    pub name_to_id: HashMap<String, BlockTypeId>,
    /// The parsed and validated delay table.
    pub delays: HashMap<DelayKey, f64>,
}

impl ArchitectureContext {
    /// Looks up a block type by id.
    pub fn block_type(&self, id: BlockTypeId) -> &BlockType {
        &self.block_types[id.index()]
    }

    /// Looks up a block type by name.
    pub fn block_type_by_name(&self, name: &str) -> Option<&BlockType> {
        self.name_to_id.get(name).map(|id| self.block_type(*id))
    }

    /// Returns the id and type of the architecture's unique IO block type.
    ///
    /// # Errors
    /// `PnrError::ArchitectureInconsistency` if zero or more than one IO
    /// block type is declared.
    pub fn io_block_type(&self) -> Result<(BlockTypeId, &BlockType), PnrError> {
        self.unique_of_category(BlockCategory::Io, "IO")
    }

    /// Returns the id and type of the architecture's unique CLB block type.
    ///
    /// # Errors
    /// `PnrError::ArchitectureInconsistency` if zero or more than one CLB
    /// block type is declared.
    pub fn clb_block_type(&self) -> Result<(BlockTypeId, &BlockType), PnrError> {
        self.unique_of_category(BlockCategory::Clb, "CLB")
    }

    fn unique_of_category(
        &self,
        category: BlockCategory,
        label: &str,
    ) -> Result<(BlockTypeId, &BlockType), PnrError> {
        let mut found = self
            .block_types
            .iter()
            .enumerate()
            .filter(|(_, bt)| bt.category == category);
        let (i, bt) = found.next().ok_or_else(|| {
            PnrError::ArchitectureInconsistency(format!("no {label} block type declared"))
        })?;
        if found.next().is_some() {
            return Err(PnrError::ArchitectureInconsistency(format!(
                "more than one {label} block type declared"
            )));
        }
        Ok((BlockTypeId::from_raw(i as u32), bt))
    }

    /// Returns all hardblock-category block types, with their ids.
    pub fn hardblock_types(&self) -> Vec<(BlockTypeId, &BlockType)> {
        self.block_types
            .iter()
            .enumerate()
            .filter(|(_, bt)| bt.category == BlockCategory::Hardblock)
            .map(|(i, bt)| (BlockTypeId::from_raw(i as u32), bt))
            .collect()
    }

    /// Builds the device grid at the given size `n` (an `n x n` square).
    pub fn build_grid(&self, n: u32) -> Result<Grid, PnrError> {
        let (io_id, _) = self.io_block_type()?;
        let (clb_id, _) = self.clb_block_type()?;
        let hardblocks = self.hardblock_types();
        Ok(Grid::build(n, self.io_capacity, io_id, clb_id, &hardblocks))
    }

    /// Returns the total site capacity of `block_type` at device size `n`,
    /// without materializing the full grid. Used by the placer's
    /// device-autosizing search.
    pub fn capacity_for_type(&self, n: u32, block_type: BlockTypeId) -> Result<u32, PnrError> {
        Ok(self.build_grid(n)?.capacity_of(block_type))
    }

    /// The clock-to-register setup time, if declared.
    pub fn clock_setup_time(&self) -> Option<f64> {
        self.delays.get(&DelayKey::ClockSetupTime).copied()
    }

    /// Looks up a full pin-to-pin delay between two named block/port pairs.
    pub fn pin_to_pin_delay(&self, src_block: &str, src_port: &str, dst_block: &str, dst_port: &str) -> Option<f64> {
        self.delays
            .get(&DelayKey::PinToPin {
                src_block: src_block.to_string(),
                src_port: src_port.to_string(),
                dst_block: dst_block.to_string(),
                dst_port: dst_port.to_string(),
            })
            .copied()
    }

    /// Looks up a sink-side setup delay (`<src_block>-<dst_block>.<dst_port>`).
    pub fn sink_setup_delay(&self, src_block: &str, dst_block: &str, dst_port: &str) -> Option<f64> {
        self.delays
            .get(&DelayKey::SinkSetup {
                src_block: src_block.to_string(),
                dst_block: dst_block.to_string(),
                dst_port: dst_port.to_string(),
            })
            .copied()
    }

    /// Looks up a source-side setup delay (`<src_block>.<src_port>-<dst_block>`).
    pub fn source_setup_delay(&self, src_block: &str, src_port: &str, dst_block: &str) -> Option<f64> {
        self.delays
            .get(&DelayKey::SourceSetup {
                src_block: src_block.to_string(),
                src_port: src_port.to_string(),
                dst_block: dst_block.to_string(),
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json::parse_architecture_json;

    const SAMPLE: &str = r#"
    {
        "io_capacity": 2,
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
    fn io_and_clb_lookup() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let (_, io) = ctx.io_block_type().unwrap();
        assert_eq!(io.name, "io");
        let (_, clb) = ctx.clb_block_type().unwrap();
        assert_eq!(clb.name, "clb");
    }

    #[test]
    fn build_grid_places_io_and_clb() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let grid = ctx.build_grid(4).unwrap();
        let (io_id, _) = ctx.io_block_type().unwrap();
        let (clb_id, _) = ctx.clb_block_type().unwrap();
        assert_eq!(grid.site_at(0, 0).block_type, io_id);
        assert_eq!(grid.site_at(1, 1).block_type, clb_id);
    }

    #[test]
    fn capacity_for_type_matches_grid() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        let (clb_id, _) = ctx.clb_block_type().unwrap();
        let cap = ctx.capacity_for_type(4, clb_id).unwrap();
        let grid = ctx.build_grid(4).unwrap();
        assert_eq!(cap, grid.capacity_of(clb_id));
    }

    #[test]
    fn missing_io_type_is_architecture_inconsistency() {
        let no_io = r#"
        {
            "io_capacity": 1,
            "blocks": { "clb": { "global_category": "CLB" } }
        }
        "#;
        let ctx = parse_architecture_json(no_io).unwrap();
        let err = ctx.io_block_type().unwrap_err();
        assert!(matches!(err, PnrError::ArchitectureInconsistency(_)));
    }

    #[test]
    fn pin_to_pin_delay_lookup() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        assert_eq!(ctx.pin_to_pin_delay("lut", "in", "lut", "out"), Some(300.0));
        assert_eq!(ctx.pin_to_pin_delay("lut", "in", "lut", "missing"), None);
    }

    #[test]
    fn clock_setup_time_lookup() {
        let ctx = parse_architecture_json(SAMPLE).unwrap();
        assert_eq!(ctx.clock_setup_time(), Some(50.0));
    }
}
