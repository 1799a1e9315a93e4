//! Block types, port delay tables, and the device grid.
//!
//! These are the architecture-level building blocks from which an
//! [`ArchitectureContext`](crate::ArchitectureContext) is assembled: the set
//! of block types available on a device, the column pattern that places
//! them on the grid, and the pin-to-pin delay table used to seed the timing
//! graph's intra-block edges.

use crate::ids::BlockTypeId;
use serde::{Deserialize, Serialize};

/// The functional category of a block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockCategory {
    /// An I/O block occupying the device perimeter.
    Io,
    /// A configurable logic block.
    Clb,
    /// A hardblock (BRAM, DSP, PLL, …) occupying a periodic column pattern.
    Hardblock,
    /// An intermediate block in the mode-decomposition hierarchy (not
    /// directly placed — only its leaf descendants occupy sites).
    Intermediate,
    /// A leaf block with a single unnamed mode.
    Leaf,
}

/// A named decomposition of a block type into child block types with counts.
///
/// Leaf types have exactly one mode (conventionally named `"default"`).
#[derive(Debug, Clone)]
pub struct Mode {
    /// The mode's name, unique within its owning block type.
    pub name: String,
    /// Child block types and how many of each this mode instantiates.
    pub children: Vec<(BlockTypeId, u32)>,
}

/// A named kind of global or sub- block, as declared in the architecture JSON.
#[derive(Debug, Clone)]
pub struct BlockType {
    /// The block type's name, unique across the architecture.
    pub name: String,
    /// The block type's functional category.
    pub category: BlockCategory,
    /// Height in device rows. `1` for IO/CLB; `>= 1` for hardblocks.
    pub height: u32,
    /// Column-pattern start offset for hardblocks (`0` for IO/CLB).
    pub start: u32,
    /// Column-pattern repeat period for hardblocks (`1` for IO/CLB).
    pub repeat: u32,
    /// Whether this block type carries a clock input (affects intra-block
    /// setup-time lookups).
    pub clocked: bool,
    /// Input port names and their pin multiplicity.
    pub input_ports: Vec<(String, u32)>,
    /// Output port names and their pin multiplicity.
    pub output_ports: Vec<(String, u32)>,
    /// The block type's mode choices. Non-empty; leaves have exactly one.
    pub modes: Vec<Mode>,
}

impl BlockType {
    /// Returns `true` if every invariant from the data model holds:
    /// `height >= 1`, `repeat >= 1`, and (for IO/CLB) `height == 1 && repeat == 1`.
    pub fn satisfies_size_invariant(&self) -> bool {
        if self.height < 1 || self.repeat < 1 {
            return false;
        }
        if matches!(self.category, BlockCategory::Io | BlockCategory::Clb) {
            return self.height == 1 && self.repeat == 1;
        }
        true
    }
}

/// A parsed architecture-JSON delay key (§6).
///
/// The three forms documented in the architecture JSON schema:
/// a full pin-to-pin delay, a sink-side setup delay (no source port named),
/// and a source-side setup delay (no destination port named).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DelayKey {
    /// `"clock_setup_time"` — the default clock-to-register setup time.
    ClockSetupTime,
    /// `"<block>.<port>-<block>.<port>"` — a full pin-to-pin delay.
    PinToPin {
        /// Source block type name.
        src_block: String,
        /// Source port name.
        src_port: String,
        /// Destination block type name.
        dst_block: String,
        /// Destination port name.
        dst_port: String,
    },
    /// `"<block>-<block>.<port>"` — a sink-side setup delay.
    SinkSetup {
        /// Source block type name (no port: applies at the block's output).
        src_block: String,
        /// Destination block type name.
        dst_block: String,
        /// Destination port name.
        dst_port: String,
    },
    /// `"<block>.<port>-<block>"` — a source-side setup delay.
    SourceSetup {
        /// Source block type name.
        src_block: String,
        /// Source port name.
        src_port: String,
        /// Destination block type name (no port: applies at the block's input).
        dst_block: String,
    },
}

/// Parses a delay key string into its structured form.
///
/// Returns `Err` with a human-readable reason on malformed input; callers
/// surface this as `PnrError::ArchitectureInconsistency` (or
/// `PnrError::InputFormat` at the JSON-loader boundary).
pub fn parse_delay_key(key: &str) -> Result<DelayKey, String> {
    if key == "clock_setup_time" {
        return Ok(DelayKey::ClockSetupTime);
    }
    let (lhs, rhs) = key
        .split_once('-')
        .ok_or_else(|| format!("delay key {key:?} has no '-' separator"))?;
    let lhs_parts: Vec<&str> = lhs.splitn(2, '.').collect();
    let rhs_parts: Vec<&str> = rhs.splitn(2, '.').collect();
    match (lhs_parts.len(), rhs_parts.len()) {
        (2, 2) => Ok(DelayKey::PinToPin {
            src_block: lhs_parts[0].to_string(),
            src_port: lhs_parts[1].to_string(),
            dst_block: rhs_parts[0].to_string(),
            dst_port: rhs_parts[1].to_string(),
        }),
        (1, 2) => Ok(DelayKey::SinkSetup {
            src_block: lhs_parts[0].to_string(),
            dst_block: rhs_parts[0].to_string(),
            dst_port: rhs_parts[1].to_string(),
        }),
        (2, 1) => Ok(DelayKey::SourceSetup {
            src_block: lhs_parts[0].to_string(),
            src_port: lhs_parts[1].to_string(),
            dst_block: rhs_parts[0].to_string(),
        }),
        _ => Err(format!(
            "delay key {key:?} must name a port on at least one side"
        )),
    }
}

/// A single site: a grid location with a block type and a pin capacity.
///
/// A hardblock site of height `h` occupies rows `y, y+1, …, y+h-1` of its
/// column; only the row `y` entry is materialized in [`Grid`] — callers
/// derive occupied rows from the block type's `height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// The block type placeable at this site.
    pub block_type: BlockTypeId,
    /// Pin capacity: `1` for CLB/hardblock, `io_capacity` for IO.
    pub capacity: u32,
}

/// The square device grid: perimeter IO, interior CLB/hardblock column pattern.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Grid width (== height; the device is always square).
    pub width: u32,
    /// Grid height (== width).
    pub height: u32,
    sites: Vec<Site>,
}

impl Grid {
    /// Builds a grid of size `n x n` for the given block types.
    ///
    /// Column 0 and `n-1`, and rows 0 and `n-1`, are IO. Interior columns
    /// follow the hardblock column pattern: hardblock type `i` occupies
    /// column `c` iff `(c - 1 - start_i) mod repeat_i == 0`; otherwise the
    /// column is CLB. `io_type` and `clb_type` name the IO and CLB block
    /// types to use; `hardblock_types` lists the remaining placeable types
    /// in priority order (first match wins on a given column).
    pub fn build(
        n: u32,
        io_capacity: u32,
        io_type: BlockTypeId,
        clb_type: BlockTypeId,
        hardblock_types: &[(BlockTypeId, &BlockType)],
    ) -> Grid {
        let mut sites = Vec::with_capacity((n * n) as usize);
        for y in 0..n {
            for x in 0..n {
                let is_perimeter = x == 0 || x == n - 1 || y == 0 || y == n - 1;
                if is_perimeter {
                    sites.push(Site {
                        x,
                        y,
                        block_type: io_type,
                        capacity: io_capacity,
                    });
                    continue;
                }
                let hardblock = hardblock_types
                    .iter()
                    .find(|(_, bt)| bt.repeat > 0 && x >= 1 + bt.start && (x - 1 - bt.start) % bt.repeat == 0);
                if let Some((id, _)) = hardblock {
                    sites.push(Site {
                        x,
                        y,
                        block_type: *id,
                        capacity: 1,
                    });
                } else {
                    sites.push(Site {
                        x,
                        y,
                        block_type: clb_type,
                        capacity: 1,
                    });
                }
            }
        }
        Grid {
            width: n,
            height: n,
            sites,
        }
    }

    /// Returns the site at `(x, y)`.
    pub fn site_at(&self, x: u32, y: u32) -> &Site {
        &self.sites[(y * self.width + x) as usize]
    }

    /// Returns an iterator over all sites.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    /// Returns the total capacity of sites of the given block type.
    pub fn capacity_of(&self, block_type: BlockTypeId) -> u32 {
        self.sites
            .iter()
            .filter(|s| s.block_type == block_type)
            .map(|s| s.capacity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_invariant_clb() {
        let bt = BlockType {
            name: "clb".to_string(),
            category: BlockCategory::Clb,
            height: 1,
            start: 0,
            repeat: 1,
            clocked: false,
            input_ports: vec![],
            output_ports: vec![],
            modes: vec![],
        };
        assert!(bt.satisfies_size_invariant());
    }

    #[test]
    fn size_invariant_rejects_tall_clb() {
        let bt = BlockType {
            name: "clb".to_string(),
            category: BlockCategory::Clb,
            height: 2,
            start: 0,
            repeat: 1,
            clocked: false,
            input_ports: vec![],
            output_ports: vec![],
            modes: vec![],
        };
        assert!(!bt.satisfies_size_invariant());
    }

    #[test]
    fn size_invariant_rejects_zero_repeat() {
        let bt = BlockType {
            name: "bram".to_string(),
            category: BlockCategory::Hardblock,
            height: 4,
            start: 0,
            repeat: 0,
            clocked: false,
            input_ports: vec![],
            output_ports: vec![],
            modes: vec![],
        };
        assert!(!bt.satisfies_size_invariant());
    }

    #[test]
    fn parse_clock_setup() {
        assert_eq!(parse_delay_key("clock_setup_time"), Ok(DelayKey::ClockSetupTime));
    }

    #[test]
    fn parse_pin_to_pin() {
        let key = parse_delay_key("lut.in0-lut.out").unwrap();
        assert_eq!(
            key,
            DelayKey::PinToPin {
                src_block: "lut".to_string(),
                src_port: "in0".to_string(),
                dst_block: "lut".to_string(),
                dst_port: "out".to_string(),
            }
        );
    }

    #[test]
    fn parse_sink_setup() {
        let key = parse_delay_key("lut-ff.d").unwrap();
        assert_eq!(
            key,
            DelayKey::SinkSetup {
                src_block: "lut".to_string(),
                dst_block: "ff".to_string(),
                dst_port: "d".to_string(),
            }
        );
    }

    #[test]
    fn parse_source_setup() {
        let key = parse_delay_key("ff.q-lut").unwrap();
        assert_eq!(
            key,
            DelayKey::SourceSetup {
                src_block: "ff".to_string(),
                src_port: "q".to_string(),
                dst_block: "lut".to_string(),
            }
        );
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(parse_delay_key("nonsense").is_err());
    }

    #[test]
    fn grid_perimeter_is_io() {
        let io = BlockTypeId::from_raw(0);
        let clb = BlockTypeId::from_raw(1);
        let grid = Grid::build(4, 1, io, clb, &[]);
        assert_eq!(grid.site_at(0, 0).block_type, io);
        assert_eq!(grid.site_at(3, 0).block_type, io);
        assert_eq!(grid.site_at(0, 3).block_type, io);
        assert_eq!(grid.site_at(3, 3).block_type, io);
        assert_eq!(grid.site_at(1, 1).block_type, clb);
    }

    #[test]
    fn grid_capacity_of() {
        let io = BlockTypeId::from_raw(0);
        let clb = BlockTypeId::from_raw(1);
        let grid = Grid::build(4, 4, io, clb, &[]);
        // 4x4 perimeter has 12 IO sites, each with capacity 4.
        assert_eq!(grid.capacity_of(io), 12 * 4);
        assert_eq!(grid.capacity_of(clb), 4);
    }

    #[test]
    fn grid_hardblock_column_pattern() {
        let io = BlockTypeId::from_raw(0);
        let clb = BlockTypeId::from_raw(1);
        let bram_id = BlockTypeId::from_raw(2);
        let bram = BlockType {
            name: "bram".to_string(),
            category: BlockCategory::Hardblock,
            height: 1,
            start: 0,
            repeat: 2,
            clocked: true,
            input_ports: vec![],
            output_ports: vec![],
            modes: vec![],
        };
        let grid = Grid::build(6, 1, io, clb, &[(bram_id, &bram)]);
        // Interior columns are 1..=4; (c - 1 - 0) % 2 == 0 => c in {1, 3}.
        assert_eq!(grid.site_at(1, 2).block_type, bram_id);
        assert_eq!(grid.site_at(3, 2).block_type, bram_id);
        assert_eq!(grid.site_at(2, 2).block_type, clb);
        assert_eq!(grid.site_at(4, 2).block_type, clb);
    }
}
