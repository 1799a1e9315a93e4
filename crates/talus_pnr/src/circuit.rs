//! The physical netlist: global blocks, nets, and connections (§3).
//!
//! A [`Circuit`] is built once from a parsed `.net` file (or a synthetic
//! generator for `--random`) and flows through placement and routing.
//! Site assignment mutates during placement; connection routes mutate
//! during routing. Both live on the owning structs rather than a side
//! table, since neither placement nor routing runs concurrently with the
//! other (§5).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use talus_arch::ids::BlockTypeId;

use crate::ids::{ConnectionId, GlobalBlockId, NetId};

/// Where a global block currently sits on the device grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAssignment {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Sub-slot within the site (IO capacity > 1; 0 for CLB/hardblock).
    pub subblock: u32,
}

/// A single input or output pin on a global block, bound to a net.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockPin {
    /// Port name as declared on the block type.
    pub port: String,
    /// Bit index within the port (for multi-bit ports).
    pub bit: u32,
    /// The net driven by (output) or connected to (input) this pin.
    pub net: Option<NetId>,
}

/// One global block: an IO pad or a CLB/hardblock instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalBlock {
    /// This block's id.
    pub id: GlobalBlockId,
    /// Human-readable name, from the `.net` file.
    pub name: String,
    /// The architecture block type this instance belongs to.
    pub block_type: BlockTypeId,
    /// Whether this block is an IO block (fixed by the caller rather than
    /// moved by the analytical placer — §4.3).
    pub is_io: bool,
    /// Input pins, in declaration order.
    pub inputs: Vec<BlockPin>,
    /// Output pins, in declaration order.
    pub outputs: Vec<BlockPin>,
    /// Current site assignment (`None` before placement).
    pub site: Option<SiteAssignment>,
    /// Continuous placement coordinates used by the analytical placer
    /// before legalization snaps them to a site.
    pub continuous: (f64, f64),
}

impl GlobalBlock {
    /// Returns the pin bound to `net`, if any, along with its direction.
    pub fn pin_for_net(&self, net: NetId) -> Option<(&BlockPin, bool)> {
        if let Some(p) = self.outputs.iter().find(|p| p.net == Some(net)) {
            return Some((p, true));
        }
        self.inputs.iter().find(|p| p.net == Some(net)).map(|p| (p, false))
    }
}

/// A signal net: one driver pin, one or more sink pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// This net's id.
    pub id: NetId,
    /// Net name.
    pub name: String,
    /// Driving block.
    pub driver: GlobalBlockId,
    /// Sink blocks.
    pub sinks: Vec<GlobalBlockId>,
    /// Connections belonging to this net (one per sink), filled in when the
    /// circuit is built.
    pub connections: Vec<ConnectionId>,
}

impl Net {
    /// Fanout of this net (number of sinks).
    pub fn fanout(&self) -> usize {
        self.sinks.len()
    }
}

/// Cached bounding box across a net's block pins, in device grid coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    /// Minimum x.
    pub xmin: f64,
    /// Maximum x.
    pub xmax: f64,
    /// Minimum y.
    pub ymin: f64,
    /// Maximum y.
    pub ymax: f64,
}

impl BoundingBox {
    /// Half-perimeter of this bounding box.
    pub fn half_perimeter(&self) -> f64 {
        (self.xmax - self.xmin) + (self.ymax - self.ymin)
    }
}

/// A driver-pin -> one-sink-pin connection. Owns its routing state (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// This connection's id.
    pub id: ConnectionId,
    /// The net this connection belongs to.
    pub net: NetId,
    /// Sink block of this connection.
    pub sink: GlobalBlockId,
    /// Ordered list of RRG nodes from driver to sink, raw `u32` ids (kept
    /// decoupled from `talus_arch::ids::RrgNodeId` at the serde boundary).
    pub route: Vec<u32>,
    /// Criticality in `[0, 1]`, refreshed by the timing bridge each router
    /// iteration.
    pub criticality: f64,
}

impl Connection {
    /// Whether this connection currently has a route.
    pub fn is_routed(&self) -> bool {
        !self.route.is_empty()
    }
}

/// The physical netlist: all global blocks, nets, and connections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Circuit {
    /// All global blocks.
    pub blocks: Vec<GlobalBlock>,
    /// All nets.
    pub nets: Vec<Net>,
    /// All connections (one per net sink).
    pub connections: Vec<Connection>,
    /// Block name -> id, rebuilt on deserialization.
    #[serde(skip)]
    pub block_by_name: HashMap<String, GlobalBlockId>,
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block and returns its id.
    pub fn add_block(&mut self, mut block: GlobalBlock) -> GlobalBlockId {
        let id = GlobalBlockId::from_raw(self.blocks.len() as u32);
        block.id = id;
        self.block_by_name.insert(block.name.clone(), id);
        self.blocks.push(block);
        id
    }

    /// Adds a net and its one connection per sink, returning the net id.
    pub fn add_net(&mut self, name: String, driver: GlobalBlockId, sinks: Vec<GlobalBlockId>) -> NetId {
        let net_id = NetId::from_raw(self.nets.len() as u32);
        let mut connection_ids = Vec::with_capacity(sinks.len());
        for &sink in &sinks {
            let conn_id = ConnectionId::from_raw(self.connections.len() as u32);
            self.connections.push(Connection {
                id: conn_id,
                net: net_id,
                sink,
                route: Vec::new(),
                criticality: 0.0,
            });
            connection_ids.push(conn_id);
        }
        self.nets.push(Net {
            id: net_id,
            name,
            driver,
            sinks,
            connections: connection_ids,
        });
        net_id
    }

    /// Looks up a block.
    pub fn block(&self, id: GlobalBlockId) -> &GlobalBlock {
        &self.blocks[id.index()]
    }

    /// Mutably looks up a block.
    pub fn block_mut(&mut self, id: GlobalBlockId) -> &mut GlobalBlock {
        &mut self.blocks[id.index()]
    }

    /// Looks up a net.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    /// Looks up a connection.
    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id.index()]
    }

    /// Mutably looks up a connection.
    pub fn connection_mut(&mut self, id: ConnectionId) -> &mut Connection {
        &mut self.connections[id.index()]
    }

    /// Returns the ids of every movable (non-IO) block.
    pub fn movable_blocks(&self) -> impl Iterator<Item = GlobalBlockId> + '_ {
        self.blocks.iter().filter(|b| !b.is_io).map(|b| b.id)
    }

    /// Computes the bounding box of a net's block pins, from whichever of
    /// `site` / `continuous` coordinates is present (site wins once set).
    pub fn net_bounding_box(&self, net_id: NetId) -> BoundingBox {
        let net = self.net(net_id);
        let mut bb = BoundingBox {
            xmin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymin: f64::INFINITY,
            ymax: f64::NEG_INFINITY,
        };
        let mut touch = |b: &GlobalBlock| {
            let (x, y) = match b.site {
                Some(s) => (s.x as f64, s.y as f64),
                None => b.continuous,
            };
            bb.xmin = bb.xmin.min(x);
            bb.xmax = bb.xmax.max(x);
            bb.ymin = bb.ymin.min(y);
            bb.ymax = bb.ymax.max(y);
        };
        touch(self.block(net.driver));
        for &sink in &net.sinks {
            touch(self.block(sink));
        }
        if bb.xmin.is_infinite() {
            return BoundingBox::default();
        }
        bb
    }

    /// Rebuilds `block_by_name` after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.block_by_name.clear();
        for (i, b) in self.blocks.iter().enumerate() {
            self.block_by_name.insert(b.name.clone(), GlobalBlockId::from_raw(i as u32));
        }
    }

    /// Whether every block has a site assignment.
    pub fn is_fully_placed(&self) -> bool {
        self.blocks.iter().all(|b| b.site.is_some())
    }

    /// Whether every connection has a route.
    pub fn is_fully_routed(&self) -> bool {
        self.connections.iter().all(|c| c.is_routed())
    }
}
