//! The routing resource graph (RRG): the static directed graph of routing
//! resources the connection router searches.

use crate::ids::RrgNodeId;
use crate::types::Grid;
use serde::{Deserialize, Serialize};

/// The number of parallel tracks synthesized per routing channel.
///
/// Not part of the architecture JSON schema (§6 only describes block types,
/// ports, and delays); this is a fixed implementation constant of the
/// resource-graph synthesizer, chosen to give routers enough capacity to
/// converge on modestly congested circuits without modeling a full
/// segment-length/switch-pattern channel architecture.
const CHANNEL_WIDTH: u32 = 4;

/// A baseline per-pin cost for terminating a route (entering an IPIN).
///
/// Referenced directly by the router's lower-bound heuristic (component
/// design §4.7); exposed here since it is a property of the resource graph.
pub const IPIN_BASE_COST: f64 = 0.95;

/// The kind of a routing-resource-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The notional origin of a net, one per output pin.
    Source,
    /// An output pin of a placed block.
    Opin,
    /// A horizontal routing-channel wire segment.
    ChanX,
    /// A vertical routing-channel wire segment.
    ChanY,
    /// An input pin of a placed block.
    Ipin,
    /// The notional terminus of a connection, one per input pin.
    Sink,
}

/// A single node in the routing resource graph.
///
/// Structural (immutable) fields only; per-route mutable state (occupation,
/// present/historical cost, Dijkstra scratch) lives in a parallel array
/// owned by the router, per the Design Notes' separation of structure from
/// mutable routing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrgNode {
    /// The node's kind.
    pub kind: NodeKind,
    /// Grid column this node is associated with (wire segments use their
    /// start column/row).
    pub x: u32,
    /// Grid row this node is associated with.
    pub y: u32,
    /// Maximum simultaneous users before the node is considered overused.
    pub capacity: u32,
    /// Static base routing cost, used by the negotiated-congestion cost
    /// terms in §4.7.
    pub base_cost: f64,
    /// Wire length in grid units (`1` for pin nodes).
    pub length: u32,
    /// Per-unit-length linear delay, in picoseconds (wire nodes only; `0`
    /// for pin/source/sink nodes, whose delay is carried on the timing-graph
    /// edge instead).
    pub t_linear: f64,
    /// Outgoing edges: nodes reachable in one routing hop from this node.
    pub children: Vec<RrgNodeId>,
}

/// The routing resource graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rrg {
    nodes: Vec<RrgNode>,
    /// Average wire delay per unit distance, `Σ t_linear / Σ length` over
    /// all wire nodes. All wire base costs are rescaled against this value.
    pub base_cost_per_distance: f64,
}

impl Rrg {
    /// Returns the node with the given id.
    pub fn node(&self, id: RrgNodeId) -> &RrgNode {
        &self.nodes[id.index()]
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over all `(id, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (RrgNodeId, &RrgNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (RrgNodeId::from_raw(i as u32), n))
    }

    /// A cheap Manhattan-style lower bound on routing distance between two
    /// nodes, used by the router's directed-search heuristic (§4.7).
    pub fn expected_distance_to_target(&self, from: RrgNodeId, to: RrgNodeId) -> f64 {
        let a = self.node(from);
        let b = self.node(to);
        (a.x as f64 - b.x as f64).abs() + (a.y as f64 - b.y as f64).abs()
    }

    /// Builds the resource graph for the given device grid.
    ///
    /// Synthesizes one SOURCE/OPIN per output pin and one IPIN/SINK per
    /// input pin at every site, plus [`CHANNEL_WIDTH`] full-span CHANX/CHANY
    /// tracks per row/column. This is a deliberately simplified channel
    /// model (full-length tracks rather than segmented, switch-boxed wires)
    /// — adequate for the bounding-box-limited Dijkstra search in §4.7, not
    /// a faithful device-level routing fabric.
    pub fn build(grid: &Grid, pins_per_site: impl Fn(u32, u32) -> (u32, u32)) -> Rrg {
        let mut nodes = Vec::new();
        let mut chan_x = vec![[0u32; CHANNEL_WIDTH as usize]; grid.height as usize];
        let mut chan_y = vec![[0u32; CHANNEL_WIDTH as usize]; grid.width as usize];

        for y in 0..grid.height {
            for t in 0..CHANNEL_WIDTH {
                let id = nodes.len() as u32;
                chan_x[y as usize][t as usize] = id;
                nodes.push(RrgNode {
                    kind: NodeKind::ChanX,
                    x: 0,
                    y,
                    capacity: 1,
                    base_cost: 1.0,
                    length: grid.width,
                    t_linear: 5.0 * grid.width as f64,
                    children: Vec::new(),
                });
            }
        }
        for x in 0..grid.width {
            for t in 0..CHANNEL_WIDTH {
                let id = nodes.len() as u32;
                chan_y[x as usize][t as usize] = id;
                nodes.push(RrgNode {
                    kind: NodeKind::ChanY,
                    x,
                    y: 0,
                    capacity: 1,
                    base_cost: 1.0,
                    length: grid.height,
                    t_linear: 5.0 * grid.height as f64,
                    children: Vec::new(),
                });
            }
        }

        // Cross-link every channel track to every crossing track of the
        // perpendicular direction — the switch-box abstraction for this
        // simplified channel model.
        for y in 0..grid.height {
            for tx in 0..CHANNEL_WIDTH {
                let chanx_id = chan_x[y as usize][tx as usize];
                for x in 0..grid.width {
                    for ty in 0..CHANNEL_WIDTH {
                        let chany_id = chan_y[x as usize][ty as usize];
                        nodes[chanx_id as usize].children.push(RrgNodeId::from_raw(chany_id));
                        nodes[chany_id as usize].children.push(RrgNodeId::from_raw(chanx_id));
                    }
                }
            }
        }

        for site in grid.sites() {
            let (n_in, n_out) = pins_per_site(site.x, site.y);
            for p in 0..n_out {
                let source_id = nodes.len() as u32;
                nodes.push(RrgNode {
                    kind: NodeKind::Source,
                    x: site.x,
                    y: site.y,
                    capacity: 1,
                    base_cost: 0.0,
                    length: 1,
                    t_linear: 0.0,
                    children: Vec::new(),
                });
                let opin_id = nodes.len() as u32;
                let track = ((site.x + site.y + p) % CHANNEL_WIDTH) as usize;
                let reach = vec![
                    RrgNodeId::from_raw(chan_x[site.y as usize][track]),
                    RrgNodeId::from_raw(chan_y[site.x as usize][track]),
                ];
                nodes.push(RrgNode {
                    kind: NodeKind::Opin,
                    x: site.x,
                    y: site.y,
                    capacity: 1,
                    base_cost: 0.5,
                    length: 1,
                    t_linear: 0.0,
                    children: reach,
                });
                nodes[source_id as usize].children.push(RrgNodeId::from_raw(opin_id));
            }
            for p in 0..n_in {
                let sink_id = nodes.len() as u32;
                nodes.push(RrgNode {
                    kind: NodeKind::Sink,
                    x: site.x,
                    y: site.y,
                    capacity: 1,
                    base_cost: 0.0,
                    length: 1,
                    t_linear: 0.0,
                    children: Vec::new(),
                });
                let ipin_id = nodes.len() as u32;
                nodes.push(RrgNode {
                    kind: NodeKind::Ipin,
                    x: site.x,
                    y: site.y,
                    capacity: 1,
                    base_cost: IPIN_BASE_COST,
                    length: 1,
                    t_linear: 0.0,
                    children: vec![RrgNodeId::from_raw(sink_id)],
                });
                let track = ((site.x + site.y + p) % CHANNEL_WIDTH) as usize;
                nodes[chan_x[site.y as usize][track] as usize]
                    .children
                    .push(RrgNodeId::from_raw(ipin_id));
                nodes[chan_y[site.x as usize][track] as usize]
                    .children
                    .push(RrgNodeId::from_raw(ipin_id));
            }
        }

        let (sum_t_linear, sum_length) = nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::ChanX | NodeKind::ChanY))
            .fold((0.0, 0u64), |(t, l), n| (t + n.t_linear, l + n.length as u64));
        let base_cost_per_distance = if sum_length > 0 {
            sum_t_linear / sum_length as f64
        } else {
            0.0
        };
        for node in nodes.iter_mut() {
            if matches!(node.kind, NodeKind::ChanX | NodeKind::ChanY) {
                node.base_cost = base_cost_per_distance;
            }
        }

        Rrg {
            nodes,
            base_cost_per_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::BlockTypeId;

    fn small_grid() -> Grid {
        let io = BlockTypeId::from_raw(0);
        let clb = BlockTypeId::from_raw(1);
        Grid::build(4, 1, io, clb, &[])
    }

    #[test]
    fn build_produces_nonempty_graph() {
        let grid = small_grid();
        let rrg = Rrg::build(&grid, |_, _| (1, 1));
        assert!(!rrg.is_empty());
    }

    #[test]
    fn every_source_has_an_opin_child() {
        let grid = small_grid();
        let rrg = Rrg::build(&grid, |_, _| (1, 1));
        for (_, node) in rrg.iter() {
            if node.kind == NodeKind::Source {
                assert_eq!(node.children.len(), 1);
                let child = rrg.node(node.children[0]);
                assert_eq!(child.kind, NodeKind::Opin);
            }
        }
    }

    #[test]
    fn every_ipin_has_unique_sink_child() {
        let grid = small_grid();
        let rrg = Rrg::build(&grid, |_, _| (1, 1));
        for (_, node) in rrg.iter() {
            if node.kind == NodeKind::Ipin {
                assert_eq!(node.children.len(), 1);
                assert_eq!(rrg.node(node.children[0]).kind, NodeKind::Sink);
            }
        }
    }

    #[test]
    fn base_cost_per_distance_is_positive() {
        let grid = small_grid();
        let rrg = Rrg::build(&grid, |_, _| (1, 1));
        assert!(rrg.base_cost_per_distance > 0.0);
    }

    #[test]
    fn wire_nodes_rescaled_to_average() {
        let grid = small_grid();
        let rrg = Rrg::build(&grid, |_, _| (1, 1));
        for (_, node) in rrg.iter() {
            if matches!(node.kind, NodeKind::ChanX | NodeKind::ChanY) {
                assert_eq!(node.base_cost, rrg.base_cost_per_distance);
            }
        }
    }

    #[test]
    fn expected_distance_is_manhattan() {
        let grid = small_grid();
        let rrg = Rrg::build(&grid, |_, _| (1, 1));
        let (a_id, _) = rrg.iter().find(|(_, n)| n.kind == NodeKind::Source).unwrap();
        let (b_id, _) = rrg.iter().find(|(_, n)| n.kind == NodeKind::Sink).unwrap();
        let d = rrg.expected_distance_to_target(a_id, b_id);
        assert!(d >= 0.0);
    }
}
