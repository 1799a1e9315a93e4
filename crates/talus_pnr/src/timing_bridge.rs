//! Bridges circuit + architecture state into a [`TimingGraph`] (§4.1).
//!
//! One [`TimingNode`](talus_timing::TimingNode) per primitive pin. Intra-block
//! edges carry the architecture's fixed pin-to-pin delays; inter-block (net)
//! edges carry a placement estimate before routing and the routed path's
//! summed `t_linear` after — `refresh_wire_delays` switches between the two
//! depending on whether a connection already has a route.
//!
//! Sequential (`clocked`) block types break the combinational path: their
//! output pins are fed from a single synthetic launch node (delay =
//! `clock_setup_time`, `0` if undeclared) instead of from their own inputs,
//! and their input pins carry no outgoing edges, making them STA endpoints
//! the same way combinational sinks are (§4.1's single-clock-domain model).

use std::collections::HashMap;

use talus_arch::{ArchitectureContext, Rrg};
use talus_common::TalusResult;
use talus_timing::{TimingEdgeId, TimingEdgeKind, TimingGraph, TimingNodeId};

use crate::circuit::Circuit;
use crate::ids::{ConnectionId, GlobalBlockId};

/// Identifies one primitive pin: a block, whether it's an output, and its
/// index into that block's `inputs`/`outputs` vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinKey {
    /// Owning block.
    pub block: GlobalBlockId,
    /// `true` for an output pin, `false` for an input pin.
    pub is_output: bool,
    /// Index into the block's `inputs` or `outputs` vector.
    pub index: usize,
}

/// The timing graph plus the lookups needed to keep it in sync with the
/// circuit as placement and routing refine it.
pub struct TimingBridge {
    /// The underlying timing graph.
    pub graph: TimingGraph,
    pin_node: HashMap<PinKey, TimingNodeId>,
    /// One entry per connection: the wire edge carrying that connection's
    /// delay, and the sink pin it targets (for `route`-based delay lookups).
    connection_edge: HashMap<ConnectionId, TimingEdgeId>,
}

impl TimingBridge {
    /// Looks up the timing-graph node for a pin, if one was created (pins
    /// left unconnected to any net still get a node, since every declared
    /// pin is materialized).
    pub fn node_for(&self, pin: PinKey) -> Option<TimingNodeId> {
        self.pin_node.get(&pin).copied()
    }

    /// Looks up the wire edge carrying a connection's delay.
    pub fn edge_for_connection(&self, connection: ConnectionId) -> Option<TimingEdgeId> {
        self.connection_edge.get(&connection).copied()
    }
}

/// Builds a fresh [`TimingBridge`] from the current circuit and architecture.
///
/// Wire edges are seeded with the placement-estimated delay (§4.1); call
/// [`refresh_wire_delays`] after placement changes or routing completes to
/// keep them current.
pub fn build_timing_graph(circuit: &Circuit, arch: &ArchitectureContext, wire_delay_per_unit: f64) -> TimingBridge {
    let mut graph = TimingGraph::new();
    let mut pin_node = HashMap::new();

    for block in &circuit.blocks {
        for (i, pin) in block.inputs.iter().enumerate() {
            let node = graph.add_node(format!("{}.{}", block.name, pin.port));
            pin_node.insert(PinKey { block: block.id, is_output: false, index: i }, node);
        }
        for (i, pin) in block.outputs.iter().enumerate() {
            let node = graph.add_node(format!("{}.{}", block.name, pin.port));
            pin_node.insert(PinKey { block: block.id, is_output: true, index: i }, node);
        }
    }

    let mut launch_node = None;
    for block in &circuit.blocks {
        let bt = arch.block_type(block.block_type);
        if bt.clocked {
            let launch = *launch_node.get_or_insert_with(|| graph.add_node("clock_launch".to_string()));
            let setup = arch.clock_setup_time().unwrap_or(0.0);
            for (i, _) in block.outputs.iter().enumerate() {
                let out_node = pin_node[&PinKey { block: block.id, is_output: true, index: i }];
                graph.add_edge(launch, out_node, setup, TimingEdgeKind::IntraBlock);
            }
        } else {
            for (oi, out_pin) in block.outputs.iter().enumerate() {
                let out_node = pin_node[&PinKey { block: block.id, is_output: true, index: oi }];
                for (ii, in_pin) in block.inputs.iter().enumerate() {
                    let in_node = pin_node[&PinKey { block: block.id, is_output: false, index: ii }];
                    let delay = arch
                        .pin_to_pin_delay(&bt.name, &in_pin.port, &bt.name, &out_pin.port)
                        .unwrap_or(0.0);
                    graph.add_edge(in_node, out_node, delay, TimingEdgeKind::IntraBlock);
                }
            }
        }
    }

    let mut connection_edge = HashMap::new();
    for net in &circuit.nets {
        let driver = circuit.block(net.driver);
        let (driver_pin_idx, _) = driver
            .outputs
            .iter()
            .enumerate()
            .find(|(_, p)| p.net == Some(net.id))
            .expect("net driver must have a bound output pin");
        let driver_node = pin_node[&PinKey { block: net.driver, is_output: true, index: driver_pin_idx }];

        for &conn_id in &net.connections {
            let conn = circuit.connection(conn_id);
            let sink = circuit.block(conn.sink);
            let (sink_pin_idx, _) = sink
                .inputs
                .iter()
                .enumerate()
                .find(|(_, p)| p.net == Some(net.id))
                .expect("connection sink must have a bound input pin");
            let sink_node = pin_node[&PinKey { block: conn.sink, is_output: false, index: sink_pin_idx }];

            let delay = placement_estimated_delay(circuit, net.driver, conn.sink, wire_delay_per_unit);
            let edge = graph.add_edge(driver_node, sink_node, delay, TimingEdgeKind::Wire);
            connection_edge.insert(conn_id, edge);
        }
    }

    TimingBridge { graph, pin_node, connection_edge }
}

/// Recomputes every wire edge's delay: the routed path's summed `t_linear`
/// if the connection has a route, otherwise the placement estimate.
pub fn refresh_wire_delays(bridge: &mut TimingBridge, circuit: &Circuit, rrg: &Rrg, wire_delay_per_unit: f64) {
    for net in &circuit.nets {
        for &conn_id in &net.connections {
            let conn = circuit.connection(conn_id);
            let Some(&edge_id) = bridge.connection_edge.get(&conn_id) else { continue };
            let delay = if conn.is_routed() {
                actual_wire_delay(rrg, conn)
            } else {
                placement_estimated_delay(circuit, net.driver, conn.sink, wire_delay_per_unit)
            };
            bridge.graph.edge_mut(edge_id).delay_ps = delay;
        }
    }
}

/// `calculatePlacementEstimatedWireDelay()`: Manhattan distance between the
/// driver and sink sites, scaled by a per-unit-distance delay.
fn placement_estimated_delay(circuit: &Circuit, driver: GlobalBlockId, sink: GlobalBlockId, per_unit_delay: f64) -> f64 {
    let (dx, dy) = coords(circuit, driver);
    let (sx, sy) = coords(circuit, sink);
    ((dx - sx).abs() + (dy - sy).abs()) * per_unit_delay
}

fn coords(circuit: &Circuit, block: GlobalBlockId) -> (f64, f64) {
    let b = circuit.block(block);
    match b.site {
        Some(s) => (s.x as f64, s.y as f64),
        None => b.continuous,
    }
}

/// `calculateActualWireDelay()`: sum of `t_linear` over the routed path's
/// wire-segment nodes.
fn actual_wire_delay(rrg: &Rrg, connection: &crate::circuit::Connection) -> f64 {
    connection
        .route
        .iter()
        .map(|&raw| rrg.node(talus_arch::ids::RrgNodeId::from_raw(raw)).t_linear)
        .sum()
}

/// Runs the full arrival/required/criticality pass and writes per-connection
/// criticality back onto `circuit` (§4.1/§4.7: the router reads
/// `Connection::criticality` directly).
pub fn update_criticalities(bridge: &mut TimingBridge, circuit: &mut Circuit, max_crit: f64, crit_exponent: f64) -> TalusResult<f64> {
    let times = talus_timing::calculate_arrival_and_required_times(&mut bridge.graph)?;
    let max_delay = talus_timing::max_delay(&bridge.graph, &times);
    talus_timing::calculate_connection_criticality(&mut bridge.graph, max_delay, max_crit, crit_exponent);

    for net in &circuit.nets {
        for &conn_id in &net.connections {
            if let Some(&edge_id) = bridge.connection_edge.get(&conn_id) {
                let crit = bridge.graph.edge(edge_id).criticality;
                circuit.connection_mut(conn_id).criticality = crit;
            }
        }
    }
    Ok(max_delay)
}
