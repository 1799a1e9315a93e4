//! Negotiated-congestion connection router (§4.7): a PathFinder-style
//! Dijkstra search per connection, with present/historical congestion costs
//! that let overused nodes be shared temporarily and negotiated apart over
//! several iterations.
//!
//! Simplifications, documented rather than silently dropped: this resource
//! graph gives every output pin exactly one static SOURCE -> OPIN edge
//! (§ architecture note in [`talus_arch::rrg`]), so there is no OPIN choice
//! left to make — `fix_opins` is accepted for config compatibility and has
//! no effect. The reroute-criticality threshold that limits how many
//! connections get revisited per iteration is a simplified linear ramp
//! rather than VPR's adaptive percentage search.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use talus_arch::ids::RrgNodeId;
use talus_arch::{ArchitectureContext, NodeKind, Rrg, IPIN_BASE_COST};
use talus_common::PnrError;
use talus_config::RouterConfig;

use crate::circuit::Circuit;
use crate::timing_bridge;

use super::rrg_map;
use crate::timing_bridge::PinKey;

/// Bias-cost weight (`β` in §4.7).
const BIAS_BETA: f64 = 0.5;

/// Source-sharing divisor constant (`k` in §4.7's `nodeCost`).
const SOURCE_SHARING_K: f64 = 10.0;

/// Per-node congestion state. Occupancy is tracked as a multiset of driving
/// sources rather than a raw use count: every connection of a net shares
/// that net's SOURCE/OPIN nodes, so two sinks of the same net routing
/// through their shared OPIN must count as *one* occupant there, not two —
/// congestion is about how many distinct nets contend for a node, not how
/// many connections happen to pass through it.
struct NodeState {
    /// Driving-source RRG node -> number of this node's connections
    /// currently routed through here from that source.
    sources: HashMap<RrgNodeId, u32>,
    /// Historical congestion cost, starts at 1 and only grows (§4.7 step 5).
    acc_cost: f64,
}

impl NodeState {
    fn unique_sources(&self) -> u32 {
        self.sources.len() as u32
    }
}

#[derive(PartialEq)]
struct HeapEntry {
    cost: f64,
    node: RrgNodeId,
}

impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The net's inflated bounding box: wire children outside it are not
/// expanded (§4.7's bounding-box search limit).
struct BbLimits {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
}

impl BbLimits {
    fn from_net(circuit: &Circuit, net: crate::ids::NetId, margin: f64) -> Self {
        let bb = circuit.net_bounding_box(net);
        Self {
            xmin: bb.xmin - margin,
            xmax: bb.xmax + margin,
            ymin: bb.ymin - margin,
            ymax: bb.ymax + margin,
        }
    }

    fn x_in_range(&self, x: u32) -> bool {
        (x as f64) >= self.xmin && (x as f64) <= self.xmax
    }

    fn y_in_range(&self, y: u32) -> bool {
        (y as f64) >= self.ymin && (y as f64) <= self.ymax
    }
}

/// The net-level quantities `biasCost` needs: its geometric center, fanout,
/// and half-perimeter wirelength.
struct NetBias {
    fanout: usize,
    center_x: f64,
    center_y: f64,
    hpwl: f64,
}

impl NetBias {
    fn from_net(circuit: &Circuit, net: &crate::circuit::Net) -> Self {
        let bb = circuit.net_bounding_box(net.id);
        Self {
            fanout: net.fanout().max(1),
            center_x: (bb.xmin + bb.xmax) / 2.0,
            center_y: (bb.ymin + bb.ymax) / 2.0,
            hpwl: bb.half_perimeter(),
        }
    }
}

/// `pres_cost` for `node`, given the connection's driving `source`.
///
/// If `source` already occupies this node (the common case for a shared
/// SOURCE/OPIN on a multi-fanout net), traversing it again isn't a *new*
/// contender for the node, so the short-circuit form skips the prospective
/// `+1` bump the ordinary formula applies for a first-time user (§4.7).
fn pres_cost(state: &NodeState, capacity: u32, pres_fac: f64, source: RrgNodeId) -> f64 {
    let unique = state.unique_sources();
    if state.sources.contains_key(&source) {
        (1.0 + (unique as f64 - capacity as f64) * pres_fac).max(1.0)
    } else if unique >= capacity {
        1.0 + (unique + 1 - capacity) as f64 * pres_fac
    } else {
        1.0
    }
}

/// `nodeCost` (§4.7): base cost scaled by historical/present congestion,
/// discounted by how much the connection's own net already shares this
/// node, plus a small pull toward the net's geometric center.
fn node_cost(rrg: &Rrg, states: &[NodeState], node: RrgNodeId, source: RrgNodeId, pres_fac: f64, bias: &NetBias) -> f64 {
    let n = rrg.node(node);
    let state = &states[node.index()];
    let source_uses = state.sources.get(&source).copied().unwrap_or(0) as f64;
    let pres = pres_cost(state, n.capacity, pres_fac, source);
    let bias_cost = if bias.hpwl > 1e-9 {
        BIAS_BETA * n.base_cost / bias.fanout as f64 * ((n.x as f64 - bias.center_x).abs() + (n.y as f64 - bias.center_y).abs()) / bias.hpwl
    } else {
        0.0
    };
    n.base_cost * state.acc_cost * pres / (1.0 + SOURCE_SHARING_K * source_uses) + bias_cost
}

/// Finds the lowest-cost path from `source` to `sink`: PathFinder's
/// timing-driven directed search, blending `nodeCost` (congestion) and
/// `nodeDelay` (the child's own linear delay) by `criticality`, and
/// weighting the distance-to-target heuristic by `alpha_wld`/`alpha_td`
/// blended the same way (§4.7).
fn route_one(
    rrg: &Rrg,
    states: &[NodeState],
    source: RrgNodeId,
    sink: RrgNodeId,
    criticality: f64,
    config: &RouterConfig,
    pres_fac: f64,
    bb: &BbLimits,
    bias: &NetBias,
) -> Option<Vec<RrgNodeId>> {
    let n = rrg.len();
    let mut best_cost = vec![f64::INFINITY; n];
    let mut prev = vec![None; n];
    let mut heap = BinaryHeap::new();

    best_cost[source.index()] = 0.0;
    heap.push(HeapEntry { cost: 0.0, node: source });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if cost > best_cost[node.index()] {
            continue;
        }
        if node == sink {
            break;
        }
        for &child in &rrg.node(node).children {
            let child_node = rrg.node(child);
            match child_node.kind {
                // Only search channel tracks within the net's (inflated)
                // bounding box — the normative search-space limit, not an
                // optimization (§4.7).
                NodeKind::ChanX => {
                    if !bb.y_in_range(child_node.y) {
                        continue;
                    }
                }
                NodeKind::ChanY => {
                    if !bb.x_in_range(child_node.x) {
                        continue;
                    }
                }
                // This RRG gives every OPIN exactly one static reach per
                // track, so the "net's bound OPIN" rule never excludes
                // anything here; kept as a documented no-op.
                NodeKind::Opin => {}
                // Only expand an IPIN whose unique SINK child is the
                // connection's actual target.
                NodeKind::Ipin => {
                    if child_node.children.first().copied() != Some(sink) {
                        continue;
                    }
                }
                NodeKind::Source | NodeKind::Sink => {}
            }

            let node_c = node_cost(rrg, states, child, source, pres_fac, bias);
            let new_cost = cost + (1.0 - criticality) * node_c + criticality * child_node.t_linear;
            if new_cost < best_cost[child.index()] {
                best_cost[child.index()] = new_cost;
                prev[child.index()] = Some(node);
                let h = match child_node.kind {
                    NodeKind::ChanX | NodeKind::ChanY => {
                        let distance = rrg.expected_distance_to_target(child, sink);
                        let source_uses = states[child.index()].sources.get(&source).copied().unwrap_or(0) as f64;
                        config.alpha_wld * (1.0 - criticality) * (distance * rrg.base_cost_per_distance / (1.0 + source_uses) + IPIN_BASE_COST)
                            + config.alpha_td * criticality * distance * rrg.base_cost_per_distance
                    }
                    _ => 0.0,
                };
                heap.push(HeapEntry { cost: new_cost + h, node: child });
            }
        }
    }

    if best_cost[sink.index()].is_infinite() {
        return None;
    }

    let mut path = vec![sink];
    let mut cur = sink;
    while let Some(p) = prev[cur.index()] {
        path.push(p);
        cur = p;
    }
    path.reverse();
    Some(path)
}

fn release_route(states: &mut [NodeState], route: &[u32], source: RrgNodeId) {
    for &raw in route {
        let state = &mut states[raw as usize];
        if let Some(count) = state.sources.get_mut(&source) {
            *count -= 1;
            if *count == 0 {
                state.sources.remove(&source);
            }
        }
    }
}

fn occupy_route(states: &mut [NodeState], route: &[RrgNodeId], source: RrgNodeId) {
    for &node in route {
        *states[node.index()].sources.entry(source).or_insert(0) += 1;
    }
}

fn overused_count(states: &[NodeState], rrg: &Rrg) -> usize {
    (0..states.len())
        .filter(|&i| states[i].unique_sources() > rrg.node(RrgNodeId::from_raw(i as u32)).capacity)
        .count()
}

/// Routes every connection in `circuit`, mutating each [`crate::circuit::Connection::route`]
/// in place.
///
/// # Errors
/// `PnrError::RouterUnreachableSink` if a connection's sink is unreachable
/// from its driver on the resource graph (a topology bug, not congestion).
/// `PnrError::RoutingNotConverged` if `config.max_trials` is exhausted with
/// nodes still overused — the last routing found is still applied to
/// `circuit` and is usable, just not congestion-free.
pub fn route(circuit: &mut Circuit, arch: &ArchitectureContext, device_size: u32, config: &RouterConfig) -> Result<(), PnrError> {
    let grid = arch.build_grid(device_size)?;
    let rrg = Rrg::build(&grid, rrg_map::pins_per_site(circuit));
    let pin_nodes = rrg_map::build_pin_node_map(circuit, &grid, &rrg);

    let mut states: Vec<NodeState> = (0..rrg.len()).map(|_| NodeState { sources: HashMap::new(), acc_cost: 1.0 }).collect();
    let mut pres_fac = config.pres_fac_initial;

    let per_unit_delay = rrg.base_cost_per_distance.max(1e-6);
    let mut bridge = timing_bridge::build_timing_graph(circuit, arch, per_unit_delay);

    for iteration in 0..config.max_trials {
        let reroute_threshold = if config.timing_driven {
            (1.0 - (iteration as f64 / config.max_trials as f64) * config.max_percentage_critical_connections).clamp(0.0, 1.0)
        } else {
            f64::INFINITY
        };

        for net in circuit.nets.clone() {
            let driver_pin = driver_pin_key(circuit, net.driver, net.id);
            let Some(source) = pin_nodes.source_of(driver_pin) else { continue };
            let bb = BbLimits::from_net(circuit, net.id, config.bb_factor);
            let bias = NetBias::from_net(circuit, &net);

            for &conn_id in &net.connections {
                let needs_route = {
                    let conn = circuit.connection(conn_id);
                    iteration == 0 || !conn.is_routed() || conn.criticality >= reroute_threshold || route_touches_overused(&states, &rrg, &conn.route)
                };
                if !needs_route {
                    continue;
                }

                let sink_block = circuit.connection(conn_id).sink;
                let sink_pin = sink_pin_key(circuit, sink_block, net.id);
                let Some(sink) = pin_nodes.sink_of(sink_pin) else {
                    return Err(PnrError::RouterUnreachableSink {
                        connection: format!("{}.{} -> {}", circuit.block(net.driver).name, net.name, circuit.block(sink_block).name),
                        message: "sink pin has no SINK node".to_string(),
                    });
                };

                let old_route = circuit.connection(conn_id).route.clone();
                release_route(&mut states, &old_route, source);

                let criticality = circuit.connection(conn_id).criticality;
                let path = route_one(&rrg, &states, source, sink, criticality, config, pres_fac, &bb, &bias).ok_or_else(|| PnrError::RouterUnreachableSink {
                    connection: format!("{}.{} -> {}", circuit.block(net.driver).name, net.name, circuit.block(sink_block).name),
                    message: "search frontier exhausted before reaching the sink".to_string(),
                })?;

                occupy_route(&mut states, &path, source);
                circuit.connection_mut(conn_id).route = path.iter().map(|n| n.as_raw()).collect();
            }
        }

        timing_bridge::refresh_wire_delays(&mut bridge, circuit, &rrg, per_unit_delay);
        if config.timing_driven {
            timing_bridge::update_criticalities(&mut bridge, circuit, 0.99, 1.0)
                .map_err(|e| PnrError::ArchitectureInconsistency(e.to_string()))?;
        }

        let overused = overused_count(&states, &rrg);
        if overused == 0 {
            return Ok(());
        }

        // §4.7 step 5: a single pres_fac bump per (invalid) iteration, not
        // per overused node — otherwise the ramp depends on how many nodes
        // happen to be overused this iteration instead of how many
        // iterations have elapsed.
        pres_fac *= config.pres_fac_mult;

        for (i, state) in states.iter_mut().enumerate() {
            let capacity = rrg.node(RrgNodeId::from_raw(i as u32)).capacity;
            let unique = state.unique_sources();
            if unique > capacity {
                state.acc_cost += (unique - capacity) as f64 * config.acc_fac;
            }
        }
    }

    let overused = overused_count(&states, &rrg);
    if overused > 0 {
        Err(PnrError::RoutingNotConverged { max_trials: config.max_trials, overused_nodes: overused })
    } else {
        Ok(())
    }
}

fn route_touches_overused(states: &[NodeState], rrg: &Rrg, route: &[u32]) -> bool {
    route.iter().any(|&raw| {
        let capacity = rrg.node(RrgNodeId::from_raw(raw)).capacity;
        states[raw as usize].unique_sources() > capacity
    })
}

fn driver_pin_key(circuit: &Circuit, block: crate::ids::GlobalBlockId, net: crate::ids::NetId) -> PinKey {
    let b = circuit.block(block);
    let index = b.outputs.iter().position(|p| p.net == Some(net)).expect("driver must have a bound output pin");
    PinKey { block, is_output: true, index }
}

fn sink_pin_key(circuit: &Circuit, block: crate::ids::GlobalBlockId, net: crate::ids::NetId) -> PinKey {
    let b = circuit.block(block);
    let index = b.inputs.iter().position(|p| p.net == Some(net)).expect("sink must have a bound input pin");
    PinKey { block, is_output: false, index }
}
