//! Arrival/required-time propagation, slack, criticality, and the timing
//! cost surrogate used to steer the connection router (§4.1).

use crate::graph::TimingGraph;
use crate::ids::TimingNodeId;

/// Per-vertex arrival and required times from the last analysis pass.
#[derive(Debug, Clone)]
pub struct TimingTimes {
    /// Arrival time at each vertex, indexed by [`TimingNodeId`].
    pub arrival_ps: Vec<f64>,
    /// Required time at each vertex, indexed by [`TimingNodeId`].
    pub required_ps: Vec<f64>,
}

impl TimingTimes {
    /// Arrival time at `node`.
    pub fn arrival(&self, node: TimingNodeId) -> f64 {
        self.arrival_ps[node.index()]
    }

    /// Required time at `node`.
    pub fn required(&self, node: TimingNodeId) -> f64 {
        self.required_ps[node.index()]
    }
}

/// `calculateArrivalAndRequiredTimes()` — two linear passes in topological
/// / reverse-topological order.
///
/// Arrival at a source (no incoming edges) is `0`. Required at a sink (no
/// outgoing edges) is the max arrival over all sinks (i.e. every endpoint
/// shares the same required time, matching a single-clock-domain design
/// with no external timing constraints) — equivalently, backward
/// propagation seeds every sink with `maxDelay()` of the full forward pass.
pub fn calculate_arrival_and_required_times(graph: &mut TimingGraph) -> talus_common::TalusResult<TimingTimes> {
    let order = graph.topological_order()?.to_vec();
    let n = graph.node_count();
    let mut arrival = vec![0.0; n];
    for &node in &order {
        for &edge_id in graph.incoming(node) {
            let edge = graph.edge(edge_id);
            let candidate = arrival[edge.src.index()] + edge.delay_ps;
            if candidate > arrival[node.index()] {
                arrival[node.index()] = candidate;
            }
        }
    }

    let max_delay = arrival
        .iter()
        .enumerate()
        .filter(|&(i, _)| graph.outgoing(TimingNodeId::from_raw(i as u32)).is_empty())
        .map(|(_, &a)| a)
        .fold(0.0_f64, f64::max);

    let mut required = vec![max_delay; n];
    for &node in order.iter().rev() {
        if !graph.outgoing(node).is_empty() {
            let mut min_required = f64::INFINITY;
            for &edge_id in graph.outgoing(node) {
                let edge = graph.edge(edge_id);
                let candidate = required[edge.dst.index()] - edge.delay_ps;
                if candidate < min_required {
                    min_required = candidate;
                }
            }
            required[node.index()] = min_required;
        }
    }

    for edge_id in graph.edge_ids() {
        let (src, dst, delay) = {
            let e = graph.edge(edge_id);
            (e.src, e.dst, e.delay_ps)
        };
        let slack = required[dst.index()] - arrival[src.index()] - delay;
        graph.edge_mut(edge_id).slack_ps = slack;
    }

    Ok(TimingTimes {
        arrival_ps: arrival,
        required_ps: required,
    })
}

/// `maxDelay()` = max arrival at any sink.
pub fn max_delay(graph: &TimingGraph, times: &TimingTimes) -> f64 {
    (0..graph.node_count())
        .filter(|&i| graph.outgoing(TimingNodeId::from_raw(i as u32)).is_empty())
        .map(|i| times.arrival_ps[i])
        .fold(0.0_f64, f64::max)
}

/// `calculateConnectionCriticality(maxCrit, exp)` — per edge:
/// `crit = min(maxCrit, (1 - slack/maxDelay)^exp)`.
///
/// `maxDelay` of `0` (empty or zero-latency graph) maps every edge to
/// criticality `0` rather than dividing by zero.
pub fn calculate_connection_criticality(graph: &mut TimingGraph, max_delay_ps: f64, max_crit: f64, exp: f64) {
    for edge_id in graph.edge_ids() {
        let slack = graph.edge(edge_id).slack_ps;
        let crit = if max_delay_ps > 0.0 {
            let raw = (1.0 - slack / max_delay_ps).max(0.0).powf(exp);
            raw.min(max_crit)
        } else {
            0.0
        };
        graph.edge_mut(edge_id).criticality = crit;
    }
}

/// `calculateTotalCost()` = Σ over edges of `delay × crit`.
pub fn calculate_total_cost(graph: &TimingGraph) -> f64 {
    graph
        .edge_ids()
        .map(|id| {
            let e = graph.edge(id);
            e.delay_ps * e.criticality
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TimingEdgeKind;

    fn chain_graph() -> TimingGraph {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".to_string());
        let b = g.add_node("b".to_string());
        let c = g.add_node("c".to_string());
        g.add_edge(a, b, 100.0, TimingEdgeKind::IntraBlock);
        g.add_edge(b, c, 200.0, TimingEdgeKind::Wire);
        g
    }

    #[test]
    fn arrival_propagates_through_chain() {
        let mut g = chain_graph();
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        let nodes: Vec<TimingNodeId> = (0..3).map(|i| TimingNodeId::from_raw(i)).collect();
        assert_eq!(times.arrival(nodes[0]), 0.0);
        assert_eq!(times.arrival(nodes[1]), 100.0);
        assert_eq!(times.arrival(nodes[2]), 300.0);
    }

    #[test]
    fn required_equals_max_delay_at_sink() {
        let mut g = chain_graph();
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        let sink = TimingNodeId::from_raw(2);
        assert_eq!(times.required(sink), 300.0);
    }

    #[test]
    fn slack_is_zero_on_the_critical_path() {
        let mut g = chain_graph();
        calculate_arrival_and_required_times(&mut g).unwrap();
        for id in g.edge_ids() {
            assert!((g.edge(id).slack_ps).abs() < 1e-9);
        }
    }

    #[test]
    fn max_delay_matches_longest_path() {
        let mut g = chain_graph();
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        assert_eq!(max_delay(&g, &times), 300.0);
    }

    #[test]
    fn criticality_is_one_on_critical_path() {
        let mut g = chain_graph();
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        let md = max_delay(&g, &times);
        calculate_connection_criticality(&mut g, md, 0.99, 1.0);
        for id in g.edge_ids() {
            assert!((g.edge(id).criticality - 0.99).abs() < 1e-9);
        }
    }

    #[test]
    fn criticality_is_bounded_by_max_crit() {
        let mut g = chain_graph();
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        let md = max_delay(&g, &times);
        calculate_connection_criticality(&mut g, md, 0.5, 1.0);
        for id in g.edge_ids() {
            assert!(g.edge(id).criticality <= 0.5 + 1e-9);
        }
    }

    #[test]
    fn total_cost_sums_delay_times_criticality() {
        let mut g = chain_graph();
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        let md = max_delay(&g, &times);
        calculate_connection_criticality(&mut g, md, 1.0, 1.0);
        let cost = calculate_total_cost(&g);
        assert!((cost - 300.0).abs() < 1e-6);
    }

    #[test]
    fn repeated_analysis_is_deterministic() {
        let mut g = chain_graph();
        let first = calculate_arrival_and_required_times(&mut g).unwrap();
        let second = calculate_arrival_and_required_times(&mut g).unwrap();
        assert_eq!(first.arrival_ps, second.arrival_ps);
        assert_eq!(first.required_ps, second.required_ps);
    }

    #[test]
    fn diverging_net_required_times_take_the_min() {
        // a -> b -> d (long), a -> c -> d (short): d's required constrains b via the long path.
        let mut g = TimingGraph::new();
        let a = g.add_node("a".to_string());
        let b = g.add_node("b".to_string());
        let c = g.add_node("c".to_string());
        let d = g.add_node("d".to_string());
        g.add_edge(a, b, 50.0, TimingEdgeKind::IntraBlock);
        g.add_edge(b, d, 250.0, TimingEdgeKind::Wire);
        g.add_edge(a, c, 50.0, TimingEdgeKind::IntraBlock);
        g.add_edge(c, d, 50.0, TimingEdgeKind::Wire);
        let times = calculate_arrival_and_required_times(&mut g).unwrap();
        assert_eq!(times.arrival(d), 300.0);
        // c->d has slack: required(d) - arrival(c) - delay = 300 - 50 - 50 = 200
        let c_to_d = g.edge_ids().find(|&id| g.edge(id).src == c).unwrap();
        assert!((g.edge(c_to_d).slack_ps - 200.0).abs() < 1e-9);
    }
}
