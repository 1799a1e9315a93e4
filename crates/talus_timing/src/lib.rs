//! Timing graph and static timing analysis for the Talus placement/routing
//! toolchain.
//!
//! The graph is device-independent: vertices are primitive pins, edges
//! carry delays (fixed intra-block delays from the architecture delay
//! table, or mutable inter-block wire delays recomputed from placement or
//! routing). [`sta`] computes arrival/required times, per-edge slack, and
//! connection criticality in one topological pass each way (§4.1).
//!
//! # Usage
//!
//! ```
//! use talus_timing::{calculate_arrival_and_required_times, calculate_connection_criticality, max_delay, TimingEdgeKind, TimingGraph};
//!
//! let mut graph = TimingGraph::new();
//! let a = graph.add_node("a".to_string());
//! let b = graph.add_node("b".to_string());
//! graph.add_edge(a, b, 120.0, TimingEdgeKind::Wire);
//!
//! let times = calculate_arrival_and_required_times(&mut graph).unwrap();
//! let md = max_delay(&graph, &times);
//! calculate_connection_criticality(&mut graph, md, 0.99, 1.0);
//! ```

#![warn(missing_docs)]

pub mod graph;
pub mod ids;
pub mod sta;

pub use graph::{TimingEdge, TimingEdgeKind, TimingGraph, TimingNode};
pub use ids::{TimingEdgeId, TimingNodeId};
pub use sta::{
    calculate_arrival_and_required_times, calculate_connection_criticality, calculate_total_cost,
    max_delay, TimingTimes,
};
