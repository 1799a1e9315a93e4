//! Maps circuit block pins onto routing-resource-graph nodes.
//!
//! [`talus_arch::Rrg::build`] synthesizes one SOURCE/OPIN pair per output pin
//! and one SINK/IPIN pair per input pin at every site, in the exact order
//! `pins_per_site` reports them and sites are visited (`Grid::sites()`'s
//! row-major order). This module supplies that `pins_per_site` closure from
//! the circuit's actual site occupancy and then replays the same
//! enumeration to recover which node id belongs to which pin — the RRG
//! itself carries no pin identity, only `(x, y, kind)`.

use std::collections::HashMap;

use talus_arch::ids::RrgNodeId;
use talus_arch::types::Grid;
use talus_arch::{NodeKind, Rrg};

use crate::circuit::{Circuit, GlobalBlock};
use crate::timing_bridge::PinKey;

/// Blocks currently assigned to `(x, y)`, ordered by sub-slot — the same
/// order [`pins_per_site`] and [`build_pin_node_map`] must agree on.
fn site_occupants(circuit: &Circuit, x: u32, y: u32) -> Vec<&GlobalBlock> {
    let mut occ: Vec<&GlobalBlock> = circuit
        .blocks
        .iter()
        .filter(|b| b.site.is_some_and(|s| s.x == x && s.y == y))
        .collect();
    occ.sort_by_key(|b| b.site.unwrap().subblock);
    occ
}

/// Builds the `(n_in, n_out)` closure [`talus_arch::Rrg::build`] needs,
/// aggregating pin counts over every block sharing a site (IO capacity > 1).
pub fn pins_per_site(circuit: &Circuit) -> impl Fn(u32, u32) -> (u32, u32) + '_ {
    move |x, y| {
        let occ = site_occupants(circuit, x, y);
        let n_in: u32 = occ.iter().map(|b| b.inputs.len() as u32).sum();
        let n_out: u32 = occ.iter().map(|b| b.outputs.len() as u32).sum();
        (n_in, n_out)
    }
}

/// Pin -> RRG node lookup: output pins map to their SOURCE node (the route's
/// start), input pins to their SINK node (the route's target).
pub struct PinNodeMap {
    source: HashMap<PinKey, RrgNodeId>,
    sink: HashMap<PinKey, RrgNodeId>,
}

impl PinNodeMap {
    /// The SOURCE node for an output pin.
    pub fn source_of(&self, key: PinKey) -> Option<RrgNodeId> {
        self.source.get(&key).copied()
    }

    /// The SINK node for an input pin.
    pub fn sink_of(&self, key: PinKey) -> Option<RrgNodeId> {
        self.sink.get(&key).copied()
    }
}

/// Recovers the pin <-> node correspondence for an [`Rrg`] built from `grid`
/// via [`pins_per_site`] over the same `circuit`.
pub fn build_pin_node_map(circuit: &Circuit, grid: &Grid, rrg: &Rrg) -> PinNodeMap {
    let channel_count = rrg
        .iter()
        .take_while(|(_, n)| matches!(n.kind, NodeKind::ChanX | NodeKind::ChanY))
        .count() as u32;

    let mut cursor = channel_count;
    let mut source = HashMap::new();
    let mut sink = HashMap::new();

    for site in grid.sites() {
        let occ = site_occupants(circuit, site.x, site.y);
        for b in &occ {
            for (oi, _) in b.outputs.iter().enumerate() {
                source.insert(PinKey { block: b.id, is_output: true, index: oi }, RrgNodeId::from_raw(cursor));
                cursor += 2;
            }
        }
        for b in &occ {
            for (ii, _) in b.inputs.iter().enumerate() {
                sink.insert(PinKey { block: b.id, is_output: false, index: ii }, RrgNodeId::from_raw(cursor));
                cursor += 2;
            }
        }
    }

    PinNodeMap { source, sink }
}
