//! Negotiated-congestion routing (§4.7).

pub mod pathfinder;
mod rrg_map;

pub use pathfinder::route;
