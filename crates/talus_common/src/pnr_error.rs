//! The user-facing error channel for placement and routing.
//!
//! Distinct from [`InternalError`](crate::InternalError): every variant here
//! corresponds to a condition a user can actually cause (a malformed file, an
//! infeasible device, an unroutable net) and can react to. Nothing in this
//! enum indicates a bug.

use std::path::PathBuf;

/// The result type for operations that can fail for user-facing reasons.
pub type PnrResult<T> = Result<T, PnrError>;

/// A user-facing placement/routing error.
#[derive(Debug, thiserror::Error)]
pub enum PnrError {
    /// A BLIF/net/architecture-JSON file was missing or malformed.
    #[error("{path}: {message}")]
    InputFormat {
        /// Path to the offending file.
        path: PathBuf,
        /// Description of the parse failure.
        message: String,
    },

    /// The architecture description is internally inconsistent.
    #[error("architecture inconsistency: {0}")]
    ArchitectureInconsistency(String),

    /// No legal placement exists for the given device and circuit.
    #[error("placement infeasible: {0}")]
    PlacementInfeasible(String),

    /// The router's Dijkstra search exhausted its frontier before reaching
    /// the target sink.
    #[error("connection {connection} unreachable: {message}")]
    RouterUnreachableSink {
        /// Identifier of the unreachable connection (driver pin -> sink pin).
        connection: String,
        /// Additional context from the search.
        message: String,
    },

    /// Routing did not converge to a valid (uncongested) solution within the
    /// configured trial budget. Non-fatal: the last routing is still usable.
    #[error("routing did not converge after {max_trials} trials: {overused_nodes} node(s) still overused")]
    RoutingNotConverged {
        /// Number of iterations attempted.
        max_trials: u32,
        /// Number of RRG nodes whose occupation still exceeds capacity.
        overused_nodes: usize,
    },

    /// A genuine gate-level BLIF netlist (not the `.net` subset) was supplied.
    #[error("unsupported input format ({format}): {note}")]
    UnsupportedFormat {
        /// The format name that was rejected (e.g. `"blif"`).
        format: String,
        /// Guidance for the user (e.g. "pre-pack to .net").
        note: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_format_display() {
        let err = PnrError::InputFormat {
            path: PathBuf::from("design.net"),
            message: "unexpected token on line 4".to_string(),
        };
        assert_eq!(format!("{err}"), "design.net: unexpected token on line 4");
    }

    #[test]
    fn architecture_inconsistency_display() {
        let err = PnrError::ArchitectureInconsistency("unknown block type 'bram'".to_string());
        assert_eq!(
            format!("{err}"),
            "architecture inconsistency: unknown block type 'bram'"
        );
    }

    #[test]
    fn placement_infeasible_display() {
        let err = PnrError::PlacementInfeasible("device too small for 40 CLBs".to_string());
        assert_eq!(
            format!("{err}"),
            "placement infeasible: device too small for 40 CLBs"
        );
    }

    #[test]
    fn router_unreachable_sink_display() {
        let err = PnrError::RouterUnreachableSink {
            connection: "n12.out -> n45.in0".to_string(),
            message: "priority queue exhausted".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "connection n12.out -> n45.in0 unreachable: priority queue exhausted"
        );
    }

    #[test]
    fn routing_not_converged_display() {
        let err = PnrError::RoutingNotConverged {
            max_trials: 100,
            overused_nodes: 3,
        };
        assert_eq!(
            format!("{err}"),
            "routing did not converge after 100 trials: 3 node(s) still overused"
        );
    }

    #[test]
    fn unsupported_format_display() {
        let err = PnrError::UnsupportedFormat {
            format: "blif".to_string(),
            note: "pre-pack to .net".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "unsupported input format (blif): pre-pack to .net"
        );
    }

    #[test]
    fn is_result_alias() {
        let ok: PnrResult<i32> = Ok(1);
        assert!(ok.is_ok());
    }
}
