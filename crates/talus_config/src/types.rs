//! Configuration types deserialized from `talus.toml`.

use std::collections::BTreeMap;

use serde::Deserialize;

/// The top-level project configuration parsed from `talus.toml`.
///
/// Holds the default architecture preset and the default tunables for each
/// placement/routing stage. Every field has a built-in default so that an
/// empty (or entirely absent) `talus.toml` still yields a usable configuration;
/// CLI flags layered on top (see [`crate::resolve`]) take precedence over
/// whatever is recorded here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PnrConfig {
    /// Default architecture preset name (e.g. `"cyclone_like_22k"`), used when
    /// `--architecture` is not given on the command line.
    #[serde(default)]
    pub architecture: Option<String>,
    /// Default placer sequence and per-placer options.
    #[serde(default)]
    pub placers: Vec<PlacerSpec>,
    /// Analytical placer tunables.
    #[serde(default)]
    pub analytical: AnalyticalConfig,
    /// Legalizer tunables.
    #[serde(default)]
    pub legalizer: LegalizerConfig,
    /// Simulated-annealing refiner tunables.
    #[serde(default)]
    pub sa: SaConfig,
    /// Connection router tunables.
    #[serde(default)]
    pub router: RouterConfig,
}

/// A single entry in a `--placer` sequence: which placer to run and its
/// inline `key=value` options.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacerSpec {
    /// Placer name: `"random"`, `"analytical"`, or `"SA"`.
    pub name: String,
    /// Inline options (`opt=value` pairs from the CLI, or a TOML sub-table).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Tunables for the B2B analytical placer (§4.3).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticalConfig {
    /// Conjugate-gradient convergence tolerance `epsilon`.
    pub epsilon: f64,
    /// Maximum CG iterations per solve before giving up on that tolerance.
    pub max_cg_iterations: u32,
    /// Maximum outer solve-legalize-anchor iterations.
    pub max_outer_iterations: u32,
    /// Stop when `|solved_hpwl - legal_hpwl| / legal_hpwl` drops below this.
    pub convergence_gap: f64,
}

impl Default for AnalyticalConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            max_cg_iterations: 200,
            max_outer_iterations: 20,
            convergence_gap: 0.05,
        }
    }
}

/// Tunables for the area-based recursive-bipartition legalizer (§4.4).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LegalizerConfig {
    /// Maximum outward area-growth steps before giving up (infeasibility guard).
    pub max_growth_steps: u32,
}

impl Default for LegalizerConfig {
    fn default() -> Self {
        Self {
            max_growth_steps: 256,
        }
    }
}

/// Tunables for the simulated-annealing refiner (§4.5).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaConfig {
    /// Timing/wirelength cost blend `lambda` in `[0, 1]`.
    pub lambda: f64,
    /// Moves attempted per temperature step, as a multiplier of block count.
    pub moves_per_temp_multiplier: f64,
    /// Cooling-rate floor (`alpha` when acceptance rate is low).
    pub cooling_rate: f64,
    /// Target acceptance rate the move-radius schedule holds to.
    pub target_accept_rate: f64,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            lambda: 0.5,
            moves_per_temp_multiplier: 10.0,
            cooling_rate: 0.95,
            target_accept_rate: 0.44,
        }
    }
}

/// Tunables for the negotiated-congestion connection router (§4.7).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Maximum routing iterations (`maxTrials`).
    pub max_trials: u32,
    /// Iteration at which OPIN fixing begins (`fixOpins`).
    pub fix_opins: u32,
    /// Maximum percentage of connections allowed above the reroute-criticality
    /// threshold before the threshold stops rising.
    pub max_percentage_critical_connections: f64,
    /// Initial present-congestion factor.
    pub pres_fac_initial: f64,
    /// Present-congestion factor growth multiplier per invalid iteration.
    pub pres_fac_mult: f64,
    /// Historical-congestion accumulation factor.
    pub acc_fac: f64,
    /// Wirelength-driven cost weight in the router's directed-search lower bound.
    pub alpha_wld: f64,
    /// Timing-driven cost weight in the router's directed-search lower bound.
    pub alpha_td: f64,
    /// Whether timing-driven routing is enabled (`td`).
    pub timing_driven: bool,
    /// Margin (grid units) a connection's search is allowed to stray past its
    /// net's bounding box on each side.
    pub bb_factor: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_trials: 100,
            fix_opins: 4,
            max_percentage_critical_connections: 3.0,
            pres_fac_initial: 0.6,
            pres_fac_mult: 2.0,
            acc_fac: 1.0,
            alpha_wld: 0.75,
            alpha_td: 0.25,
            timing_driven: true,
            bb_factor: 3.0,
        }
    }
}
