//! CLI-over-file-over-default resolution for PnR configuration.

use crate::types::PnrConfig;

/// CLI-supplied overrides, layered on top of a loaded [`PnrConfig`].
///
/// Every field is optional; `None` means "use whatever the config file (or
/// its own built-in default) already specifies."
#[derive(Debug, Default)]
pub struct CliOverrides {
    /// `--architecture <name>`.
    pub architecture: Option<String>,
    /// `--placer <name>` entries, repeatable, in order given.
    pub placers: Option<Vec<String>>,
    /// `--max-trials <n>` (router).
    pub max_trials: Option<u32>,
}

/// Merges CLI overrides onto a loaded configuration.
///
/// CLI flags win; anything left unset falls through to the config file's
/// value, which itself falls through to [`PnrConfig::default()`] per field.
pub fn resolve_config(base: PnrConfig, overrides: CliOverrides) -> PnrConfig {
    let mut config = base;
    if let Some(architecture) = overrides.architecture {
        config.architecture = Some(architecture);
    }
    if let Some(names) = overrides.placers {
        config.placers = names
            .into_iter()
            .map(|name| crate::types::PlacerSpec {
                name,
                options: Default::default(),
            })
            .collect();
    }
    if let Some(max_trials) = overrides.max_trials {
        config.router.max_trials = max_trials;
    }
    config
}
