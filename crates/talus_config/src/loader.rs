//! Configuration file loading and validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::types::PnrConfig;

/// Loads and validates a `talus.toml` configuration from a project directory.
///
/// Reads `<project_dir>/talus.toml`, parses it, and validates recognized
/// fields. A missing file is an I/O error, not silently treated as defaults
/// — callers that want defaults-only behavior should construct
/// `PnrConfig::default()` directly.
pub fn load_config(project_dir: &Path) -> Result<PnrConfig, ConfigError> {
    let config_path = project_dir.join("talus.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `talus.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies, and for the CLI's
/// `--config` flag.
pub fn load_config_from_str(content: &str) -> Result<PnrConfig, ConfigError> {
    let config: PnrConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are internally consistent.
fn validate_config(config: &PnrConfig) -> Result<(), ConfigError> {
    for placer in &config.placers {
        if !matches!(placer.name.as_str(), "random" | "analytical" | "SA") {
            return Err(ConfigError::ValidationError(format!(
                "unrecognized placer '{}': expected one of random, analytical, SA",
                placer.name
            )));
        }
    }
    if config.analytical.epsilon <= 0.0 {
        return Err(ConfigError::ValidationError(
            "analytical.epsilon must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.sa.lambda) {
        return Err(ConfigError::ValidationError(
            "sa.lambda must be in [0, 1]".to_string(),
        ));
    }
    if config.router.max_trials == 0 {
        return Err(ConfigError::ValidationError(
            "router.max_trials must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert!(config.architecture.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
architecture = "artix7_like_63k"

[[placers]]
name = "random"

[[placers]]
name = "analytical"

[[placers]]
name = "SA"

[analytical]
epsilon = 1e-5
max_outer_iterations = 30

[sa]
lambda = 0.3

[router]
max_trials = 200
timing_driven = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.architecture.as_deref(), Some("artix7_like_63k"));
        assert_eq!(config.placers.len(), 3);
        assert_eq!(config.analytical.epsilon, 1e-5);
        assert_eq!(config.analytical.max_outer_iterations, 30);
        assert_eq!(config.sa.lambda, 0.3);
        assert_eq!(config.router.max_trials, 200);
        assert!(!config.router.timing_driven);
    }

    #[test]
    fn rejects_unknown_placer() {
        let toml = r#"
[[placers]]
name = "greedy"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        let toml = r#"
[analytical]
epsilon = 0.0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_lambda_out_of_range() {
        let toml = r#"
[sa]
lambda = 1.5
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = load_config_from_str("not = [valid").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
