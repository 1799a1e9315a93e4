//! Parsing and validation of `talus.toml` placement/routing configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`PnrConfig`], then merges CLI-supplied overrides on top via [`resolve_config`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use resolve::{resolve_config, CliOverrides};
pub use types::*;
