//! Configuration utilities.

/// TOML configuration with environment overrides.
pub mod config;

pub use config::{AriaConfig, ConfigError, LogFormat, ProviderKind};
