//! Configuration loading.
//!
//! The default configuration is baked into the binary from
//! `config/default.toml`. A user file replaces it entirely; keys missing
//! from that file fall back to the built-in defaults of each section.

use std::path::Path;

use parcel_wfs_geometry::selection::MAX_BUFFER_M;
use parcel_wfs_parcel_models::config::Config;
use thiserror::Error;

/// Default configuration, embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for [`Config`].
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of the offending value.
        message: String,
    },
}

/// Parses a configuration from TOML text and validates it.
///
/// # Errors
///
/// Returns [`ConfigError`] if the text is not valid TOML or a value is out
/// of range.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text)?;
    validate(&config)?;
    Ok(config)
}

/// Returns the embedded default configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the file is embedded).
#[must_use]
pub fn default_config() -> Config {
    parse_config(DEFAULT_CONFIG_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded default.toml: {e}"))
}

/// Loads the configuration from `path`, or the embedded default when
/// `path` is `None`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(default_config());
    };

    log::info!("Loading configuration from {}", path.display());
    parse_config(&std::fs::read_to_string(path)?)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let invalid = |message: String| Err(ConfigError::Invalid { message });

    if config.service.endpoint.trim().is_empty() {
        return invalid("service.endpoint is empty".to_string());
    }
    if config.service.type_name.trim().is_empty() {
        return invalid("service.type_name is empty".to_string());
    }
    let max_tile = config.download.max_tile_km2;
    if !(max_tile.is_finite() && max_tile > 0.0) {
        return invalid(format!("download.max_tile_km2 must be positive, got {max_tile}"));
    }
    let buffer = config.selection.default_buffer_m;
    if !(0.0..=MAX_BUFFER_M).contains(&buffer) {
        return invalid(format!(
            "selection.default_buffer_m must be within 0-{MAX_BUFFER_M}, got {buffer}"
        ));
    }
    if config.dedup.canonical_precision > 15 {
        return invalid(format!(
            "dedup.canonical_precision must be at most 15, got {}",
            config.dedup.canonical_precision
        ));
    }

    Ok(())
}
