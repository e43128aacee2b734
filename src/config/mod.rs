//! Configuration management for Thumbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use thumbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Source prefix: {}", config.pipeline.source_prefix);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `THUMBOX__<section>__<key>`
//!
//! Examples:
//! - `THUMBOX__STORAGE__BUCKET=my-photo-bucket`
//! - `THUMBOX__PIPELINE__MAX_WIDTH=400`
//! - `THUMBOX__TELEMETRY__FUNCTION_NAME=thumbox-prod`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/thumbox.toml`.
//! This can be overridden using the `THUMBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use models::{Config, PipelineConfig, StorageConfig, StorageProvider, TelemetryConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`THUMBOX__*`)
    /// 2. TOML file (default: `config/thumbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad prefixes, quality out of range, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
