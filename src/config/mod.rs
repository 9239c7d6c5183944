//! Layered configuration for resdesk
//!
//! Settings are resolved from, in increasing priority:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use resdesk::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Store lives at: {}", config.store.path.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `RESDESK__<section>__<key>`:
//! - `RESDESK__STORE__PATH=/var/lib/resdesk`
//! - `RESDESK__STORE__PAGE_SIZE=50`
//! - `RESDESK__IMAGE_HOST__MAX_UPLOAD_BYTES=8MB`
//!
//! The image host key is read from `IMGBB_API_KEY` only.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/resdesk.toml`.
//! This can be overridden using the `RESDESK_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, ImageHostConfig, StoreConfig, TelemetryConfig};
pub use validation::{MAX_PAGE_SIZE, ValidationError};

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
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
