use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub image_host: ImageHostConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Document store and resource collection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Page size used when a caller does not ask for one
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Change events buffered per store before slow live queries re-read
    #[serde(default = "default_listener_capacity")]
    pub listener_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            page_size: default_page_size(),
            listener_capacity: default_listener_capacity(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/resdesk")
}

fn default_collection() -> String {
    crate::repository::DEFAULT_COLLECTION.to_string()
}

fn default_page_size() -> usize {
    crate::repository::DEFAULT_PAGE_SIZE
}

fn default_listener_capacity() -> usize {
    64
}

/// Image hosting API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageHostConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: ByteSize,
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// API key (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl ImageHostConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_upload_bytes: default_max_upload_bytes(),
            connect_timeout_secs: default_timeout_secs(),
            request_timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_endpoint() -> String {
    "https://api.imgbb.com/1/upload".to_string()
}

fn default_max_upload_bytes() -> ByteSize {
    ByteSize::mib(32)
}

fn default_timeout_secs() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.collection, "resources");
        assert_eq!(config.store.page_size, crate::repository::DEFAULT_PAGE_SIZE);
        assert_eq!(config.image_host.max_upload_bytes, ByteSize::mib(32));
        assert_eq!(config.image_host.request_timeout(), Duration::from_secs(30));
        assert!(config.image_host.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[store]
page_size = 50

[image_host]
max_upload_bytes = "8MB"
api_key = "ignored"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.page_size, 50);
        assert_eq!(config.store.path, PathBuf::from("data/resdesk"));
        assert_eq!(config.image_host.max_upload_bytes, ByteSize::mib(8));
        assert!(config.image_host.api_key.is_none());
        assert_eq!(config.telemetry.log_level, "info");
    }
}
