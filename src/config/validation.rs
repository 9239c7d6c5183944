use super::models::{Config, ImageHostConfig, StoreConfig};
use crate::imghost::MAX_UPLOAD_BYTES;
pub use crate::repository::MAX_PAGE_SIZE;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("store.page_size must be between 1 and {max}, got {actual}")]
    InvalidPageSize { actual: usize, max: usize },

    #[error("store.collection '{0}' must be non-blank and must not contain '/'")]
    InvalidCollection(String),

    #[error("store.listener_capacity must be positive")]
    InvalidListenerCapacity,

    #[error("image_host.max_upload_bytes ({actual}) must be between 1 and {limit}")]
    UploadLimitOutOfRange { actual: u64, limit: u64 },

    #[error("image_host.endpoint '{endpoint}' is not an http(s) URL")]
    InvalidEndpoint { endpoint: String },

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_store(&config.store)?;
    validate_image_host(&config.image_host)?;
    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ValidationError> {
    if store.page_size == 0 || store.page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::InvalidPageSize {
            actual: store.page_size,
            max: MAX_PAGE_SIZE,
        });
    }

    if store.collection.trim().is_empty() || store.collection.contains('/') {
        return Err(ValidationError::InvalidCollection(store.collection.clone()));
    }

    if store.listener_capacity == 0 {
        return Err(ValidationError::InvalidListenerCapacity);
    }

    Ok(())
}

fn validate_image_host(host: &ImageHostConfig) -> Result<(), ValidationError> {
    let size = host.max_upload_bytes.as_u64();
    if size == 0 || size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::UploadLimitOutOfRange {
            actual: size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let http_like = Url::parse(&host.endpoint)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);
    if !http_like {
        return Err(ValidationError::InvalidEndpoint {
            endpoint: host.endpoint.clone(),
        });
    }

    if host.connect_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "image_host.connect_timeout_secs",
        });
    }
    if host.request_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "image_host.request_timeout_secs",
        });
    }

    Ok(())
}
