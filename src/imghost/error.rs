use std::path::PathBuf;

use thiserror::Error;

use crate::humanize::ByteSize;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Image is {size} but the upload limit is {limit}")]
    FileTooLarge { size: ByteSize, limit: ByteSize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<String>,
    },

    #[error("Upload rejected: {message}")]
    Rejected { message: String, body: String },

    #[error("Parse error: {message}")]
    Parse { message: String, body: String },

    #[error("Upload succeeded but the response carried no image url")]
    MissingUrl { body: String },

    #[error("Image host is not configured: {0}")]
    Configuration(String),
}

impl UploadError {
    /// Response body as received, when the host answered at all
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            UploadError::Http { body, .. } => body.as_deref(),
            UploadError::Rejected { body, .. }
            | UploadError::Parse { body, .. }
            | UploadError::MissingUrl { body } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UploadError::Timeout
        } else {
            UploadError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
