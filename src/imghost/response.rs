//! Upload response envelope
//!
//! Success:
//! `{"success": true, "status": 200, "data": {"url": .., "delete_url": .., "thumb": {"url": ..}}}`
//!
//! Failure carries either `{"error": {"message": ..}}` or `{"error": ".."}`.

use serde::{Deserialize, Serialize};

use super::error::{Result, UploadError};

/// A hosted image as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub delete_url: Option<String>,
    pub thumb_url: Option<String>,
    #[serde(skip)]
    pub raw_response: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: u16,
    data: Option<ImageData>,
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    delete_url: Option<String>,
    thumb: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct Thumb {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed { message: Option<String> },
    Plain(String),
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ErrorField {
    fn message(self) -> Option<String> {
        match self {
            ErrorField::Detailed { message } => non_blank(message),
            ErrorField::Plain(message) => non_blank(Some(message)),
        }
    }
}

/// Interpret a 2xx response body.
pub fn parse_success(body: String) -> Result<UploadedImage> {
    let envelope: Envelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return Err(UploadError::Parse {
                message: e.to_string(),
                body,
            });
        }
    };

    if !envelope.success || envelope.status != 200 {
        let message = envelope
            .error
            .and_then(ErrorField::message)
            .unwrap_or_else(|| format!("HTTP {}", envelope.status));
        return Err(UploadError::Rejected { message, body });
    }

    let Some(data) = envelope.data else {
        return Err(UploadError::MissingUrl { body });
    };
    let Some(url) = non_blank(data.url) else {
        return Err(UploadError::MissingUrl { body });
    };

    Ok(UploadedImage {
        url,
        delete_url: non_blank(data.delete_url),
        thumb_url: non_blank(data.thumb.and_then(|t| t.url)),
        raw_response: body,
    })
}

/// Best-effort error message from a non-2xx body.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(ErrorField::message)
}
