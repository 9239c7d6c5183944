use std::path::PathBuf;

use bytes::Bytes;

/// Where an image to be uploaded comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local file, sent as a multipart part.
    File(PathBuf),
    /// In-memory image, sent as a multipart part under `name`.
    Bytes { name: String, data: Bytes },
    /// Base64-encoded image, sent url-encoded.
    Base64(String),
    /// Remote image the host fetches itself, sent url-encoded.
    Url(String),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::File(path) => format!("file {}", path.display()),
            ImageSource::Bytes { name, data } => format!("{} ({} bytes)", name, data.len()),
            ImageSource::Base64(encoded) => format!("base64 ({} chars)", encoded.len()),
            ImageSource::Url(url) => format!("url {}", url),
        }
    }
}
