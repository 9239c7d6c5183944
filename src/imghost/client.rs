use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use tracing::{debug, info, warn};

use crate::config::ImageHostConfig;
use crate::domain::ImageSource;
use crate::humanize::ByteSize;

use super::error::{Result, UploadError};
use super::response::{UploadedImage, error_message, parse_success};

/// Largest image the host accepts.
pub const MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Accepted auto-delete window in seconds; other values are dropped.
pub const MIN_EXPIRATION_SECS: u64 = 60;
pub const MAX_EXPIRATION_SECS: u64 = 15_552_000;

const FORM_FIELD: &str = "image";

/// Per-upload parameters
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct UploadOptions {
    /// Name the host stores the image under
    #[builder(into)]
    pub name: Option<String>,
    /// Auto-delete after this many seconds
    pub expiration: Option<u64>,
}

/// Client for the image hosting upload API
///
/// One POST per call, no retries. Size limits are enforced locally, so an
/// oversized image never reaches the network.
#[derive(Clone)]
pub struct ImageHostClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    max_upload_bytes: u64,
}

impl std::fmt::Debug for ImageHostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHostClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl ImageHostClient {
    pub fn new(config: &ImageHostConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(UploadError::Configuration("API key is blank".into()));
        }

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            UploadError::Configuration(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(concat!("resdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            max_upload_bytes: config.max_upload_bytes.as_u64().min(MAX_UPLOAD_BYTES),
        })
    }

    /// Build from config, taking the key loaded from the environment
    pub fn from_config(config: &ImageHostConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| UploadError::Configuration("IMGBB_API_KEY is not set".into()))?;
        Self::new(config, api_key)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub async fn upload(
        &self,
        source: &ImageSource,
        options: &UploadOptions,
    ) -> Result<UploadedImage> {
        let request = self.client.post(self.endpoint.clone()).query(&self.query(options));

        let request = match source {
            ImageSource::File(path) => {
                let (name, data) = self.read_file(path).await?;
                request.multipart(image_form(name, data)?)
            }
            ImageSource::Bytes { name, data } => {
                self.check_size(data.len() as u64)?;
                request.multipart(image_form(name.clone(), data.clone())?)
            }
            ImageSource::Base64(encoded) => request.form(&[(FORM_FIELD, encoded.as_str())]),
            ImageSource::Url(url) => request.form(&[(FORM_FIELD, url.as_str())]),
        };

        debug!(source = %source.describe(), "Uploading image");
        let image = self.send(request).await?;
        info!(url = %image.url, "Image uploaded");
        Ok(image)
    }

    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> Result<UploadedImage> {
        self.upload(&ImageSource::File(path.as_ref().to_path_buf()), options)
            .await
    }

    pub async fn upload_bytes(
        &self,
        name: impl Into<String>,
        data: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> Result<UploadedImage> {
        let source = ImageSource::Bytes {
            name: name.into(),
            data: data.into(),
        };
        self.upload(&source, options).await
    }

    pub async fn upload_base64(
        &self,
        encoded: impl Into<String>,
        options: &UploadOptions,
    ) -> Result<UploadedImage> {
        self.upload(&ImageSource::Base64(encoded.into()), options)
            .await
    }

    /// Ask the host to fetch a remote image itself
    pub async fn upload_from_url(
        &self,
        image_url: impl Into<String>,
        options: &UploadOptions,
    ) -> Result<UploadedImage> {
        self.upload(&ImageSource::Url(image_url.into()), options)
            .await
    }

    fn query(&self, options: &UploadOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![("key", self.api_key.clone())];

        if let Some(name) = options.name.as_deref().filter(|n| !n.trim().is_empty()) {
            params.push(("name", name.to_string()));
        }

        match options.expiration {
            Some(secs) if (MIN_EXPIRATION_SECS..=MAX_EXPIRATION_SECS).contains(&secs) => {
                params.push(("expiration", secs.to_string()));
            }
            Some(secs) => {
                warn!(
                    expiration = secs,
                    "Expiration outside {}..={} seconds, uploading without one",
                    MIN_EXPIRATION_SECS,
                    MAX_EXPIRATION_SECS
                );
            }
            None => {}
        }

        params
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_upload_bytes {
            return Err(UploadError::FileTooLarge {
                size: ByteSize(size),
                limit: ByteSize(self.max_upload_bytes),
            });
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<(String, Bytes)> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(UploadError::FileNotFound(path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        self.check_size(metadata.len())?;

        let data = tokio::fs::read(path).await?;
        // The file may have grown since the metadata call.
        self.check_size(data.len() as u64)?;

        Ok((file_name(path), Bytes::from(data)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<UploadedImage> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await;

        if !status.is_success() {
            let body = body.ok();
            let message = body
                .as_deref()
                .and_then(error_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            warn!(status = status.as_u16(), %message, "Image host returned an error status");
            return Err(UploadError::Http {
                status: status.as_u16(),
                message,
                body,
            });
        }

        parse_success(body?)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Content type from the file extension; anything unknown is sent as `image/*`.
fn guess_mime(name: &str) -> mime::Mime {
    let extension = PathBuf::from(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("bmp") => mime::IMAGE_BMP,
        Some("svg") => mime::IMAGE_SVG,
        Some("webp") => "image/webp".parse().unwrap_or(mime::IMAGE_STAR),
        _ => mime::IMAGE_STAR,
    }
}

fn image_form(name: String, data: Bytes) -> Result<Form> {
    let mime = guess_mime(&name);
    let part = Part::bytes(data.to_vec())
        .file_name(name)
        .mime_str(mime.as_ref())
        .map_err(|e| UploadError::Configuration(e.to_string()))?;
    Ok(Form::new().part(FORM_FIELD, part))
}
