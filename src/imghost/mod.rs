//! Image hosting upload client
//!
//! Sends one image per call to an ImgBB-compatible upload endpoint and
//! returns the hosted URLs. Files and in-memory buffers go out as multipart
//! form data; base64 strings and remote URLs go out url-encoded.

mod client;
mod error;
mod response;

pub use client::{
    ImageHostClient, MAX_EXPIRATION_SECS, MAX_UPLOAD_BYTES, MIN_EXPIRATION_SECS, UploadOptions,
};
pub use error::{Result, UploadError};
pub use response::UploadedImage;
