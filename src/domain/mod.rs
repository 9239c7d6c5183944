//! Domain types for resource administration
//!
//! - [`Resource`] - validated media record as stored in the `resources` collection
//! - [`ResourceKind`] - categories an upload can be tagged with
//! - [`ResourceDraft`] - form state checked before anything leaves the process
//! - [`ImageSource`] - the image attached to a draft

mod draft;
mod image;
mod kind;
mod resource;

pub use draft::{DraftError, ResourceDraft};
pub use image::ImageSource;
pub use kind::ResourceKind;
pub use resource::{Resource, ResourceError};
