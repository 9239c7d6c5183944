use std::collections::BTreeSet;

use thiserror::Error;

use super::image::ImageSource;
use super::kind::ResourceKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Please select an image")]
    MissingImage,

    #[error("Select at least one resource type")]
    NoKinds,
}

/// Unsaved resource as entered by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDraft {
    pub title: String,
    pub image: Option<ImageSource>,
    pub kinds: BTreeSet<ResourceKind>,
}

impl ResourceDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Select `kind` if absent, deselect it otherwise.
    pub fn toggle_kind(&mut self, kind: ResourceKind) {
        if !self.kinds.remove(&kind) {
            self.kinds.insert(kind);
        }
    }

    pub fn trimmed_title(&self) -> &str {
        self.title.trim()
    }

    pub fn tags(&self) -> BTreeSet<String> {
        self.kinds.iter().map(|kind| kind.tag().to_string()).collect()
    }

    /// First problem that blocks publishing, checked in form order.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if self.image.is_none() {
            return Err(DraftError::MissingImage);
        }
        if self.kinds.is_empty() {
            return Err(DraftError::NoKinds);
        }
        Ok(())
    }
}
