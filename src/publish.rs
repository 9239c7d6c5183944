//! Draft -> hosted image -> stored resource

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::docstore::WriteMode;
use crate::domain::{DraftError, ImageSource, Resource, ResourceDraft, ResourceError};
use crate::imghost::{self, ImageHostClient, UploadError, UploadOptions, UploadedImage};
use crate::repository::{RepositoryError, ResourceRepository};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{0}")]
    Draft(#[from] DraftError),

    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Uploaded image produced an invalid resource: {0}")]
    Resource(#[from] ResourceError),

    #[error("Saving resource failed: {0}")]
    Repository(#[from] RepositoryError),
}

pub type Result<T> = std::result::Result<T, PublishError>;

/// Anything that can host an image and hand back its public URL
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(
        &self,
        source: &ImageSource,
        options: &UploadOptions,
    ) -> imghost::Result<UploadedImage>;
}

#[async_trait]
impl ImageUploader for ImageHostClient {
    async fn upload(
        &self,
        source: &ImageSource,
        options: &UploadOptions,
    ) -> imghost::Result<UploadedImage> {
        ImageHostClient::upload(self, source, options).await
    }
}

pub struct ResourcePublisher {
    uploader: Arc<dyn ImageUploader>,
    repository: ResourceRepository,
}

impl ResourcePublisher {
    pub fn new(uploader: Arc<dyn ImageUploader>, repository: ResourceRepository) -> Self {
        Self { uploader, repository }
    }

    /// Validate the draft, upload its image under the trimmed title, then store
    /// a new resource pointing at the hosted URL.
    ///
    /// Nothing leaves the process when validation fails, and nothing is stored
    /// when the upload fails.
    pub async fn publish(&self, draft: &ResourceDraft) -> Result<Resource> {
        draft.validate()?;
        let Some(image) = draft.image.as_ref() else {
            return Err(DraftError::MissingImage.into());
        };

        let title = draft.trimmed_title();
        let options = UploadOptions::builder().name(title).build();
        let metrics = self.repository.metrics();

        let uploaded = match self.uploader.upload(image, &options).await {
            Ok(uploaded) => {
                metrics.upload_succeeded();
                uploaded
            }
            Err(e) => {
                metrics.upload_failed();
                warn!(title, error = %e, "Image upload failed");
                return Err(e.into());
            }
        };

        let resource = Resource::create(title, uploaded.url, draft.tags())?;
        self.repository.put(&resource, WriteMode::Merge).await?;

        info!(id = resource.id(), title, "Published resource");
        Ok(resource)
    }
}
