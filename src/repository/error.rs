use thiserror::Error;

use crate::docstore::StoreError;

use super::resources::MAX_PAGE_SIZE;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Page size must be between 1 and {}", MAX_PAGE_SIZE)]
    InvalidPageSize,
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
