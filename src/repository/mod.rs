/// Resource data access on top of a [`DocumentStore`](crate::docstore::DocumentStore)
///
/// [`ResourceRepository`] maps [`Resource`](crate::domain::Resource) values to
/// documents in one collection (default `resources`) and offers one-shot
/// reads, live listings, title-prefix search, tag filters and cursor paging.
///
/// ## Usage
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use resdesk::docstore::FjallDocumentStore;
/// use resdesk::repository::{ResourceRepository, DEFAULT_PAGE_SIZE};
///
/// let store = FjallDocumentStore::open("data/resdesk")?;
/// let repo = ResourceRepository::new(Arc::new(store));
/// let first = repo.get_page(None, DEFAULT_PAGE_SIZE).await?;
/// let second = repo.get_page(first.last_item_id.as_deref(), DEFAULT_PAGE_SIZE).await?;
/// ```
pub mod error;
pub mod mapping;
pub mod page;
pub mod resources;

pub use error::{RepositoryError, Result};
pub use mapping::MalformedDocument;
pub use page::PageResult;
pub use resources::{
    DEFAULT_COLLECTION, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ResourceRepository, ResourceStream,
};
