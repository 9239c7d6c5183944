//! Document store used by the resource repository
//!
//! A collection is a set of JSON documents keyed by string id. The
//! [`DocumentStore`] trait exposes the small query surface a hosted document
//! database offers (equality, range, array-contains, order-by, limit,
//! start-after) plus atomic batches and live queries. Callers receive the
//! store as an injected `Arc<dyn DocumentStore>`; nothing here is global.
//!
//! [`FjallDocumentStore`] is the embedded implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resdesk::docstore::{DocumentStore, FjallDocumentStore, Query, Direction};
//!
//! let store = FjallDocumentStore::open("data/resdesk")?;
//! let newest = store
//!     .query("resources", &Query::new().order_by("createdAt", Direction::Descending).limit(20))
//!     .await?;
//! ```

pub mod document;
pub mod error;
pub mod keys;
pub mod live;
pub mod query;
pub mod store;
pub mod value;

use async_trait::async_trait;

pub use document::{DocumentSnapshot, WriteMode, WriteOp};
pub use error::{Result, StoreError};
pub use live::{ListenerRegistration, LiveQuery};
pub use query::{Direction, Filter, OrderBy, Query};
pub use store::FjallDocumentStore;
pub use value::{FieldValue, Fields};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` if it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentSnapshot>>;

    /// Apply every operation or none of them
    async fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> Result<()>;

    /// Run a query once
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<DocumentSnapshot>>;

    /// Run a query now and again after every change to `collection`
    async fn listen(&self, collection: &str, query: Query) -> Result<LiveQuery>;

    /// Live queries currently registered
    fn active_listeners(&self) -> usize;

    async fn set(&self, collection: &str, id: &str, fields: Fields, mode: WriteMode) -> Result<()> {
        self.commit(
            collection,
            vec![WriteOp::Set {
                id: id.to_string(),
                fields,
                mode,
            }],
        )
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.commit(collection, vec![WriteOp::Delete { id: id.to_string() }])
            .await
    }
}
