use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use crate::docstore::{Direction, DocumentSnapshot, DocumentStore, Query, WriteMode, WriteOp};
use crate::domain::Resource;
use crate::observability::Metrics;

use super::error::{RepositoryError, Result};
use super::mapping::{FIELD_CREATED_AT, FIELD_TAGS, FIELD_TITLE, from_snapshot, to_fields};
use super::page::PageResult;

pub const DEFAULT_COLLECTION: &str = "resources";
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page any paged read will return.
pub const MAX_PAGE_SIZE: usize = 500;

/// Upper bound appended to a prefix for "starts with" range queries.
const PREFIX_END: char = '\u{f8ff}';

/// Live listing: the full ordered result, re-delivered on every change.
pub type ResourceStream = BoxStream<'static, Result<Vec<Resource>>>;

/// Data access for the resource collection
///
/// Every call is a single attempt against the injected store; nothing here
/// retries. Documents that cannot be read as a [`Resource`] are skipped in
/// listings and reported as absent by [`get_by_id`](Self::get_by_id).
#[derive(Clone)]
pub struct ResourceRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
    metrics: Arc<Metrics>,
}

impl ResourceRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            collection: DEFAULT_COLLECTION.to_string(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    // ---- writes ----

    /// Upsert one resource keyed by its id
    pub async fn put(&self, resource: &Resource, mode: WriteMode) -> Result<()> {
        self.store
            .set(&self.collection, resource.id(), to_fields(resource, mode), mode)
            .await?;
        self.metrics.resources_written(1);
        debug!(id = resource.id(), ?mode, "Stored resource");
        Ok(())
    }

    /// Upsert many resources in one atomic batch, returning how many were written
    pub async fn put_all(&self, resources: &[Resource], mode: WriteMode) -> Result<usize> {
        let ops = resources
            .iter()
            .map(|resource| WriteOp::Set {
                id: resource.id().to_string(),
                fields: to_fields(resource, mode),
                mode,
            })
            .collect();

        self.store.commit(&self.collection, ops).await?;
        self.metrics.resources_written(resources.len() as u64);
        info!(count = resources.len(), "Stored resource batch");
        Ok(resources.len())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete(&self.collection, id).await?;
        self.metrics.resources_removed(1);
        debug!(id, "Removed resource");
        Ok(())
    }

    /// Delete every id in one atomic batch
    pub async fn remove_all<I, S>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ops: Vec<WriteOp> = ids
            .into_iter()
            .map(|id| WriteOp::Delete { id: id.into() })
            .collect();
        let count = ops.len();

        self.store.commit(&self.collection, ops).await?;
        self.metrics.resources_removed(count as u64);
        info!(count, "Removed resource batch");
        Ok(())
    }

    // ---- reads ----

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Resource>> {
        let doc = self.store.get(&self.collection, id).await?;
        Ok(doc.and_then(|doc| read_resource(&doc, &self.metrics)))
    }

    /// Every resource, newest first
    pub async fn get_all(&self) -> Result<Vec<Resource>> {
        self.list(&newest_first()).await
    }

    pub async fn watch_all(&self) -> Result<ResourceStream> {
        self.watch(newest_first()).await
    }

    /// Resources whose title starts with `query`, ordered by title
    pub async fn search_by_title_prefix(&self, query: &str) -> Result<Vec<Resource>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.list(&title_prefix(query)).await
    }

    /// Live variant of [`search_by_title_prefix`](Self::search_by_title_prefix).
    ///
    /// A blank query yields a single empty list and ends.
    pub async fn watch_title_prefix(&self, query: &str) -> Result<ResourceStream> {
        if query.trim().is_empty() {
            return Ok(stream::iter([Ok(Vec::new())]).boxed());
        }
        self.watch(title_prefix(query)).await
    }

    /// Resources carrying `tag`, in id order
    pub async fn filter_by_tag(&self, tag: &str) -> Result<Vec<Resource>> {
        self.list(&Query::new().where_array_contains(FIELD_TAGS, tag))
            .await
    }

    // ---- pages ----

    /// Page through all resources, newest first
    pub async fn get_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult<Resource>> {
        self.page(newest_first(), cursor, page_size).await
    }

    /// Page through a title-prefix search
    pub async fn search_page(
        &self,
        query: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult<Resource>> {
        check_page_size(page_size)?;
        if query.trim().is_empty() {
            return Ok(PageResult::empty());
        }
        self.page(title_prefix(query), cursor, page_size).await
    }

    /// Page through resources carrying `tag`, newest first
    pub async fn filter_by_tag_page(
        &self,
        tag: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult<Resource>> {
        let query = newest_first().where_array_contains(FIELD_TAGS, tag);
        self.page(query, cursor, page_size).await
    }

    async fn list(&self, query: &Query) -> Result<Vec<Resource>> {
        let rows = self.store.query(&self.collection, query).await?;
        Ok(read_resources(&rows, &self.metrics))
    }

    async fn watch(&self, query: Query) -> Result<ResourceStream> {
        let live = self.store.listen(&self.collection, query).await?;
        let metrics = self.metrics.clone();

        Ok(live
            .map(move |batch| match batch {
                Ok(rows) => Ok(read_resources(&rows, &metrics)),
                Err(e) => Err(RepositoryError::from(e)),
            })
            .boxed())
    }

    /// Fetch one page strictly after the cursor document.
    ///
    /// A cursor that no longer exists restarts from the beginning. Rows that
    /// fail to map are replaced by reading further, so a short page always
    /// means the query is exhausted.
    async fn page(
        &self,
        base: Query,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult<Resource>> {
        check_page_size(page_size)?;

        let mut after: Option<DocumentSnapshot> = match cursor {
            Some(id) => {
                let doc = self.store.get(&self.collection, id).await?;
                if doc.is_none() {
                    debug!(cursor = id, "Cursor document is gone, paging from the start");
                }
                doc
            }
            None => None,
        };

        let mut items = Vec::new();
        let mut last_item_id = None;

        loop {
            let wanted = page_size - items.len();
            let mut query = base.clone().limit(wanted);
            if let Some(cursor) = after.take() {
                query = query.start_after(cursor);
            }

            let rows = self.store.query(&self.collection, &query).await?;
            let fetched = rows.len();
            items.extend(read_resources(&rows, &self.metrics));

            if let Some(last) = rows.into_iter().last() {
                last_item_id = Some(last.id.clone());
                after = Some(last);
            }

            if fetched < wanted || items.len() == page_size {
                break;
            }
        }

        let has_next = items.len() == page_size;
        Ok(PageResult {
            items,
            last_item_id,
            has_next,
        })
    }
}

fn check_page_size(page_size: usize) -> Result<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(RepositoryError::InvalidPageSize);
    }
    Ok(())
}

fn newest_first() -> Query {
    Query::new().order_by(FIELD_CREATED_AT, Direction::Descending)
}

fn title_prefix(prefix: &str) -> Query {
    Query::new()
        .where_gte(FIELD_TITLE, prefix)
        .where_lte(FIELD_TITLE, format!("{prefix}{PREFIX_END}"))
        .order_by(FIELD_TITLE, Direction::Ascending)
}

fn read_resource(doc: &DocumentSnapshot, metrics: &Metrics) -> Option<Resource> {
    match from_snapshot(doc) {
        Ok(resource) => Some(resource),
        Err(e) => {
            warn!(id = %doc.id, error = %e, "Skipping malformed resource document");
            metrics.malformed_skipped();
            None
        }
    }
}

fn read_resources(rows: &[DocumentSnapshot], metrics: &Metrics) -> Vec<Resource> {
    rows.iter()
        .filter_map(|doc| read_resource(doc, metrics))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstore::{FieldValue, Fields, FjallDocumentStore};
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ResourceRepository) {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallDocumentStore::open(temp_dir.path().join("db")).unwrap();
        (temp_dir, ResourceRepository::new(Arc::new(store)))
    }

    fn resource(id: &str, title: &str, tags: &[&str]) -> Resource {
        let url = format!("https://i.ibb.co/{id}/img.png");
        Resource::new(id, title, url, tags.iter().copied()).unwrap()
    }

    fn ids(resources: &[Resource]) -> Vec<&str> {
        resources.iter().map(Resource::id).collect()
    }

    #[tokio::test]
    async fn test_put_and_get_by_id() {
        let (_dir, repo) = setup();
        let original = resource("r1", "Flag of Peru", &["flag", "americas"]);

        repo.put(&original, WriteMode::Merge).await.unwrap();
        let loaded = repo.get_by_id("r1").await.unwrap().unwrap();

        assert_eq!(loaded, original);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.metrics().snapshot().resources_written, 1);
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let (_dir, repo) = setup();
        for id in ["a", "b", "c"] {
            repo.put(&resource(id, id, &[]), WriteMode::Merge).await.unwrap();
        }

        assert_eq!(ids(&repo.get_all().await.unwrap()), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_merge_keeps_position_replace_moves_to_front() {
        let (_dir, repo) = setup();
        for id in ["a", "b"] {
            repo.put(&resource(id, id, &[]), WriteMode::Merge).await.unwrap();
        }

        repo.put(&resource("a", "renamed", &[]), WriteMode::Merge).await.unwrap();
        assert_eq!(ids(&repo.get_all().await.unwrap()), vec!["b", "a"]);

        repo.put(&resource("a", "renamed", &[]), WriteMode::Replace).await.unwrap();
        assert_eq!(ids(&repo.get_all().await.unwrap()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_search_by_title_prefix() {
        let (_dir, repo) = setup();
        let batch = vec![
            resource("1", "Flag of Spain", &["flag"]),
            resource("2", "Flag of Chile", &["flag"]),
            resource("3", "Fjord", &["tourist"]),
            resource("4", "flag lowercase", &["flag"]),
        ];
        assert_eq!(repo.put_all(&batch, WriteMode::Merge).await.unwrap(), 4);

        let hits = repo.search_by_title_prefix("Flag").await.unwrap();
        assert_eq!(ids(&hits), vec!["2", "1"]);

        assert!(repo.search_by_title_prefix("").await.unwrap().is_empty());
        assert!(repo.search_by_title_prefix("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_tag() {
        let (_dir, repo) = setup();
        let batch = vec![
            resource("b", "Tower", &["tourist"]),
            resource("a", "Flag", &["flag"]),
            resource("c", "Bridge", &["tourist", "europe"]),
        ];
        repo.put_all(&batch, WriteMode::Merge).await.unwrap();

        assert_eq!(ids(&repo.filter_by_tag("tourist").await.unwrap()), vec!["b", "c"]);
        assert!(repo.filter_by_tag("asia").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_size_zero_rejected() {
        let (_dir, repo) = setup();
        assert!(matches!(
            repo.get_page(None, 0).await,
            Err(RepositoryError::InvalidPageSize)
        ));
        assert!(matches!(
            repo.search_page("x", None, 0).await,
            Err(RepositoryError::InvalidPageSize)
        ));
    }

    #[tokio::test]
    async fn test_page_size_above_limit_rejected() {
        let (_dir, repo) = setup();
        repo.put(&resource("a", "Anything", &["flag"]), WriteMode::Merge).await.unwrap();

        for size in [MAX_PAGE_SIZE + 1, usize::MAX] {
            assert!(matches!(
                repo.get_page(None, size).await,
                Err(RepositoryError::InvalidPageSize)
            ));
            assert!(matches!(
                repo.search_page("Any", None, size).await,
                Err(RepositoryError::InvalidPageSize)
            ));
            assert!(matches!(
                repo.filter_by_tag_page("flag", None, size).await,
                Err(RepositoryError::InvalidPageSize)
            ));
        }

        let page = repo.get_page(None, MAX_PAGE_SIZE).await.unwrap();
        assert_eq!(ids(&page.items), vec!["a"]);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn test_blank_search_page_is_empty() {
        let (_dir, repo) = setup();
        repo.put(&resource("a", "Anything", &[]), WriteMode::Merge).await.unwrap();

        let page = repo.search_page(" ", None, 5).await.unwrap();
        assert_eq!(page, PageResult::empty());
    }

    #[tokio::test]
    async fn test_missing_cursor_restarts() {
        let (_dir, repo) = setup();
        for id in ["a", "b", "c"] {
            repo.put(&resource(id, id, &[]), WriteMode::Merge).await.unwrap();
        }

        let page = repo.get_page(Some("deleted"), 2).await.unwrap();
        assert_eq!(ids(&page.items), vec!["c", "b"]);
        assert_eq!(page.last_item_id.as_deref(), Some("b"));
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn test_page_tops_up_past_malformed_rows() {
        let (_dir, repo) = setup();
        for id in ["a", "b", "c", "d"] {
            repo.put(&resource(id, id, &[]), WriteMode::Merge).await.unwrap();
        }
        // "c" loses its title so it no longer maps.
        let broken = Fields::from([
            ("title".to_string(), FieldValue::value(json!(null))),
        ]);
        repo.store
            .set(DEFAULT_COLLECTION, "c", broken, WriteMode::Merge)
            .await
            .unwrap();

        let first = repo.get_page(None, 2).await.unwrap();
        assert_eq!(ids(&first.items), vec!["d", "b"]);
        assert_eq!(first.last_item_id.as_deref(), Some("b"));
        assert!(first.has_next);

        let second = repo.get_page(first.last_item_id.as_deref(), 2).await.unwrap();
        assert_eq!(ids(&second.items), vec!["a"]);
        assert!(!second.has_next);
        assert_eq!(repo.metrics().snapshot().malformed_skipped, 1);
    }

    #[tokio::test]
    async fn test_remove_and_remove_all() {
        let (_dir, repo) = setup();
        let batch: Vec<Resource> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| resource(id, id, &[]))
            .collect();
        repo.put_all(&batch, WriteMode::Merge).await.unwrap();

        repo.remove("a").await.unwrap();
        repo.remove_all(["b", "c"]).await.unwrap();

        assert_eq!(ids(&repo.get_all().await.unwrap()), vec!["d"]);
        assert_eq!(repo.metrics().snapshot().resources_removed, 3);
    }

    #[tokio::test]
    async fn test_watch_title_prefix_blank_yields_once() {
        let (_dir, repo) = setup();
        let mut stream = repo.watch_title_prefix("").await.unwrap();

        assert!(stream.next().await.unwrap().unwrap().is_empty());
        assert!(stream.next().await.is_none());
    }
}
