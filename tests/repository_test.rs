//! Resource repository over an on-disk document store

use futures::StreamExt;
use resdesk::docstore::{DocumentStore, FieldValue, Fields, FjallDocumentStore, WriteMode};
use resdesk::domain::Resource;
use resdesk::repository::{DEFAULT_COLLECTION, ResourceRepository};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{Duration, timeout};

struct Fixture {
    _dir: TempDir,
    store: Arc<FjallDocumentStore>,
    repo: ResourceRepository,
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FjallDocumentStore::open(dir.path().join("db")).unwrap());
    let repo = ResourceRepository::new(store.clone());
    Fixture {
        _dir: dir,
        store,
        repo,
    }
}

fn resource(n: usize) -> Resource {
    Resource::new(
        format!("res-{n:03}"),
        format!("Resource {n:03}"),
        format!("https://i.ibb.co/{n}/image.png"),
        [if n % 2 == 0 { "flag" } else { "tourist" }],
    )
    .unwrap()
}

async fn seed(repo: &ResourceRepository, count: usize) {
    for n in 0..count {
        repo.put(&resource(n), WriteMode::Merge).await.unwrap();
    }
}

#[tokio::test]
async fn test_round_trip_keeps_fields() {
    let f = setup();
    let original = Resource::new(
        "r-1",
        "Sydney Opera House",
        "https://i.ibb.co/abc/opera.jpg",
        ["tourist", "oceania", "landmark"],
    )
    .unwrap();

    f.repo.put(&original, WriteMode::Replace).await.unwrap();
    let loaded = f.repo.get_by_id("r-1").await.unwrap().unwrap();

    assert_eq!(loaded.id(), original.id());
    assert_eq!(loaded.title(), original.title());
    assert_eq!(loaded.url(), original.url());
    assert_eq!(loaded.tags(), original.tags());
}

#[tokio::test]
async fn test_paging_visits_every_record_once() {
    for (total, page_size) in [(0, 3), (7, 3), (9, 3), (5, 1), (4, 10)] {
        let f = setup();
        seed(&f.repo, total).await;

        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut remaining = total;

        loop {
            let page = f.repo.get_page(cursor.as_deref(), page_size).await.unwrap();
            assert_eq!(page.len(), page_size.min(remaining), "total={total} size={page_size}");

            if page.len() < page_size {
                assert!(!page.has_next, "short page must not report more");
            }
            for item in &page.items {
                assert!(seen.insert(item.id().to_string()), "duplicate {}", item.id());
            }
            remaining -= page.len();

            if !page.has_next {
                break;
            }
            cursor = page.last_item_id.clone();
        }

        assert_eq!(seen.len(), total);
        assert_eq!(remaining, 0);
    }
}

#[tokio::test]
async fn test_exact_multiple_reports_one_extra_page() {
    let f = setup();
    seed(&f.repo, 4).await;

    let first = f.repo.get_page(None, 2).await.unwrap();
    let second = f.repo.get_page(first.last_item_id.as_deref(), 2).await.unwrap();
    assert!(second.has_next);

    let third = f.repo.get_page(second.last_item_id.as_deref(), 2).await.unwrap();
    assert!(third.is_empty());
    assert!(!third.has_next);
    assert!(third.last_item_id.is_none());
}

#[tokio::test]
async fn test_search_and_tag_pages() {
    let f = setup();
    seed(&f.repo, 12).await;
    let other = Resource::new("x", "Other", "https://e.com/x.png", ["flag"]).unwrap();
    f.repo.put(&other, WriteMode::Merge).await.unwrap();

    let first = f.repo.search_page("Resource 00", None, 4).await.unwrap();
    let titles: Vec<&str> = first.items.iter().map(Resource::title).collect();
    assert_eq!(
        titles,
        vec!["Resource 000", "Resource 001", "Resource 002", "Resource 003"]
    );
    let rest = f
        .repo
        .search_page("Resource 00", first.last_item_id.as_deref(), 4)
        .await
        .unwrap();
    assert_eq!(rest.len(), 4);

    let flags = f.repo.filter_by_tag_page("flag", None, 10).await.unwrap();
    assert_eq!(flags.items[0].id(), "x");
    assert_eq!(flags.len(), 7);
    assert!(!flags.has_next);
}

#[tokio::test]
async fn test_remove_all_removes_exactly_given_ids() {
    let f = setup();
    seed(&f.repo, 6).await;

    f.repo
        .remove_all(["res-001", "res-004", "res-404"])
        .await
        .unwrap();

    let left: HashSet<String> = f
        .repo
        .get_all()
        .await
        .unwrap()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    let expected: HashSet<String> = ["res-000", "res-002", "res-003", "res-005"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(left, expected);
}

#[tokio::test]
async fn test_malformed_documents_are_skipped() {
    let f = setup();
    seed(&f.repo, 3).await;

    let bogus = Fields::from([
        ("id".to_string(), FieldValue::value("bogus")),
        ("title".to_string(), FieldValue::value("Broken")),
        ("url".to_string(), FieldValue::value("no scheme here")),
        ("createdAt".to_string(), FieldValue::ServerTimestamp),
    ]);
    f.store
        .set(DEFAULT_COLLECTION, "bogus", bogus, WriteMode::Replace)
        .await
        .unwrap();

    assert_eq!(f.repo.get_all().await.unwrap().len(), 3);
    assert!(f.repo.get_by_id("bogus").await.unwrap().is_none());
    assert_eq!(f.repo.search_by_title_prefix("Bro").await.unwrap().len(), 0);
    assert_eq!(f.repo.metrics().snapshot().malformed_skipped, 3);
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let f = setup();
    let archive = ResourceRepository::new(f.store.clone()).with_collection("archive");

    f.repo.put(&resource(1), WriteMode::Merge).await.unwrap();
    archive.put(&resource(2), WriteMode::Merge).await.unwrap();

    assert_eq!(f.repo.get_all().await.unwrap().len(), 1);
    assert!(archive.get_by_id("res-001").await.unwrap().is_none());
}

#[tokio::test]
async fn test_watch_all_redelivers_and_releases() {
    let f = setup();
    f.repo.put(&resource(1), WriteMode::Merge).await.unwrap();

    let mut stream = f.repo.watch_all().await.unwrap();
    let initial = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(initial.len(), 1);
    assert_eq!(f.store.active_listeners(), 1);

    f.repo.put(&resource(2), WriteMode::Merge).await.unwrap();
    let updated = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(updated[0].id(), "res-002");
    assert_eq!(updated.len(), 2);

    drop(stream);
    assert_eq!(f.store.active_listeners(), 0);
}

#[tokio::test]
async fn test_watch_title_prefix_filters() {
    let f = setup();
    let mut stream = f.repo.watch_title_prefix("Resource 01").await.unwrap();

    let initial = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(initial.is_empty());

    f.repo.put(&resource(11), WriteMode::Merge).await.unwrap();

    // Changes that do not match still re-deliver; wait for the matching one.
    let matched = timeout(Duration::from_secs(5), async {
        loop {
            let batch = stream.next().await.unwrap().unwrap();
            if !batch.is_empty() {
                return batch;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(matched[0].id(), "res-011");
}
