use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::DocumentStore;
use super::document::{DocumentSnapshot, WriteMode, WriteOp, apply_set};
use super::error::{Result, StoreError};
use super::keys::{
    check_collection, check_id, decode_doc_key, encode_collection_prefix, encode_doc_key,
};
use super::live::{ListenerRegistration, LiveQuery};
use super::query::Query;

pub const DEFAULT_CHANGE_BUFFER: usize = 64;

/// Results buffered per live query before the producer waits on the consumer.
const LIVE_QUERY_BUFFER: usize = 16;

const META_CLOCK: &[u8] = b"clock";

/// Emitted after every committed batch.
#[derive(Debug, Clone)]
struct ChangeEvent {
    collection: String,
}

struct Inner {
    keyspace: Keyspace,
    documents: PartitionHandle,
    metadata: PartitionHandle,
    write_lock: Mutex<()>,
    clock: AtomicI64,
    changes: broadcast::Sender<ChangeEvent>,
    listeners: Arc<AtomicUsize>,
}

/// Embedded document store backed by Fjall.
///
/// Layout:
/// - `documents` partition: `{collection}/{id}` -> JSON object of fields
/// - `metadata` partition: `clock` -> last issued server timestamp (i64 BE)
///
/// Writes go through one lock so merges read a consistent base, and each
/// batch lands atomically. Server timestamps are strictly increasing across
/// commits, including across reopen.
#[derive(Clone)]
pub struct FjallDocumentStore {
    inner: Arc<Inner>,
}

impl FjallDocumentStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_CHANGE_BUFFER)
    }

    /// Open with an explicit change-notification buffer size
    pub fn open_with_capacity<P: AsRef<Path>>(path: P, change_buffer: usize) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening document store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let documents = keyspace.open_partition("documents", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        let last_timestamp = metadata
            .get(META_CLOCK)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_ref()).ok())
            .map(i64::from_be_bytes)
            .unwrap_or(0);

        let (changes, _) = broadcast::channel(change_buffer.max(1));

        info!(last_timestamp, "Document store opened");
        Ok(Self {
            inner: Arc::new(Inner {
                keyspace,
                documents,
                metadata,
                write_lock: Mutex::new(()),
                clock: AtomicI64::new(last_timestamp),
                changes,
                listeners: Arc::new(AtomicUsize::new(0)),
            }),
        })
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.inner.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl Inner {
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .clock
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    fn read(&self, collection: &str, id: &str) -> Result<Option<Map<String, Value>>> {
        let key = encode_doc_key(collection, id);
        Ok(self
            .documents
            .get(&key)?
            .and_then(|value| decode_fields(&key, &value)))
    }

    fn scan(&self, collection: &str) -> Result<Vec<DocumentSnapshot>> {
        let prefix = encode_collection_prefix(collection);
        let mut docs = Vec::new();

        for item in self.documents.prefix(&prefix) {
            let (key, value) = item?;
            let Some((_, id)) = decode_doc_key(&key) else {
                warn!(key = %String::from_utf8_lossy(&key), "Skipping document with malformed key");
                continue;
            };
            if let Some(fields) = decode_fields(&key, &value) {
                docs.push(DocumentSnapshot { id, fields });
            }
        }

        Ok(docs)
    }

    fn commit(&self, collection: &str, ops: &[WriteOp]) -> Result<()> {
        for op in ops {
            check_id(op.id())?;
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.next_timestamp();
        let mut batch = self.keyspace.batch();

        // Later operations on the same id build on earlier ones in this batch.
        let mut staged: HashMap<&str, Option<Map<String, Value>>> = HashMap::new();

        for op in ops {
            let key = encode_doc_key(collection, op.id());
            match op {
                WriteOp::Set { id, fields, mode } => {
                    let existing = match mode {
                        WriteMode::Replace => None,
                        WriteMode::Merge => match staged.get(id.as_str()) {
                            Some(pending) => pending.clone(),
                            None => self.read(collection, id)?,
                        },
                    };
                    let doc = apply_set(existing, fields, *mode, now);
                    batch.insert(&self.documents, key, serde_json::to_vec(&doc)?);
                    staged.insert(id.as_str(), Some(doc));
                }
                WriteOp::Delete { id } => {
                    batch.remove(&self.documents, key);
                    staged.insert(id.as_str(), None);
                }
            }
        }

        batch.insert(&self.metadata, META_CLOCK, now.to_be_bytes().to_vec());
        batch.commit()?;

        debug!(collection, ops = ops.len(), "Committed batch");
        // No receivers simply means nobody is listening.
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
        });
        Ok(())
    }
}

fn decode_fields(key: &[u8], value: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(value) {
        Ok(Value::Object(fields)) => Some(fields),
        Ok(_) => {
            warn!(
                key = %String::from_utf8_lossy(key),
                "Skipping document that is not a JSON object"
            );
            None
        }
        Err(e) => {
            warn!(key = %String::from_utf8_lossy(key), error = %e, "Skipping undecodable document");
            None
        }
    }
}

#[async_trait]
impl DocumentStore for FjallDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentSnapshot>> {
        check_collection(collection)?;
        check_id(id)?;
        let (collection, id) = (collection.to_string(), id.to_string());

        self.run_blocking(move |inner| {
            Ok(inner
                .read(&collection, &id)?
                .map(|fields| DocumentSnapshot { id, fields }))
        })
        .await
    }

    async fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> Result<()> {
        check_collection(collection)?;
        let collection = collection.to_string();
        self.run_blocking(move |inner| inner.commit(&collection, &ops)).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<DocumentSnapshot>> {
        check_collection(collection)?;
        query.validate()?;
        let (collection, query) = (collection.to_string(), query.clone());

        self.run_blocking(move |inner| Ok(query.execute(inner.scan(&collection)?)))
            .await
    }

    async fn listen(&self, collection: &str, query: Query) -> Result<LiveQuery> {
        check_collection(collection)?;
        query.validate()?;

        // Subscribe before the first read so no commit slips between them.
        let mut changes = self.inner.changes.subscribe();
        let registration = ListenerRegistration::register(Arc::clone(&self.inner.listeners));
        let (tx, rx) = mpsc::channel(LIVE_QUERY_BUFFER);
        let store = self.clone();
        let collection = collection.to_string();
        debug!(collection, "Live query registered");

        let task = tokio::spawn(async move {
            loop {
                let result = store.query(&collection, &query).await;
                let failed = result.is_err();
                if tx.send(result).await.is_err() || failed {
                    return;
                }

                loop {
                    match changes.recv().await {
                        Ok(event) if event.collection == collection => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(collection, skipped, "Live query lagged, re-reading");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }

                // Collapse a burst of commits into one re-read.
                while changes.try_recv().is_ok() {}
            }
        });

        Ok(LiveQuery::new(rx, task, registration))
    }

    fn active_listeners(&self) -> usize {
        self.inner.listeners.load(Ordering::SeqCst)
    }
}
