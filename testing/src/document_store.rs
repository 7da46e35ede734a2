//! In-memory versioned document store.
//!
//! Provides fast, deterministic storage for state-store tests, with fault
//! injection for the cases a real backend produces:
//!
//! - forced version conflicts ([`InMemoryDocumentStore::fail_next_updates`])
//! - outages ([`InMemoryDocumentStore::set_unavailable`])
//! - read latency, to make concurrent read-modify-write cycles interleave
//!   ([`InMemoryDocumentStore::with_read_latency`])

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use event_lottery_core::document::{
    Document, DocumentStore, EVENTS_COLLECTION, FieldMutations, Fields, StoreError, StoreFuture,
    Version,
};
use event_lottery_core::EventRecord;
use event_lottery_core::types::EventId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

type Key = (String, String);

#[derive(Clone, Debug)]
struct Stored {
    version: Version,
    fields: Fields,
}

/// In-memory [`DocumentStore`] with optimistic concurrency.
///
/// Cloning shares the underlying data, so a test can keep a handle for
/// assertions while the store under test owns another.
///
/// # Example
///
/// ```
/// use event_lottery_core::document::{DocumentStore, Version};
/// use event_lottery_testing::InMemoryDocumentStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryDocumentStore::new();
/// store.create("events", "gala", serde_json::Map::new()).await?;
///
/// let doc = store.get("events", "gala").await?;
/// assert_eq!(doc.version, Version::INITIAL);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryDocumentStore {
    data: Arc<RwLock<HashMap<Key, Stored>>>,
    forced_conflicts: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
    conflicts: Arc<AtomicUsize>,
    read_latency: Option<Duration>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every read by `latency` after the snapshot is taken, so
    /// concurrent callers read the same version before any of them writes.
    #[must_use]
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = Some(latency);
        self
    }

    /// Make the next `count` conditional updates fail with a version conflict.
    pub fn fail_next_updates(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Toggle an outage: while set, every call fails with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes (creates and updates).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of conditional updates rejected with a conflict.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    /// Seed an event document, replacing any existing one.
    pub fn insert_event(&self, record: &EventRecord) {
        let fields = record.to_fields().unwrap();
        self.data.write().unwrap().insert(
            (EVENTS_COLLECTION.to_string(), record.id.as_str().to_string()),
            Stored {
                version: Version::INITIAL,
                fields,
            },
        );
    }

    /// Seed an arbitrary document, replacing any existing one.
    pub fn insert_raw(&self, collection: &str, id: &str, fields: Fields) {
        self.data.write().unwrap().insert(
            (collection.to_string(), id.to_string()),
            Stored {
                version: Version::INITIAL,
                fields,
            },
        );
    }

    /// Decode the stored event, bypassing faults and latency.
    #[must_use]
    pub fn event(&self, id: &EventId) -> Option<EventRecord> {
        let data = self.data.read().unwrap();
        let stored = data.get(&(EVENTS_COLLECTION.to_string(), id.as_str().to_string()))?;
        EventRecord::from_fields(id.clone(), stored.fields.clone()).ok()
    }

    /// Current version of a document, bypassing faults and latency.
    #[must_use]
    pub fn version(&self, collection: &str, id: &str) -> Option<Version> {
        self.data
            .read()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .map(|stored| stored.version)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Document> {
        Box::pin(async move {
            self.check_available()?;

            let snapshot = self
                .data
                .read()
                .unwrap()
                .get(&(collection.to_string(), id.to_string()))
                .cloned();

            // The snapshot is taken before the delay, like a slow network read.
            if let Some(latency) = self.read_latency {
                tokio::time::sleep(latency).await;
            }

            let stored = snapshot.ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

            Ok(Document {
                id: id.to_string(),
                version: stored.version,
                fields: stored.fields,
            })
        })
    }

    fn conditional_update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        mutations: FieldMutations,
        expected_version: Version,
    ) -> StoreFuture<'a, Version> {
        Box::pin(async move {
            self.check_available()?;

            let mut data = self.data.write().unwrap();
            let stored = data
                .get_mut(&(collection.to_string(), id.to_string()))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;

            if stored.version != expected_version || self.take_forced_conflict() {
                self.conflicts.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(
                    collection,
                    id,
                    expected = %expected_version,
                    actual = %stored.version,
                    "Rejecting conditional update"
                );
                return Err(StoreError::VersionConflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    expected: expected_version,
                    actual: stored.version,
                });
            }

            stored.fields.extend(mutations);
            stored.version = stored.version.next();
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(stored.version)
        })
    }

    fn create<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Fields,
    ) -> StoreFuture<'a, Version> {
        Box::pin(async move {
            self.check_available()?;

            let mut data = self.data.write().unwrap();
            let key = (collection.to_string(), id.to_string());
            if data.contains_key(&key) {
                return Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            data.insert(
                key,
                Stored {
                    version: Version::INITIAL,
                    fields,
                },
            );
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(Version::INITIAL)
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            self.data
                .write()
                .unwrap()
                .remove(&(collection.to_string(), id.to_string()));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn update_merges_fields_and_bumps_version() {
        let store = InMemoryDocumentStore::new();
        store
            .create("events", "e1", fields(json!({ "name": "E", "totalCancelled": 0 })))
            .await
            .unwrap();

        let version = store
            .conditional_update(
                "events",
                "e1",
                fields(json!({ "totalCancelled": 2 })),
                Version::INITIAL,
            )
            .await
            .unwrap();

        let doc = store.get("events", "e1").await.unwrap();
        assert_eq!(version, Version::new(2));
        assert_eq!(doc.fields["name"], json!("E"));
        assert_eq!(doc.fields["totalCancelled"], json!(2));
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryDocumentStore::new();
        store.insert_raw("events", "e1", Fields::new());
        store
            .conditional_update("events", "e1", Fields::new(), Version::INITIAL)
            .await
            .unwrap();

        let err = store
            .conditional_update("events", "e1", Fields::new(), Version::INITIAL)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.conflict_count(), 1);
    }

    #[tokio::test]
    async fn forced_conflicts_are_consumed_one_per_update() {
        let store = InMemoryDocumentStore::new();
        store.insert_raw("events", "e1", Fields::new());
        store.fail_next_updates(1);

        assert!(
            store
                .conditional_update("events", "e1", Fields::new(), Version::INITIAL)
                .await
                .is_err()
        );
        assert!(
            store
                .conditional_update("events", "e1", Fields::new(), Version::INITIAL)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn outage_fails_every_call_and_create_rejects_duplicates() {
        let store = InMemoryDocumentStore::new();
        store.create("events", "e1", Fields::new()).await.unwrap();
        assert!(matches!(
            store.create("events", "e1", Fields::new()).await,
            Err(StoreError::AlreadyExists { .. })
        ));

        store.set_unavailable(true);
        assert!(matches!(
            store.get("events", "e1").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);

        store.delete("events", "e1").await.unwrap();
        assert!(matches!(
            store.get("events", "e1").await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
