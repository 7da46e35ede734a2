//! Document store abstraction.
//!
//! The event record lives in a remote key-document database. This module
//! defines the minimal interface the lottery needs from it:
//!
//! - Read a document together with its version
//! - Write field mutations conditioned on that version (optimistic concurrency)
//! - Create and delete documents
//!
//! Any transactional document database (or an in-memory map, see the
//! `event-lottery-testing` crate) can back it.
//!
//! # Example
//!
//! ```no_run
//! use event_lottery_core::document::{DocumentStore, FieldMutations, StoreError};
//!
//! async fn bump<S: DocumentStore + ?Sized>(store: &S) -> Result<(), StoreError> {
//!     let doc = store.get("events", "gala").await?;
//!     let mut changes = FieldMutations::new();
//!     changes.insert("totalCancelled".into(), serde_json::json!(1));
//!     store.conditional_update("events", "gala", changes, doc.version).await?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Collection holding event documents.
pub const EVENTS_COLLECTION: &str = "events";

/// Collection holding user profile documents.
pub const USERS_COLLECTION: &str = "users";

/// Named fields of a document.
pub type Fields = Map<String, Value>;

/// Field-level overwrites applied by one update. Fields not named are kept.
pub type FieldMutations = Map<String, Value>;

/// Boxed future returned by the store traits.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Monotonic document version used for optimistic concurrency.
///
/// Every successful write increments the version by one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly created document.
    pub const INITIAL: Self = Self(1);

    /// Create a version number.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version after one more write.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document and the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Document id within its collection.
    pub id: String,
    /// Version at read time.
    pub version: Version,
    /// Stored fields.
    pub fields: Fields,
}

/// Errors returned by a [`DocumentStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No document with this id.
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Missing id.
        id: String,
    },

    /// A document with this id already exists.
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists {
        /// Collection written.
        collection: String,
        /// Existing id.
        id: String,
    },

    /// The document changed since it was read.
    #[error("Version conflict on {collection}/{id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Collection written.
        collection: String,
        /// Document id.
        id: String,
        /// Version the writer read.
        expected: Version,
        /// Version currently stored.
        actual: Version,
    },

    /// Backend or network failure.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this is an optimistic-concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Transactional key-document store.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the store can
/// be shared as `Arc<dyn DocumentStore>`.
///
/// # Cancellation
///
/// Dropping a returned future abandons the call. A conditional update that was
/// dropped may or may not have been applied; callers re-read before acting on
/// the document again.
pub trait DocumentStore: Send + Sync {
    /// Read a document.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such document
    /// - `Unavailable`: backend failure
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Document>;

    /// Overwrite the named fields if the document is still at
    /// `expected_version`, returning the new version.
    ///
    /// # Errors
    ///
    /// - `VersionConflict`: the document was written since it was read
    /// - `NotFound`: no such document
    /// - `Unavailable`: backend failure
    fn conditional_update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        mutations: FieldMutations,
        expected_version: Version,
    ) -> StoreFuture<'a, Version>;

    /// Create a new document at [`Version::INITIAL`].
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: the id is taken
    /// - `Unavailable`: backend failure
    fn create<'a>(&'a self, collection: &'a str, id: &'a str, fields: Fields)
    -> StoreFuture<'a, Version>;

    /// Delete a document. Deleting a missing document succeeds.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_display() {
        let error = StoreError::VersionConflict {
            collection: EVENTS_COLLECTION.to_string(),
            id: "gala".to_string(),
            expected: Version::new(3),
            actual: Version::new(4),
        };

        let display = error.to_string();
        assert!(display.contains("events/gala"));
        assert!(display.contains("expected 3, found 4"));
        assert!(error.is_conflict());
    }

    #[test]
    fn versions_advance_by_one() {
        assert_eq!(Version::INITIAL.next(), Version::new(2));
        assert!(!StoreError::Unavailable("timeout".into()).is_conflict());
    }
}
