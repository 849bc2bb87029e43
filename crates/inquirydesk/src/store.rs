//! Record store abstraction.
//!
//! The submission controller only needs one thing from the system of record:
//! append a [`SubmissionRecord`] to a named collection and report success or
//! failure exactly once. [`SqliteRecordStore`] is the bundled implementation;
//! anything document-shaped (a queue, an HTTP endpoint) can implement the
//! trait.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::form::SubmissionRecord;
use crate::storage::Storage;

/// The collection inquiries are appended to unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "contacts";

/// Errors a record store can report for an append.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store has no collection with this name.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// The backend rejected the write.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Identifier a store assigns to an appended record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a store-specific identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external, append-only sink for submission records.
///
/// Implementations must resolve each call exactly once, with either the
/// new record's identifier or an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append `record` to `collection`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the record was not persisted.
    async fn append(
        &self,
        collection: &str,
        record: SubmissionRecord,
    ) -> Result<RecordId, StoreError>;
}

/// A [`RecordStore`] backed by the local `SQLite` database.
///
/// Inserts run on the blocking thread pool so the async caller is never
/// stalled by disk I/O.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    storage: Arc<Mutex<Storage>>,
    collection: String,
}

impl SqliteRecordStore {
    /// Serve `collection` from an already opened storage.
    #[must_use]
    pub fn new(storage: Storage, collection: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            collection: collection.into(),
        }
    }

    /// Open the database at `path` and serve `collection` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> crate::Result<Self> {
        Ok(Self::new(Storage::open(path)?, collection))
    }

    /// The collection this store accepts.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[cfg(test)]
    fn with_storage<R>(&self, f: impl FnOnce(&Storage) -> R) -> R {
        let storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        f(&storage)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn append(
        &self,
        collection: &str,
        record: SubmissionRecord,
    ) -> Result<RecordId, StoreError> {
        if collection != self.collection {
            return Err(StoreError::UnknownCollection(collection.to_string()));
        }

        let storage = Arc::clone(&self.storage);
        let inserted = tokio::task::spawn_blocking(move || {
            let storage = storage.lock().unwrap_or_else(PoisonError::into_inner);
            storage.insert(&record, Utc::now())
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let id = inserted.map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!("Appended record {} to {}", id, collection);
        Ok(RecordId::from(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{InquiryForm, RecordStatus};

    fn create_test_store() -> SqliteRecordStore {
        let storage = Storage::open_in_memory().expect("failed to create test storage");
        SqliteRecordStore::new(storage, DEFAULT_COLLECTION)
    }

    fn create_test_record() -> SubmissionRecord {
        SubmissionRecord::new(&InquiryForm {
            first_name: "Ada".to_string(),
            last_name: "Okoye".to_string(),
            email: "ada@example.org".to_string(),
            institution: String::new(),
            inquiry_type: "Technical Support".to_string(),
            message: "Need help integrating the API".to_string(),
            consent: true,
        })
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::from(42).to_string(), "42");
        assert_eq!(RecordId::new("abc123").as_str(), "abc123");
    }

    #[test]
    fn test_store_error_display() {
        assert!(StoreError::UnknownCollection("orders".to_string())
            .to_string()
            .contains("orders"));
        assert!(StoreError::Backend("disk full".to_string())
            .to_string()
            .contains("disk full"));
        assert!(StoreError::Unavailable("offline".to_string())
            .to_string()
            .contains("unavailable"));
    }

    #[tokio::test]
    async fn test_append_persists_record() {
        let store = create_test_store();
        let id = store
            .append(DEFAULT_COLLECTION, create_test_record())
            .await
            .expect("append should succeed");

        let stored = store.with_storage(|s| {
            s.get(id.as_str().parse().unwrap())
                .unwrap()
                .expect("record should be stored")
        });
        assert_eq!(stored.form.first_name, "Ada");
        assert_eq!(stored.status, RecordStatus::New);
    }

    #[tokio::test]
    async fn test_append_unknown_collection() {
        let store = create_test_store();
        let err = store
            .append("orders", create_test_record())
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::UnknownCollection("orders".to_string()));
        assert_eq!(store.with_storage(|s| s.count().unwrap()), 0);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let store = create_test_store();
        let other = store.clone();

        other
            .append(DEFAULT_COLLECTION, create_test_record())
            .await
            .unwrap();
        assert_eq!(store.with_storage(|s| s.count().unwrap()), 1);
        assert_eq!(store.collection(), DEFAULT_COLLECTION);
    }
}
