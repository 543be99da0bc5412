//! Document store port.
//!
//! The persistence layer talks to storage only through [`DocumentStore`].
//! Documents are JSON values addressed by `(collection, id)`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{PersistenceBackend, PersistenceConfig};
use crate::persistence::file::FileStore;
use crate::persistence::memory::MemoryStore;
use crate::persistence::registry::is_valid_collection_name;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot be reached or used at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid key {collection}/{id}")]
    InvalidKey { collection: String, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store is closed")]
    Closed,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check that the backend is usable.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Write a document. Returns `true` when an existing one was replaced.
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError>;

    /// Returns `true` when a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// Release the backend. Later calls fail with [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;
}

/// Open the configured backend, bounded by `connect_timeout_secs`.
pub async fn open_store(config: &PersistenceConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store = within_connect_timeout(config, async {
        let store: Arc<dyn DocumentStore> = match config.backend {
            PersistenceBackend::Memory => Arc::new(MemoryStore::new()),
            PersistenceBackend::File => {
                let path = config.path.as_deref().ok_or_else(|| {
                    StoreError::Unavailable("file backend configured without a path".into())
                })?;
                Arc::new(FileStore::open(path, config.create_if_missing).await?)
            }
        };
        store.ping().await?;
        Ok(store)
    })
    .await?;

    tracing::info!(backend = store.backend(), "Persistence backend opened");
    Ok(store)
}

/// Check that an externally constructed store answers, bounded by
/// `connect_timeout_secs`.
pub async fn connect_store(
    store: Arc<dyn DocumentStore>,
    config: &PersistenceConfig,
) -> Result<Arc<dyn DocumentStore>, StoreError> {
    within_connect_timeout(config, store.ping()).await?;
    tracing::info!(backend = store.backend(), "Persistence backend attached");
    Ok(store)
}

async fn within_connect_timeout<T, F>(config: &PersistenceConfig, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        StoreError::Unavailable(format!("timed out after {}s", config.connect_timeout_secs))
    })?
}

/// Reject keys that are unsafe to use as path components.
pub(crate) fn check_key(collection: &str, id: &str) -> Result<(), StoreError> {
    let id_ok = !id.is_empty()
        && id.len() <= 128
        && !id.starts_with('.')
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));

    if id_ok && is_valid_collection_name(collection) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }
}
