//! In-process document store backed by a concurrent map.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::persistence::store::{check_key, DocumentStore, StoreError};

/// Documents keyed by `(collection, id)`. Contents live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), Value>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_open()?;
        check_key(collection, id)?;
        Ok(self
            .documents
            .get(&(collection.to_string(), id.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        self.ensure_open()?;
        check_key(collection, id)?;
        Ok(self
            .documents
            .insert((collection.to_string(), id.to_string()), document)
            .is_some())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        check_key(collection, id)?;
        Ok(self
            .documents
            .remove(&(collection.to_string(), id.to_string()))
            .is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.ensure_open()?;
        let mut found: Vec<(String, Value)> = self
            .documents
            .iter()
            .filter(|r| r.key().0 == collection)
            .map(|r| (r.key().1.clone(), r.value().clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(documents = self.documents.len(), "Memory store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_reports_replacement() {
        let store = MemoryStore::new();
        assert!(!store.put("courses", "c-1", json!({"v": 1})).await.unwrap());
        assert!(store.put("courses", "c-1", json!({"v": 2})).await.unwrap());
        assert_eq!(
            store.get("courses", "c-1").await.unwrap(),
            Some(json!({"v": 2}))
        );
    }

    #[tokio::test]
    async fn list_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        store.put("courses", "b", json!("b")).await.unwrap();
        store.put("courses", "a", json!("a")).await.unwrap();
        store.put("faculty", "z", json!("z")).await.unwrap();

        assert_eq!(
            store.list("courses").await.unwrap(),
            vec![json!("a"), json!("b")]
        );
    }

    #[tokio::test]
    async fn closed_store_rejects_calls() {
        let store = MemoryStore::new();
        store.close().await.unwrap();
        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
        assert!(matches!(
            store.get("courses", "c-1").await,
            Err(StoreError::Closed)
        ));
    }
}
