//! File-backed document store.
//!
//! Layout: `<root>/<collection>/<id>.json`. Writes go to a uniquely named
//! temporary file in the same directory and are renamed into place, so a
//! reader never observes a half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use uuid::Uuid;

use crate::persistence::store::{check_key, DocumentStore, StoreError};

const EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    closed: AtomicBool,
}

impl FileStore {
    /// Open (and optionally create) the data directory.
    ///
    /// Fails with [`StoreError::Unavailable`] if the directory is missing and
    /// may not be created, is not a directory, or is not writable.
    pub async fn open(root: impl AsRef<Path>, create_if_missing: bool) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();

        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(StoreError::Unavailable(format!(
                    "{} is not a directory",
                    root.display()
                )))
            }
            Err(e) if e.kind() == ErrorKind::NotFound && create_if_missing => {
                fs::create_dir_all(&root).await.map_err(|e| {
                    StoreError::Unavailable(format!("cannot create {}: {}", root.display(), e))
                })?;
                tracing::info!(path = %root.display(), "Created data directory");
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "{}: {}",
                    root.display(),
                    e
                )))
            }
        }

        Ok(Self {
            root,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root
            .join(collection)
            .join(format!("{}.{}", id, EXTENSION))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    /// Round-trips a probe file to prove the directory is writable.
    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        fs::write(&probe, b"ok").await.map_err(|e| {
            StoreError::Unavailable(format!("{} is not writable: {}", self.root.display(), e))
        })?;
        fs::remove_file(&probe).await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_open()?;
        check_key(collection, id)?;
        match fs::read(self.document_path(collection, id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<bool, StoreError> {
        self.ensure_open()?;
        check_key(collection, id)?;

        let dir = self.root.join(collection);
        fs::create_dir_all(&dir).await?;

        let target = self.document_path(collection, id);
        let tmp = dir.join(format!(".{}.{}.tmp", id, Uuid::new_v4()));
        let bytes = serde_json::to_vec_pretty(&document)?;

        fs::write(&tmp, bytes).await?;
        let replaced = fs::try_exists(&target).await?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(replaced)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        check_key(collection, id)?;
        match fs::remove_file(self.document_path(collection, id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.ensure_open()?;
        let mut entries = match fs::read_dir(self.root.join(collection)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !hidden && path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path).await?;
            documents.push(serde_json::from_slice(&bytes)?);
        }
        Ok(documents)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(path = %self.root.display(), "File store closed");
        Ok(())
    }
}
