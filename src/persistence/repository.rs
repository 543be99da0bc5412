//! Typed access to one entity collection.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::persistence::entity::Entity;
use crate::persistence::hook::{PersistHook, PersistOp, SaveContext};
use crate::persistence::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("entity type {0} is not registered")]
    NotRegistered(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot map {collection}/{id}: {source}")]
    Codec {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Striped locks serializing saves of the same `(collection, id)`.
///
/// Keeps the insert-or-update decision and the write atomic with respect to
/// other saves of the same entity in this process.
pub(crate) struct KeyLocks {
    stripes: Box<[Mutex<()>]>,
}

impl KeyLocks {
    pub(crate) fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe(&self, collection: &str, id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (collection, id).hash(&mut hasher);
        &self.stripes[(hasher.finish() % self.stripes.len() as u64) as usize]
    }
}

/// Repository for entity type `E`, obtained from
/// [`Persistence::repository`](crate::persistence::Persistence::repository).
pub struct Repository<E> {
    store: Arc<dyn DocumentStore>,
    hooks: Arc<[Arc<dyn PersistHook>]>,
    locks: Arc<KeyLocks>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hooks: Arc::clone(&self.hooks),
            locks: Arc::clone(&self.locks),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        hooks: Arc<[Arc<dyn PersistHook>]>,
        locks: Arc<KeyLocks>,
    ) -> Self {
        Self {
            store,
            hooks,
            locks,
            _entity: PhantomData,
        }
    }

    /// Insert or update `entity`, running every before-save hook first.
    ///
    /// On success the entity holds the metadata that was persisted. On
    /// failure it is left as it was passed in.
    pub async fn save(&self, entity: &mut E) -> Result<PersistOp, PersistError> {
        let id = entity.id();
        let _guard = self.locks.stripe(E::COLLECTION, &id).lock().await;

        let stored = self.find(&id).await?;
        let op = if stored.is_some() {
            PersistOp::Update
        } else {
            PersistOp::Insert
        };

        let mut stamped = entity.audit_metadata().clone();
        {
            let mut ctx = SaveContext {
                collection: E::COLLECTION,
                id: &id,
                op,
                declared: E::AUDIT_FIELDS,
                metadata: &mut stamped,
                stored: stored.as_ref().map(|s| s.audit_metadata()),
            };
            for hook in self.hooks.iter() {
                hook.before_save(&mut ctx);
            }
        }

        let original = std::mem::replace(entity.audit_metadata_mut(), stamped);
        if let Err(e) = self.write(entity, &id).await {
            *entity.audit_metadata_mut() = original;
            return Err(e);
        }

        metrics::record_save(E::COLLECTION, op);
        tracing::debug!(collection = E::COLLECTION, id = %id, op = %op, "Entity saved");
        Ok(op)
    }

    async fn write(&self, entity: &E, id: &str) -> Result<(), PersistError> {
        let document = serde_json::to_value(entity).map_err(|source| PersistError::Codec {
            collection: E::COLLECTION,
            id: id.to_string(),
            source,
        })?;
        self.store.put(E::COLLECTION, id, document).await?;
        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<Option<E>, PersistError> {
        match self.store.get(E::COLLECTION, id).await? {
            Some(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|source| PersistError::Codec {
                    collection: E::COLLECTION,
                    id: id.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<bool, PersistError> {
        let _guard = self.locks.stripe(E::COLLECTION, id).lock().await;
        Ok(self.store.delete(E::COLLECTION, id).await?)
    }

    pub async fn list(&self) -> Result<Vec<E>, PersistError> {
        self.store
            .list(E::COLLECTION)
            .await?
            .into_iter()
            .map(|document| {
                serde_json::from_value(document).map_err(|source| PersistError::Codec {
                    collection: E::COLLECTION,
                    id: String::new(),
                    source,
                })
            })
            .collect()
    }
}
