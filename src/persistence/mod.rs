//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! Repository<E>::save(&mut entity)
//!     → stored version loaded (insert vs update)
//!     → hook.rs (before-save hooks, audit hook last)
//!     → store.rs (DocumentStore::put)
//!         → memory.rs | file.rs
//! ```
//!
//! # Design Decisions
//! - Hooks are passed to the constructor; nothing is discovered at runtime
//! - Only registered entity types get a repository
//! - Saves of the same entity are serialized; different entities run in parallel

pub mod entity;
pub mod file;
pub mod hook;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod store;

use std::sync::Arc;

use crate::audit::AuditingHook;

pub use entity::{Entity, EntityDescriptor};
pub use hook::{PersistHook, PersistOp, SaveContext};
pub use registry::{EntityRegistry, RegistryError};
pub use repository::{PersistError, Repository};
pub use store::{connect_store, open_store, DocumentStore, StoreError};

use repository::KeyLocks;

const LOCK_STRIPES: usize = 64;

/// Construction-time options of the persistence layer.
#[derive(Default)]
pub struct PersistenceOptions {
    /// Audit hook to run on every save. `None` leaves audit fields untouched.
    pub auditing: Option<AuditingHook>,

    /// Additional hooks, run before the audit hook.
    pub hooks: Vec<Arc<dyn PersistHook>>,
}

impl PersistenceOptions {
    pub fn with_auditing(mut self, hook: AuditingHook) -> Self {
        self.auditing = Some(hook);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn PersistHook>) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// The persistence layer: a store, its hooks and the registered entity types.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn DocumentStore>,
    hooks: Arc<[Arc<dyn PersistHook>]>,
    registry: Arc<EntityRegistry>,
    locks: Arc<KeyLocks>,
    auditing: bool,
    tracks_actor: bool,
}

impl Persistence {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: EntityRegistry,
        options: PersistenceOptions,
    ) -> Self {
        let auditing = options.auditing.is_some();
        let tracks_actor = options
            .auditing
            .as_ref()
            .is_some_and(AuditingHook::tracks_actor);

        let mut hooks = options.hooks;
        if let Some(audit) = options.auditing {
            hooks.push(Arc::new(audit));
        }

        tracing::debug!(
            backend = store.backend(),
            hooks = ?hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            entities = registry.len(),
            "Persistence layer assembled"
        );

        Self {
            store,
            hooks: hooks.into(),
            registry: Arc::new(registry),
            locks: Arc::new(KeyLocks::new(LOCK_STRIPES)),
            auditing,
            tracks_actor,
        }
    }

    /// Repository for a registered entity type.
    pub fn repository<E: Entity>(&self) -> Result<Repository<E>, PersistError> {
        if !self.registry.contains::<E>() {
            return Err(PersistError::NotRegistered(std::any::type_name::<E>()));
        }
        Ok(Repository::new(
            Arc::clone(&self.store),
            Arc::clone(&self.hooks),
            Arc::clone(&self.locks),
        ))
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn auditing_enabled(&self) -> bool {
        self.auditing
    }

    pub fn tracks_actor(&self) -> bool {
        self.tracks_actor
    }

    /// Release the underlying store.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }
}
