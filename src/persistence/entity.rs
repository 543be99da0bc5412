//! Entity declarations.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::audit::{AuditFields, Auditable};

/// A record the persistence layer can store.
///
/// Implementors embed an [`AuditMetadata`](crate::audit::AuditMetadata)
/// (usually `#[serde(flatten)]`) and declare through
/// [`Auditable::AUDIT_FIELDS`] which of its fields the audit hook maintains.
pub trait Entity: Auditable + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection (table) name. Also the directory name for the file backend.
    const COLLECTION: &'static str;

    fn id(&self) -> String;
}

/// Static description of a registered entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub collection: &'static str,
    pub type_name: &'static str,
    pub audit_fields: AuditFields,
}

impl EntityDescriptor {
    pub fn of<E: Entity>() -> Self {
        Self {
            collection: E::COLLECTION,
            type_name: std::any::type_name::<E>(),
            audit_fields: E::AUDIT_FIELDS,
        }
    }
}
