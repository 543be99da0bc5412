//! Before-save interception.

use std::fmt;

use crate::audit::{AuditFields, AuditMetadata};

/// Kind of write a save turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    /// No document with this id existed.
    Insert,
    /// A document with this id was replaced.
    Update,
}

impl PersistOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistOp::Insert => "insert",
            PersistOp::Update => "update",
        }
    }
}

impl fmt::Display for PersistOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook sees of the entity about to be written.
#[derive(Debug)]
pub struct SaveContext<'a> {
    pub collection: &'a str,
    pub id: &'a str,
    pub op: PersistOp,
    /// Audit fields the entity type declares.
    pub declared: AuditFields,
    /// Metadata of the instance being saved. Hooks write here.
    pub metadata: &'a mut AuditMetadata,
    /// Metadata of the currently stored version, for updates.
    pub stored: Option<&'a AuditMetadata>,
}

/// Callback run by the persistence layer before every write.
///
/// Runs synchronously on the saving task and may be called concurrently for
/// different entities.
pub trait PersistHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn before_save(&self, ctx: &mut SaveContext<'_>);
}
