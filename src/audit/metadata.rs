//! Audit metadata carried by persisted entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and modification stamps of one entity.
///
/// Flattened into the entity's serialized form. Unset fields are omitted, so
/// an entity that declares no audit fields serializes without any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Which audit fields an entity type declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditFields {
    pub created_at: bool,
    pub updated_at: bool,
    pub created_by: bool,
    pub updated_by: bool,
}

impl AuditFields {
    /// No audit fields; saves leave the metadata untouched.
    pub const NONE: Self = Self {
        created_at: false,
        updated_at: false,
        created_by: false,
        updated_by: false,
    };

    /// `created_at` and `updated_at`.
    pub const TIMESTAMPS: Self = Self {
        created_at: true,
        updated_at: true,
        created_by: false,
        updated_by: false,
    };

    /// Timestamps and actors.
    pub const ALL: Self = Self {
        created_at: true,
        updated_at: true,
        created_by: true,
        updated_by: true,
    };

    pub const fn is_empty(&self) -> bool {
        !(self.created_at || self.updated_at || self.created_by || self.updated_by)
    }

    pub const fn tracks_actor(&self) -> bool {
        self.created_by || self.updated_by
    }
}

/// Access to an entity's audit metadata and its static field declaration.
pub trait Auditable {
    /// Fields the audit hook maintains for this type.
    const AUDIT_FIELDS: AuditFields = AuditFields::NONE;

    fn audit_metadata(&self) -> &AuditMetadata;

    fn audit_metadata_mut(&mut self) -> &mut AuditMetadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_not_serialized() {
        let json = serde_json::to_value(AuditMetadata::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn field_sets() {
        assert!(AuditFields::NONE.is_empty());
        assert!(!AuditFields::TIMESTAMPS.tracks_actor());
        assert!(AuditFields::ALL.tracks_actor());
    }
}
