//! Startup-time registry of entity types.
//!
//! Every entity type is registered in the composition root before serving
//! starts. Declaration mistakes are reported here so that they fail the
//! process at startup instead of surfacing on the first save.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::persistence::entity::{Entity, EntityDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{type_name}: collection name '{collection}' must be 1-64 chars of [a-z0-9_-]")]
    InvalidCollection {
        type_name: &'static str,
        collection: &'static str,
    },

    #[error("collection '{collection}' declared by both {first} and {second}")]
    DuplicateCollection {
        collection: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("{type_name}: {actor_field} declared without {timestamp_field}")]
    ActorWithoutTimestamp {
        type_name: &'static str,
        actor_field: &'static str,
        timestamp_field: &'static str,
    },

    #[error("{type_name}: declares actor fields but audit.track_actor is disabled")]
    ActorTrackingDisabled { type_name: &'static str },
}

/// Entity types known to the persistence layer, keyed by collection.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: BTreeMap<&'static str, EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E`, checking its declaration.
    pub fn register<E: Entity>(&mut self) -> Result<(), RegistryError> {
        self.insert(EntityDescriptor::of::<E>())
    }

    pub fn insert(&mut self, descriptor: EntityDescriptor) -> Result<(), RegistryError> {
        check_declaration(&descriptor)?;

        if let Some(existing) = self.entries.get(descriptor.collection) {
            return Err(RegistryError::DuplicateCollection {
                collection: descriptor.collection,
                first: existing.type_name,
                second: descriptor.type_name,
            });
        }

        self.entries.insert(descriptor.collection, descriptor);
        Ok(())
    }

    /// Cross-check declarations against the audit settings in effect.
    pub fn check_audit_settings(&self, track_actor: bool) -> Result<(), RegistryError> {
        if track_actor {
            return Ok(());
        }
        match self.entries.values().find(|d| d.audit_fields.tracks_actor()) {
            Some(d) => Err(RegistryError::ActorTrackingDisabled {
                type_name: d.type_name,
            }),
            None => Ok(()),
        }
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.entries
            .get(E::COLLECTION)
            .is_some_and(|d| d.type_name == std::any::type_name::<E>())
    }

    pub fn collections(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collection names double as directory names, so keep them portable.
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

fn check_declaration(d: &EntityDescriptor) -> Result<(), RegistryError> {
    if !is_valid_collection_name(d.collection) {
        return Err(RegistryError::InvalidCollection {
            type_name: d.type_name,
            collection: d.collection,
        });
    }

    let fields = d.audit_fields;
    if fields.created_by && !fields.created_at {
        return Err(RegistryError::ActorWithoutTimestamp {
            type_name: d.type_name,
            actor_field: "created_by",
            timestamp_field: "created_at",
        });
    }
    if fields.updated_by && !fields.updated_at {
        return Err(RegistryError::ActorWithoutTimestamp {
            type_name: d.type_name,
            actor_field: "updated_by",
            timestamp_field: "updated_at",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditFields;

    fn descriptor(collection: &'static str, audit_fields: AuditFields) -> EntityDescriptor {
        EntityDescriptor {
            collection,
            type_name: "tests::Thing",
            audit_fields,
        }
    }

    #[test]
    fn collection_names() {
        assert!(is_valid_collection_name("course_enrollments"));
        assert!(is_valid_collection_name("v2-courses"));
        assert!(!is_valid_collection_name(""));
        assert!(!is_valid_collection_name("Courses"));
        assert!(!is_valid_collection_name("../etc"));
        assert!(!is_valid_collection_name(&"x".repeat(65)));
    }

    #[test]
    fn rejects_duplicates() {
        let mut registry = EntityRegistry::new();
        registry
            .insert(descriptor("courses", AuditFields::TIMESTAMPS))
            .unwrap();
        let err = registry
            .insert(descriptor("courses", AuditFields::NONE))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCollection { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_actor_without_timestamp() {
        let mut registry = EntityRegistry::new();
        let fields = AuditFields {
            created_by: true,
            ..AuditFields::NONE
        };
        let err = registry.insert(descriptor("courses", fields)).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::ActorWithoutTimestamp { actor_field: "created_by", .. }
        ));
    }

    #[test]
    fn actor_fields_need_actor_tracking() {
        let mut registry = EntityRegistry::new();
        registry.insert(descriptor("courses", AuditFields::ALL)).unwrap();

        assert!(registry.check_audit_settings(true).is_ok());
        assert!(matches!(
            registry.check_audit_settings(false),
            Err(RegistryError::ActorTrackingDisabled { .. })
        ));
    }
}
