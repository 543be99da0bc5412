//! The audit hook: stamps creation and modification metadata on save.

use std::sync::Arc;

use crate::audit::actor::AuditorAware;
use crate::audit::clock::{Clock, SystemClock};
use crate::observability::metrics;
use crate::persistence::hook::{PersistHook, PersistOp, SaveContext};

/// Before-save hook maintaining `created_*` / `updated_*` fields.
///
/// Rules:
/// - insert: `created_at` / `created_by` are set from the clock and auditor.
/// - update: `created_at` / `created_by` are copied from the stored version,
///   whatever the in-memory instance holds (an unset stored value stays unset).
/// - every save: `updated_at` is set from the clock, but never below the
///   stored value; `updated_by` from the auditor.
///
/// Only declared fields are touched.
#[derive(Clone)]
pub struct AuditingHook {
    clock: Arc<dyn Clock>,
    auditor: Option<Arc<dyn AuditorAware>>,
}

impl AuditingHook {
    /// Timestamps only, from the system clock.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            auditor: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record actors from `auditor` in `created_by` / `updated_by`.
    pub fn with_auditor(mut self, auditor: Arc<dyn AuditorAware>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    pub fn tracks_actor(&self) -> bool {
        self.auditor.is_some()
    }
}

impl Default for AuditingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistHook for AuditingHook {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn before_save(&self, ctx: &mut SaveContext<'_>) {
        if ctx.declared.is_empty() {
            return;
        }

        let now = self.clock.now();
        let actor = self
            .auditor
            .as_ref()
            .and_then(|auditor| auditor.current_auditor());
        let declared = ctx.declared;
        let stored = ctx.stored;
        let meta = &mut *ctx.metadata;

        match ctx.op {
            PersistOp::Insert => {
                if declared.created_at {
                    meta.created_at = Some(now);
                }
                if declared.created_by {
                    meta.created_by = actor.clone();
                }
            }
            PersistOp::Update => {
                // Creation fields only ever come from the stored version, even
                // when it has none.
                if let Some(stored) = stored {
                    if declared.created_at {
                        meta.created_at = stored.created_at;
                    }
                    if declared.created_by {
                        meta.created_by = stored.created_by.clone();
                    }
                }
            }
        }

        if declared.updated_at {
            let floor = stored.and_then(|s| s.updated_at);
            meta.updated_at = Some(match floor {
                Some(previous) if previous > now => previous,
                _ => now,
            });
        }
        if declared.updated_by {
            meta.updated_by = actor;
        }

        metrics::record_audit_stamp(ctx.collection, ctx.op);
        tracing::trace!(
            collection = %ctx.collection,
            id = %ctx.id,
            op = %ctx.op,
            "Audit metadata stamped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::actor::{self, ScopedAuditor};
    use crate::audit::clock::ManualClock;
    use crate::audit::{AuditFields, AuditMetadata};
    use chrono::{Duration, Utc};

    fn ctx<'a>(
        op: PersistOp,
        declared: AuditFields,
        metadata: &'a mut AuditMetadata,
        stored: Option<&'a AuditMetadata>,
    ) -> SaveContext<'a> {
        SaveContext {
            collection: "courses",
            id: "c-1",
            op,
            declared,
            metadata,
            stored,
        }
    }

    #[test]
    fn insert_stamps_both_timestamps() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let hook = AuditingHook::new().with_clock(clock);

        let mut meta = AuditMetadata::default();
        hook.before_save(&mut ctx(PersistOp::Insert, AuditFields::TIMESTAMPS, &mut meta, None));

        assert_eq!(meta.created_at, Some(start));
        assert_eq!(meta.updated_at, Some(start));
        assert_eq!(meta.created_by, None);
    }

    #[test]
    fn update_restores_stored_creation_time() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let hook = AuditingHook::new().with_clock(clock.clone());

        let stored = AuditMetadata {
            created_at: Some(start),
            updated_at: Some(start),
            ..Default::default()
        };
        let mut meta = stored.clone();
        meta.created_at = Some(start - Duration::days(365));
        clock.advance(Duration::seconds(10));

        hook.before_save(&mut ctx(
            PersistOp::Update,
            AuditFields::TIMESTAMPS,
            &mut meta,
            Some(&stored),
        ));

        assert_eq!(meta.created_at, Some(start));
        assert_eq!(meta.updated_at, Some(start + Duration::seconds(10)));
    }

    #[test]
    fn update_cannot_author_missing_creation_fields() {
        let hook = AuditingHook::new().with_auditor(Arc::new(ScopedAuditor::new("system")));

        // Written while auditing was off.
        let stored = AuditMetadata::default();
        let mut meta = AuditMetadata {
            created_at: Some(Utc::now() - Duration::days(3)),
            created_by: Some("impostor".into()),
            ..Default::default()
        };
        hook.before_save(&mut ctx(
            PersistOp::Update,
            AuditFields::ALL,
            &mut meta,
            Some(&stored),
        ));

        assert_eq!(meta.created_at, None);
        assert_eq!(meta.created_by, None);
        assert!(meta.updated_at.is_some());
        assert_eq!(meta.updated_by.as_deref(), Some("system"));
    }

    #[test]
    fn updated_at_never_goes_backwards() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start - Duration::minutes(5)));
        let hook = AuditingHook::new().with_clock(clock);

        let stored = AuditMetadata {
            created_at: Some(start),
            updated_at: Some(start),
            ..Default::default()
        };
        let mut meta = stored.clone();
        hook.before_save(&mut ctx(
            PersistOp::Update,
            AuditFields::TIMESTAMPS,
            &mut meta,
            Some(&stored),
        ));

        assert_eq!(meta.updated_at, Some(start));
    }

    #[test]
    fn undeclared_fields_are_left_alone() {
        let hook = AuditingHook::new();
        let declared = AuditFields {
            updated_at: true,
            ..AuditFields::NONE
        };

        let mut meta = AuditMetadata::default();
        hook.before_save(&mut ctx(PersistOp::Insert, declared, &mut meta, None));

        assert!(meta.created_at.is_none());
        assert!(meta.updated_at.is_some());
    }

    #[tokio::test]
    async fn actors_come_from_the_auditor() {
        let hook = AuditingHook::new().with_auditor(Arc::new(ScopedAuditor::new("system")));

        let mut meta = AuditMetadata::default();
        actor::scope("registrar".to_string(), async {
            hook.before_save(&mut ctx(PersistOp::Insert, AuditFields::ALL, &mut meta, None));
        })
        .await;
        assert_eq!(meta.created_by.as_deref(), Some("registrar"));
        assert_eq!(meta.updated_by.as_deref(), Some("registrar"));

        let stored = meta.clone();
        hook.before_save(&mut ctx(
            PersistOp::Update,
            AuditFields::ALL,
            &mut meta,
            Some(&stored),
        ));
        assert_eq!(meta.created_by.as_deref(), Some("registrar"));
        assert_eq!(meta.updated_by.as_deref(), Some("system"));
    }
}
