//! Audit metadata subsystem.
//!
//! # Data Flow
//! ```text
//! Repository::save(entity)
//!     → persistence layer decides insert vs update
//!     → hook.rs (AuditingHook::before_save)
//!         ← clock.rs (current time)
//!         ← actor.rs (current auditor, request scoped)
//!     → metadata.rs fields written on the entity instance
//!     → document store write
//! ```
//!
//! # Design Decisions
//! - Enabled by handing the hook to the persistence layer at construction;
//!   there is no global switch
//! - Entities declare their audit fields statically (`Auditable::AUDIT_FIELDS`)
//! - The hook holds no mutable state; concurrent saves never interfere

pub mod actor;
pub mod clock;
pub mod hook;
pub mod metadata;

pub use actor::{AuditorAware, ScopedAuditor};
pub use clock::{Clock, ManualClock, SystemClock};
pub use hook::AuditingHook;
pub use metadata::{AuditFields, AuditMetadata, Auditable};
