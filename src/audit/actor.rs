//! Resolution of the acting principal ("auditor").
//!
//! The HTTP layer scopes the principal named in the request to the request's
//! task. Work spawned onto other tasks does not inherit the scope and falls
//! back to the system actor.

use std::future::Future;

tokio::task_local! {
    static CURRENT_ACTOR: String;
}

/// Run `fut` with `actor` as the current principal.
pub async fn scope<F: Future>(actor: String, fut: F) -> F::Output {
    CURRENT_ACTOR.scope(actor, fut).await
}

/// The principal scoped to the current task, if any.
pub fn current() -> Option<String> {
    CURRENT_ACTOR.try_with(Clone::clone).ok()
}

/// Supplies the principal recorded in `created_by` / `updated_by`.
pub trait AuditorAware: Send + Sync {
    fn current_auditor(&self) -> Option<String>;
}

/// Reads the task-scoped principal, falling back to a fixed system actor.
#[derive(Debug, Clone)]
pub struct ScopedAuditor {
    system_actor: String,
}

impl ScopedAuditor {
    pub fn new(system_actor: impl Into<String>) -> Self {
        Self {
            system_actor: system_actor.into(),
        }
    }
}

impl AuditorAware for ScopedAuditor {
    fn current_auditor(&self) -> Option<String> {
        Some(current().unwrap_or_else(|| self.system_actor.clone()))
    }
}
