//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Register entities → Open persistence (+ audit hook) → Bind listener → Serve
//!
//! Shutdown (shutdown.rs, drain.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Close persistence
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then persistence, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Both ends are bounded: startup timeout, drain grace period

pub mod drain;
pub mod phase;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use drain::{InFlightGuard, InFlightTracker};
pub use phase::LifecyclePhase;
pub use shutdown::Shutdown;
pub use startup::{build_persistence, BootError, Bootstrapper};
