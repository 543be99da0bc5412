//! Process lifecycle phases.
//!
//! ```text
//! Initializing ──▶ Serving(addr) ──▶ Draining ──▶ Stopped
//!      │                │
//!      └──────▶ Failed ◀┘
//! ```

use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Building the component graph.
    Initializing,
    /// Accepting requests on the given address.
    Serving(SocketAddr),
    /// Shutdown requested; finishing in-flight requests.
    Draining,
    /// Resources released after a graceful shutdown.
    Stopped,
    /// A fatal error ended the process lifecycle.
    Failed,
}

impl LifecyclePhase {
    pub fn is_serving(&self) -> bool {
        matches!(self, LifecyclePhase::Serving(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecyclePhase::Stopped | LifecyclePhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Initializing => "initializing",
            LifecyclePhase::Serving(_) => "serving",
            LifecyclePhase::Draining => "draining",
            LifecyclePhase::Stopped => "stopped",
            LifecyclePhase::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
