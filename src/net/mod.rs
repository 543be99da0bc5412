//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (parse address, bind)
//!     → Hand off to HTTP layer (HttpServer accept loop)
//! ```
//!
//! # Design Decisions
//! - Binding happens inside startup, so an occupied port fails the process
//! - Listener is bound last, after persistence is open

pub mod listener;

pub use listener::{Listener, ListenerError};
