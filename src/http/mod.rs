//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request id, in-flight tracking, actor scope)
//!     → handlers.rs (health, readiness, info)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
