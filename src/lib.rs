//! Dice Academy backend service.
//!
//! An HTTP service process with an explicit composition root and a
//! persistence layer that stamps audit metadata on every save.
//!
//! # Architecture Overview
//!
//! ```text
//!   main.rs ── CLI args ──▶ config ──▶ lifecycle::Bootstrapper
//!                                          │
//!              ┌───────────────────────────┼────────────────────────┐
//!              ▼                           ▼                        ▼
//!        persistence ◀── audit hook     net::Listener ──▶ http::HttpServer
//!     (store + registry)  (clock, actor)                  (health, ready, info)
//!
//!   Cross-cutting: observability (tracing, metrics), lifecycle (signals, drain)
//! ```

pub mod audit;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod persistence;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{BootError, Bootstrapper, LifecyclePhase, Shutdown};
