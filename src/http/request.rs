//! Per-request middleware.
//!
//! # Responsibilities
//! - Count the request as in flight for the duration of its handling
//! - Record request metrics
//! - Scope the acting principal from the actor header to the request task

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};

use crate::audit::actor;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Name of the request id header, set when missing and echoed on responses.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Hold an in-flight guard while the request is handled.
pub async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let _guard = state.in_flight.track();
    let start = Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

/// Run the rest of the stack with the header-provided actor in scope.
///
/// Requests without the header (or with actor tracking disabled) run
/// unscoped, and saves made for them record the system actor.
pub async fn scope_actor(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let actor = state
        .actor_header
        .as_ref()
        .and_then(|name| request.headers().get(name))
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    match actor {
        Some(actor) => actor::scope(actor, next.run(request)).await,
        None => next.run(request).await,
    }
}
