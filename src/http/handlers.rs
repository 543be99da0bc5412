use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub phase: &'static str,
    pub persistence: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub persistence_backend: &'static str,
    pub auditing: bool,
    pub track_actor: bool,
    pub collections: Vec<&'static str>,
    pub in_flight: u64,
}

/// Liveness: answers as long as the process serves HTTP at all.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "UP" })
}

/// Readiness: 503 outside of the serving phase or while the store does not
/// answer.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let phase = *state.phase.borrow();
    let persistence = if phase.is_serving() {
        match state.persistence.store().ping().await {
            Ok(()) => "UP",
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check: store unavailable");
                "DOWN"
            }
        }
    } else {
        "UNKNOWN"
    };

    let (code, status) = if persistence == "UP" {
        (StatusCode::OK, "UP")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DOWN")
    };
    (
        code,
        Json(Readiness {
            status,
            phase: phase.as_str(),
            persistence,
        }),
    )
}

pub async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    let persistence = &state.persistence;
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        persistence_backend: persistence.store().backend(),
        auditing: persistence.auditing_enabled(),
        track_actor: persistence.tracks_actor(),
        collections: persistence.registry().collections().collect(),
        in_flight: state.in_flight.count(),
    })
}
