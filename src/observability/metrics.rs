//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_requests_in_flight` (gauge): requests currently being served
//! - `persistence_saves_total` (counter): saves by collection, op
//! - `audit_stamps_total` (counter): audit hook applications by collection, op
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::persistence::PersistOp;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_in_flight(count: u64) {
    metrics::gauge!("http_requests_in_flight").set(count as f64);
}

pub fn record_save(collection: &'static str, op: PersistOp) {
    metrics::counter!(
        "persistence_saves_total",
        "collection" => collection,
        "op" => op.as_str()
    )
    .increment(1);
}

pub fn record_audit_stamp(collection: &str, op: PersistOp) {
    metrics::counter!(
        "audit_stamps_total",
        "collection" => collection.to_string(),
        "op" => op.as_str()
    )
    .increment(1);
}
