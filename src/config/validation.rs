//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check cross-field requirements (file backend needs a path)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{AppConfig, PersistenceBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.persistence.backend == PersistenceBackend::File {
        match config.persistence.path.as_deref() {
            None | Some("") => errors.push(ValidationError::new(
                "persistence.path",
                "required when backend = \"file\"",
            )),
            Some(_) => {}
        }
    }
    if config.persistence.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "persistence.connect_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.audit.track_actor {
        if HeaderName::from_bytes(config.audit.actor_header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "audit.actor_header",
                format!("'{}' is not a valid header name", config.audit.actor_header),
            ));
        }
        if config.audit.system_actor.trim().is_empty() {
            errors.push(ValidationError::new("audit.system_actor", "must not be blank"));
        }
    }

    if config.lifecycle.startup_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "lifecycle.startup_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.lifecycle.grace_period_secs == 0 {
        errors.push(ValidationError::new(
            "lifecycle.grace_period_secs",
            "must be greater than zero",
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
