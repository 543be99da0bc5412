//! Startup orchestration: the composition root.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Attach the audit hook to the persistence layer when enabled
//! - Bind the listener and begin accepting traffic
//! - Drain and release resources on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::sync::watch;

use crate::audit::{AuditingHook, Clock, ScopedAuditor, SystemClock};
use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::drain::InFlightTracker;
use crate::lifecycle::phase::LifecyclePhase;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{Listener, ListenerError};
use crate::observability::{metrics, LoggingError};
use crate::persistence::{
    connect_store, open_store, DocumentStore, Entity, EntityRegistry, Persistence,
    PersistenceOptions, RegistryError, StoreError,
};

/// `EX_UNAVAILABLE` from sysexits.h.
pub const EXIT_UNAVAILABLE: u8 = 69;
/// `EX_CONFIG` from sysexits.h.
pub const EXIT_CONFIG: u8 = 78;
pub const EXIT_FAILURE: u8 = 1;

/// Fatal error while bringing the process up (or keeping it up).
#[derive(Debug, Error)]
pub enum BootError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("entity registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("persistence: {0}")]
    Persistence(#[from] StoreError),

    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("metrics: {0}")]
    Metrics(#[from] BuildError),

    #[error("metrics: invalid address '{0}'")]
    MetricsAddress(String),

    #[error("audit: invalid actor header '{0}'")]
    ActorHeader(String),

    #[error("startup did not complete within {0}s")]
    StartupTimeout(u64),

    #[error("server stopped unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}

impl BootError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            BootError::Config(_)
            | BootError::Registry(_)
            | BootError::Logging(_)
            | BootError::MetricsAddress(_)
            | BootError::ActorHeader(_) => EXIT_CONFIG,
            BootError::Persistence(_) => EXIT_UNAVAILABLE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Build the persistence layer, attaching the audit hook if enabled.
pub async fn build_persistence(
    config: &AppConfig,
    registry: EntityRegistry,
    clock: Arc<dyn Clock>,
) -> Result<Persistence, BootError> {
    let options = persistence_options(config, &registry, clock)?;
    let store = open_store(&config.persistence).await?;
    Ok(Persistence::new(store, registry, options))
}

fn persistence_options(
    config: &AppConfig,
    registry: &EntityRegistry,
    clock: Arc<dyn Clock>,
) -> Result<PersistenceOptions, BootError> {
    let audit = &config.audit;
    let mut options = PersistenceOptions::default();

    if audit.enabled {
        registry.check_audit_settings(audit.track_actor)?;

        let mut hook = AuditingHook::new().with_clock(clock);
        if audit.track_actor {
            hook = hook.with_auditor(Arc::new(ScopedAuditor::new(audit.system_actor.clone())));
        }
        options = options.with_auditing(hook);
        tracing::info!(track_actor = audit.track_actor, "Audit hook enabled");
    } else {
        let audited: Vec<_> = registry
            .descriptors()
            .filter(|d| !d.audit_fields.is_empty())
            .map(|d| d.collection)
            .collect();
        if !audited.is_empty() {
            tracing::warn!(
                collections = ?audited,
                "Auditing disabled; declared audit fields will not be maintained"
            );
        }
    }

    Ok(options)
}

/// Everything the serve loop needs, built by [`assemble`].
struct Components {
    persistence: Persistence,
    listener: Listener,
    server: HttpServer,
    in_flight: InFlightTracker,
}

async fn assemble(
    config: &AppConfig,
    registry: EntityRegistry,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn DocumentStore>>,
    phase: watch::Receiver<LifecyclePhase>,
) -> Result<Components, BootError> {
    if config.observability.metrics_enabled {
        let address = &config.observability.metrics_address;
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| BootError::MetricsAddress(address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let actor_header = if config.audit.enabled && config.audit.track_actor {
        let name = &config.audit.actor_header;
        Some(
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| BootError::ActorHeader(name.clone()))?,
        )
    } else {
        None
    };

    let options = persistence_options(config, &registry, clock)?;
    let store = match store {
        Some(store) => connect_store(store, &config.persistence).await?,
        None => open_store(&config.persistence).await?,
    };
    let persistence = Persistence::new(store, registry, options);

    // Persistence is open from here on; release it if binding fails.
    let listener = match Listener::bind(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            if let Err(close) = persistence.close().await {
                tracing::warn!(error = %close, "Failed to close persistence");
            }
            return Err(e.into());
        }
    };

    let in_flight = InFlightTracker::new();

    let state = AppState {
        persistence: persistence.clone(),
        phase,
        in_flight: in_flight.clone(),
        actor_header,
    };

    Ok(Components {
        persistence,
        listener,
        server: HttpServer::new(config, state),
        in_flight,
    })
}

/// Process bootstrapper.
///
/// Construct, register entity types, then [`run`](Self::run) exactly once.
pub struct Bootstrapper {
    config: AppConfig,
    registry: EntityRegistry,
    registry_error: Option<RegistryError>,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn DocumentStore>>,
    phase_tx: watch::Sender<LifecyclePhase>,
}

impl Bootstrapper {
    pub fn new(config: AppConfig) -> Self {
        let (phase_tx, _) = watch::channel(LifecyclePhase::Initializing);
        Self {
            config,
            registry: EntityRegistry::new(),
            registry_error: None,
            clock: Arc::new(SystemClock),
            store: None,
            phase_tx,
        }
    }

    /// Register an entity type with the persistence layer.
    ///
    /// A malformed declaration is reported by [`run`](Self::run) as a fatal
    /// startup error.
    pub fn register<E: Entity>(mut self) -> Self {
        if self.registry_error.is_none() {
            if let Err(e) = self.registry.register::<E>() {
                self.registry_error = Some(e);
            }
        }
        self
    }

    /// Replace the clock used for audit stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `store` instead of opening the configured backend.
    ///
    /// The store is still pinged during startup, bounded by
    /// `persistence.connect_timeout_secs`.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Observe lifecycle phase transitions.
    pub fn phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase_tx.subscribe()
    }

    /// Initialize, serve until `shutdown` resolves, then drain and release.
    ///
    /// Returns `Ok(())` after a graceful shutdown and `Err` on any fatal
    /// error, in which case the phase ends as [`LifecyclePhase::Failed`].
    pub async fn run<F>(self, shutdown: F) -> Result<(), BootError>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            config,
            registry,
            registry_error,
            clock,
            store,
            phase_tx,
        } = self;

        let fail = |e: BootError| {
            tracing::error!(error = %e, exit_code = e.exit_code(), "Fatal error");
            phase_tx.send_replace(LifecyclePhase::Failed);
            e
        };

        tracing::info!(version = env!("CARGO_PKG_VERSION"), "dice-academy starting");

        if let Err(errors) = validate_config(&config) {
            return Err(fail(ConfigError::Validation(errors).into()));
        }
        if let Some(e) = registry_error {
            return Err(fail(e.into()));
        }

        let startup_secs = config.lifecycle.startup_timeout_secs;
        let init = assemble(&config, registry, clock, store, phase_tx.subscribe());
        let components = match tokio::time::timeout(Duration::from_secs(startup_secs), init).await {
            Ok(Ok(components)) => components,
            Ok(Err(e)) => return Err(fail(e)),
            Err(_) => return Err(fail(BootError::StartupTimeout(startup_secs))),
        };

        let Components {
            persistence,
            listener,
            server,
            in_flight,
        } = components;

        let addr = listener.local_addr();
        let stop = Shutdown::new();
        let abort = Shutdown::new();
        let mut serving = tokio::spawn(server.run(listener, stop.wait(), abort.wait()));

        phase_tx.send_replace(LifecyclePhase::Serving(addr));
        tracing::info!(address = %addr, "Serving");

        let early_exit = tokio::select! {
            _ = shutdown => None,
            result = &mut serving => Some(result),
        };

        if let Some(result) = early_exit {
            let error = match result {
                Ok(Ok(())) => std::io::Error::other("server exited without a shutdown request"),
                Ok(Err(e)) => e,
                Err(join) => std::io::Error::other(join),
            };
            release(&persistence).await;
            return Err(fail(BootError::Serve(error)));
        }

        phase_tx.send_replace(LifecyclePhase::Draining);
        let grace = Duration::from_secs(config.lifecycle.grace_period_secs);
        tracing::info!(
            in_flight = in_flight.count(),
            grace_period_secs = grace.as_secs(),
            "Draining"
        );
        stop.trigger();

        let drained = tokio::time::timeout(grace, async {
            let result = (&mut serving).await;
            in_flight.wait_idle().await;
            result
        })
        .await;

        let outcome = match drained {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    in_flight = in_flight.count(),
                    "Grace period elapsed; aborting open connections"
                );
                abort.trigger();
                (&mut serving).await
            }
        };
        match outcome {
            Ok(Ok(())) => tracing::info!("Drained"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Server reported an error while draining"),
            Err(e) => tracing::warn!(error = %e, "Server task failed while draining"),
        }

        release(&persistence).await;
        phase_tx.send_replace(LifecyclePhase::Stopped);
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

async fn release(persistence: &Persistence) {
    match persistence.close().await {
        Ok(()) => tracing::info!("Persistence closed"),
        Err(e) => tracing::warn!(error = %e, "Failed to close persistence"),
    }
}
