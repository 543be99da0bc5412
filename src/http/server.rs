//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the operational endpoints
//! - Wire up middleware (request id, tracing, limits, timeout, actor scope)
//! - Serve on a bound listener until told to stop
//!
//! # Design Decisions
//! - One task per connection, owned by the server in a `JoinSet`, so that
//!   connections still open after the grace period can be cut off

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::Request,
    http::HeaderName,
    middleware,
    routing::get,
    Router,
};
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    server::graceful::GracefulShutdown,
    service::TowerToHyperService,
};
use tokio::{sync::watch, task::JoinSet};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers::{health, info, ready};
use crate::http::request::{scope_actor, track_request, X_REQUEST_ID};
use crate::lifecycle::{InFlightTracker, LifecyclePhase};
use crate::net::Listener;
use crate::persistence::Persistence;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub persistence: Persistence,
    pub phase: watch::Receiver<LifecyclePhase>,
    pub in_flight: InFlightTracker,
    /// Header naming the acting principal; `None` when actor tracking is off.
    pub actor_header: Option<HeaderName>,
}

/// HTTP server for the academy backend.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &AppConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/info", get(info))
            .layer(middleware::from_fn_with_state(state.clone(), scope_actor))
            .layer(middleware::from_fn_with_state(state.clone(), track_request))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(&X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `stop` resolves, then let open connections
    /// finish their current request. Connections still open when `abort`
    /// resolves are dropped.
    pub async fn run<S, A>(self, listener: Listener, stop: S, abort: A) -> Result<(), std::io::Error>
    where
        S: Future<Output = ()> + Send + 'static,
        A: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr();
        let listener = listener.into_inner();
        tracing::info!(address = %addr, "HTTP server starting");

        let service = TowerToHyperService::new(self.router);
        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());

        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();
        let mut stop = std::pin::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    let connection = graceful.watch(
                        builder.serve_connection(TokioIo::new(stream), service.clone()),
                    );
                    connections.spawn(async move {
                        if let Err(e) = connection.await {
                            tracing::debug!(peer = %peer, error = %e, "Connection ended with error");
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        tracing::info!(open_connections = connections.len(), "Listener closed");

        let mut abort = std::pin::pin!(abort);
        tokio::select! {
            _ = graceful.shutdown() => {}
            _ = &mut abort => {
                tracing::warn!(
                    open_connections = connections.len(),
                    "Dropping open connections"
                );
                connections.abort_all();
            }
        }
        while connections.join_next().await.is_some() {}

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
