//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: admission middleware in front of the downstream
//! - Wire up middleware (tracing, timeout, request ID, concurrency cap, metrics)
//! - Bind server to listener and apply config reloads while serving
//! - Stop on the shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GuardConfig;
use crate::http::middleware::admission_middleware;
use crate::http::proxy::{proxy_handler, Upstream};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::security::{AdmissionPolicy, AdmissionState, InMemoryStore, RateLimiter, SystemClock};

/// Wrap a downstream router with the admission chain and the common layers.
///
/// Layer order, outermost first: trace, request ID, metrics, concurrency cap,
/// timeout, admission, downstream.
#[allow(deprecated)]
pub fn build_router(config: &GuardConfig, admission: AdmissionState, downstream: Router) -> Router {
    downstream
        .layer(middleware::from_fn_with_state(admission, admission_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(
            Arc::new(Semaphore::new(config.listener.max_connections)),
            limit_in_flight,
        ))
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

/// Hold a permit for the lifetime of the request; excess requests wait.
async fn limit_in_flight(
    State(permits): State<Arc<Semaphore>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let _permit = permits.acquire().await;
    next.run(request).await
}

/// HTTP server for the admission gateway.
pub struct HttpServer {
    router: Router,
    admission: AdmissionState,
}

impl HttpServer {
    /// Create a server that forwards admitted requests to `config.upstream`.
    pub fn new(config: GuardConfig) -> Self {
        let limiter = RateLimiter::new(Arc::new(InMemoryStore::new()), Arc::new(SystemClock));
        Self::with_limiter(config, limiter)
    }

    /// Create a server around an existing rate limiter (shared with the admin API).
    pub fn with_limiter(config: GuardConfig, limiter: RateLimiter) -> Self {
        let admission = AdmissionState::new(AdmissionPolicy::from_config(&config), limiter);
        let downstream = Router::new()
            .fallback(proxy_handler)
            .with_state(Upstream::new(&config.upstream));
        let router = build_router(&config, admission.clone(), downstream);

        Self { router, admission }
    }

    pub fn admission(&self) -> &AdmissionState {
        &self.admission
    }

    /// Serve on `listener` until a shutdown signal arrives.
    ///
    /// Configurations received on `config_updates` replace the admission
    /// policy; listener, upstream and timeout settings need a restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let admission = self.admission.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                admission.reload(&config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
