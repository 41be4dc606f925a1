//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Bind server to listener
//! - Stop on the shutdown broadcast

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{FluctuationConfig, RegionConfig, RouterConfig};
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::registry::FluctuationSimulator;
use crate::routing::RoutingEngine;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RoutingEngine>,
    pub simulator: Arc<FluctuationSimulator>,
    pub fluctuation: FluctuationConfig,
    pub regions: Arc<Vec<RegionConfig>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<RoutingEngine>, config: &RouterConfig) -> Self {
        Self {
            engine,
            simulator: Arc::new(FluctuationSimulator::new(config.fluctuation.clone())),
            fluctuation: config.fluctuation.clone(),
            regions: Arc::new(config.regions.clone()),
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the router API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around an engine.
    pub fn new(config: &RouterConfig, engine: Arc<RoutingEngine>) -> Self {
        let state = AppState::new(engine, config);
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &RouterConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/api/route", post(handlers::route))
            .route("/api/route/batch", post(handlers::route_batch))
            .route("/api/recommend", post(handlers::recommend))
            .route("/api/backends", get(handlers::list_backends))
            .route("/api/latency-map", get(handlers::latency_map))
            .route("/api/regions", get(handlers::regions))
            .route("/health", get(handlers::health))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for in-process use.
    pub fn into_router(self) -> Router {
        self.router
    }
}
