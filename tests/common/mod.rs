//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use inference_router::config::{load_config, BackendConfig, RouterConfig};
use inference_router::lifecycle::Shutdown;
use inference_router::registry::{BackendRegistry, BackendStatus};
use inference_router::routing::RoutingEngine;
use inference_router::HttpServer;

/// The fleet shipped in `config/fleet.toml`.
pub fn shipped_config() -> RouterConfig {
    load_config(Path::new("config/fleet.toml")).expect("config/fleet.toml should load")
}

pub fn shipped_config_without_metrics() -> RouterConfig {
    let mut config = shipped_config();
    config.observability.metrics_enabled = false;
    config
}

/// A healthy `gpt-4` backend with no compliance tags.
pub fn backend_config(id: &str, region: &str, load: f64) -> BackendConfig {
    BackendConfig {
        id: id.to_string(),
        chip_type: "NVIDIA H100".to_string(),
        region: region.to_string(),
        status: BackendStatus::Healthy,
        current_load: load,
        base_latency_ms: 50.0,
        cost_per_token: 0.00002,
        supported_models: vec!["gpt-4".to_string()],
        compliance_tags: vec![],
    }
}

/// Default configuration around the given backends, metrics off.
pub fn config_with(backends: Vec<BackendConfig>) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.observability.metrics_enabled = false;
    config.backends = backends;
    config
}

pub fn engine_for(config: &RouterConfig) -> Arc<RoutingEngine> {
    let registry = Arc::new(BackendRegistry::from_config(&config.backends).unwrap());
    Arc::new(RoutingEngine::from_config(registry, config))
}

/// A router served on a loopback port.
pub struct TestRouter {
    pub addr: SocketAddr,
    pub engine: Arc<RoutingEngine>,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestRouter {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the HTTP server for `config` on an ephemeral port.
pub async fn start_router(config: RouterConfig) -> TestRouter {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let engine = engine_for(&config);
    let shutdown = Shutdown::new();

    let server = HttpServer::new(&config, engine.clone());
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    TestRouter {
        addr,
        engine,
        shutdown,
        client,
    }
}
