//! Inference Router
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                  INFERENCE ROUTER                    │
//!                    │                                                      │
//!   POST /api/route  │  ┌────────┐    ┌────────────────────────────────┐    │
//!   ─────────────────┼─▶│  http  │───▶│        routing engine          │    │
//!                    │  │ server │    │ filter → score → select →      │    │
//!   RoutingResult    │  │        │◀───│ fallback → decision            │    │
//!   ◀────────────────┼──│        │    └───────┬───────────────┬────────┘    │
//!                    │  └───┬────┘            │ snapshot      │ settings    │
//!                    │      │ /admin          ▼               ▼             │
//!                    │      │         ┌──────────────┐ ┌──────────────┐     │
//!                    │      └────────▶│   registry   │ │ latency model│     │
//!                    │                │  (arc-swap)  │ │  + scorer    │     │
//!                    │                └──────▲───────┘ └──────▲───────┘     │
//!                    │                       │                │             │
//!                    │              fluctuation monitor  config watcher     │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use inference_router::config::{load_config, watcher, ConfigWatcher};
use inference_router::lifecycle::{spawn_signal_handler, Shutdown};
use inference_router::observability::{logging, metrics};
use inference_router::registry::{BackendRegistry, FluctuationMonitor};
use inference_router::routing::RoutingEngine;
use inference_router::HttpServer;

#[derive(Parser)]
#[command(name = "inference-router")]
#[command(about = "Routes inference requests across a heterogeneous accelerator fleet", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/fleet.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("inference-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        path = %args.config.display(),
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        latency_pairs = config.latency.pairs.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(BackendRegistry::from_config(&config.backends)?);
    let engine = Arc::new(RoutingEngine::from_config(registry.clone(), &config));

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if config.fluctuation.enabled {
        let monitor = FluctuationMonitor::new(registry.clone(), config.fluctuation.clone());
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            monitor.run(rx).await;
        });
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_watcher, updates) = ConfigWatcher::new(&args.config);
    let _watcher = match config_watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };
    tokio::spawn(watcher::run_reload_loop(
        engine.clone(),
        updates,
        shutdown.subscribe(),
    ));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, engine);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
