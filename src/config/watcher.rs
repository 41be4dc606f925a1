//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Reload and validate the config file when it changes on disk
//! - Apply reloadable sections (latency, scoring) to the routing engine
//!
//! # Design Decisions
//! - A bad file is logged and ignored; the running configuration stays
//! - The backend list is not reloaded; differences are only reported

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::load_config;
use crate::config::schema::RouterConfig;
use crate::registry::Backend;
use crate::routing::RoutingEngine;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RouterConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RouterConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply one reloaded configuration to the engine.
///
/// Returns true if the configured backends differ from the live fleet.
pub fn apply_config(engine: &RoutingEngine, config: &RouterConfig) -> bool {
    engine.reload(&config.latency, &config.scoring);

    let live = engine.registry().snapshot();
    let drifted = config.backends.len() != live.len()
        || config.backends.iter().any(|configured| {
            match (live.get(&configured.id), Backend::from_config(configured)) {
                (Some(current), Ok(wanted)) => {
                    current.chip_type != wanted.chip_type
                        || current.region != wanted.region
                        || current.base_latency_ms != wanted.base_latency_ms
                        || current.cost_per_token != wanted.cost_per_token
                        || current.supported_models != wanted.supported_models
                        || current.compliance_tags != wanted.compliance_tags
                }
                _ => true,
            }
        });

    if drifted {
        tracing::warn!(
            configured = config.backends.len(),
            live = live.len(),
            "Backend list changed on disk; fleet changes need a restart"
        );
    }
    drifted
}

/// Consume config updates until shutdown.
pub async fn run_reload_loop(
    engine: Arc<RoutingEngine>,
    mut updates: mpsc::UnboundedReceiver<RouterConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(config) => {
                        apply_config(&engine, &config);
                    }
                    None => break,
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Config reload loop received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BackendRegistry, BackendStatus};
    use crate::config::schema::BackendConfig;

    fn backend_config(id: &str) -> BackendConfig {
        BackendConfig {
            id: id.to_string(),
            chip_type: "GPU".to_string(),
            region: "us-east-1".to_string(),
            status: BackendStatus::Healthy,
            current_load: 10.0,
            base_latency_ms: 50.0,
            cost_per_token: 0.00002,
            supported_models: vec!["gpt-4".to_string()],
            compliance_tags: vec![],
        }
    }

    fn engine(config: &RouterConfig) -> RoutingEngine {
        let registry = Arc::new(BackendRegistry::from_config(&config.backends).unwrap());
        RoutingEngine::from_config(registry, config)
    }

    #[test]
    fn test_apply_config_swaps_settings() {
        let mut config = RouterConfig::default();
        config.backends = vec![backend_config("a")];
        let engine = engine(&config);

        let mut next = config.clone();
        next.latency.default_ms = 99.0;
        next.scoring.degraded_penalty = 3.0;
        // Live status changes are not drift.
        next.backends[0].status = BackendStatus::Down;

        assert!(!apply_config(&engine, &next));
        assert_eq!(engine.settings().latency.table().default_ms(), 99.0);
        assert_eq!(engine.settings().scorer.weights().degraded_penalty, 3.0);
    }

    #[test]
    fn test_apply_config_reports_backend_drift() {
        let mut config = RouterConfig::default();
        config.backends = vec![backend_config("a")];
        let engine = engine(&config);

        let mut next = config.clone();
        next.backends.push(backend_config("b"));
        assert!(apply_config(&engine, &next));
        assert_eq!(engine.registry().len(), 1);
    }
}
