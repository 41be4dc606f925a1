//! Fleet fluctuation simulation.
//!
//! # Responsibilities
//! - Randomly flip backend status and load to emulate real-world flux
//! - Optionally run periodically in the background
//!
//! # Design Decisions
//! - The random source is injected, so tests can seed it
//! - Only `status` and `current_load` change; the fleet size never does
//! - Changes per tick are capped by `max_changes_per_tick`
//! - The routing engine never calls this; it only sees the resulting snapshot

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::FluctuationConfig;
use crate::registry::backend::{Backend, BackendStatus};
use crate::registry::store::BackendRegistry;

/// One backend changed by a fluctuation tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub backend_id: String,
    pub old_status: BackendStatus,
    pub new_status: BackendStatus,
    pub old_load: f64,
    pub new_load: f64,
}

/// Outcome of one fluctuation tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluctuationReport {
    /// Registry generation after the tick.
    pub generation: u64,
    pub changes: Vec<StatusChange>,
}

impl FluctuationReport {
    /// Number of backends that changed.
    pub fn changed(&self) -> usize {
        self.changes.len()
    }
}

/// Randomized status/load mutator.
#[derive(Debug, Clone)]
pub struct FluctuationSimulator {
    config: FluctuationConfig,
}

impl FluctuationSimulator {
    pub fn new(config: FluctuationConfig) -> Self {
        Self { config }
    }

    /// Perturb a random subset of `backends` in place.
    ///
    /// Visits backends in random order; each one changes with probability
    /// `change_probability` until `max_changes_per_tick` is reached.
    pub fn perturb<R: Rng + ?Sized>(
        &self,
        backends: &mut [Backend],
        rng: &mut R,
    ) -> Vec<StatusChange> {
        let probability = self.config.change_probability.clamp(0.0, 1.0);
        let mut order: Vec<usize> = (0..backends.len()).collect();
        order.shuffle(rng);

        let mut changes = Vec::new();
        for index in order {
            if changes.len() >= self.config.max_changes_per_tick {
                break;
            }
            if !rng.gen_bool(probability) {
                continue;
            }

            let backend = &mut backends[index];
            let old_status = backend.status;
            let old_load = backend.current_load;

            backend.status = next_status(old_status, rng);
            backend.current_load = self.next_load(rng);

            tracing::info!(
                backend_id = %backend.id,
                old_status = %old_status,
                new_status = %backend.status,
                new_load = backend.current_load,
                "Backend fluctuated"
            );

            changes.push(StatusChange {
                backend_id: backend.id.clone(),
                old_status,
                new_status: backend.status,
                old_load,
                new_load: backend.current_load,
            });
        }
        changes
    }

    fn next_load<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let low = self.config.min_load.clamp(0.0, 100.0);
        let high = self.config.max_load.clamp(low, 100.0);
        if high > low {
            rng.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Pick the status a backend moves to.
///
/// Healthy mostly degrades, Degraded recovers or fails evenly, Down mostly
/// comes back degraded.
fn next_status<R: Rng + ?Sized>(current: BackendStatus, rng: &mut R) -> BackendStatus {
    match current {
        BackendStatus::Healthy => {
            if rng.gen_bool(0.8) {
                BackendStatus::Degraded
            } else {
                BackendStatus::Down
            }
        }
        BackendStatus::Degraded => {
            if rng.gen_bool(0.5) {
                BackendStatus::Healthy
            } else {
                BackendStatus::Down
            }
        }
        BackendStatus::Down => {
            if rng.gen_bool(0.7) {
                BackendStatus::Degraded
            } else {
                BackendStatus::Healthy
            }
        }
    }
}

/// Background task applying fluctuation ticks on an interval.
pub struct FluctuationMonitor {
    registry: Arc<BackendRegistry>,
    simulator: FluctuationSimulator,
    interval: Duration,
}

impl FluctuationMonitor {
    pub fn new(registry: Arc<BackendRegistry>, config: FluctuationConfig) -> Self {
        let interval = Duration::from_secs(config.interval_secs.max(1));
        Self {
            registry,
            simulator: FluctuationSimulator::new(config),
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Fluctuation monitor starting");

        let mut rng = StdRng::from_entropy();
        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; skip it so the fleet starts as configured.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.registry.apply_fluctuation(&self.simulator, &mut rng);
                    tracing::debug!(
                        changed = report.changed(),
                        generation = report.generation,
                        "Fluctuation tick applied"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Fluctuation monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
