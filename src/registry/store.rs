//! Backend registry storage.
//!
//! # Responsibilities
//! - Own the fleet of backends
//! - Hand out immutable point-in-time snapshots to routing calls
//! - Apply validated status/load updates and fluctuation ticks

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::observability::metrics;
use crate::registry::backend::{validate_load, Backend, BackendStatus};
use crate::registry::fluctuation::{FluctuationReport, FluctuationSimulator};
use crate::registry::{RegistryError, RegistryResult};

/// Immutable view of the fleet at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    generation: u64,
    backends: Vec<Backend>,
}

impl FleetSnapshot {
    /// Create a snapshot directly (generation 0). Mostly useful in tests.
    pub fn new(backends: Vec<Backend>) -> Self {
        Self {
            generation: 0,
            backends,
        }
    }

    /// Mutation counter; bumped every time the registry publishes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All backends in configuration order.
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Look up a backend by id.
    pub fn get(&self, id: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// A validated change to one backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendUpdate {
    pub status: Option<BackendStatus>,
    pub load: Option<f64>,
}

/// In-memory registry of backends.
///
/// Readers load the current [`FleetSnapshot`] without locking. Writers take
/// `write_lock`, build the next snapshot from the current one and publish it
/// atomically, so a reader sees either the old or the new fleet, never a mix.
#[derive(Debug)]
pub struct BackendRegistry {
    current: ArcSwap<FleetSnapshot>,
    write_lock: Mutex<()>,
}

impl BackendRegistry {
    /// Create a registry from already-built backends.
    ///
    /// Rejects duplicate ids and out-of-range loads.
    pub fn new(backends: Vec<Backend>) -> RegistryResult<Self> {
        let mut seen = HashSet::new();
        for backend in &backends {
            if !seen.insert(backend.id.as_str()) {
                return Err(RegistryError::Validation(format!(
                    "duplicate backend id '{}'",
                    backend.id
                )));
            }
            validate_load(backend.current_load)?;
        }

        for backend in &backends {
            metrics::record_backend_state(backend);
        }

        Ok(Self {
            current: ArcSwap::from_pointee(FleetSnapshot::new(backends)),
            write_lock: Mutex::new(()),
        })
    }

    /// Create a registry from configuration entries.
    pub fn from_config(configs: &[BackendConfig]) -> RegistryResult<Self> {
        let backends = configs
            .iter()
            .map(Backend::from_config)
            .collect::<RegistryResult<Vec<_>>>()?;
        let registry = Self::new(backends)?;
        tracing::info!(backends = registry.len(), "Backend registry initialized");
        Ok(registry)
    }

    /// Current point-in-time view of the fleet.
    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.current.load_full()
    }

    /// Copy of every backend, in configuration order.
    pub fn list(&self) -> Vec<Backend> {
        self.current.load().backends.clone()
    }

    /// Copy of one backend.
    pub fn get(&self, id: &str) -> Option<Backend> {
        self.current.load().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Change the status and/or load of one backend.
    ///
    /// Returns the backend as published. Fails with `NotFound` for an unknown
    /// id and with `Validation` for an empty update or an out-of-range load;
    /// in both cases the registry is left untouched.
    pub fn update_backend(&self, id: &str, update: BackendUpdate) -> RegistryResult<Backend> {
        if update.status.is_none() && update.load.is_none() {
            return Err(RegistryError::Validation(
                "update must set a status or a load".to_string(),
            ));
        }
        if let Some(load) = update.load {
            validate_load(load)?;
        }

        let (backend, _) = self.mutate(|backends| {
            let backend = backends
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

            let old_status = backend.status;
            let old_load = backend.current_load;
            if let Some(status) = update.status {
                backend.status = status;
            }
            if let Some(load) = update.load {
                backend.current_load = load;
            }

            tracing::info!(
                backend_id = %backend.id,
                old_status = %old_status,
                new_status = %backend.status,
                old_load,
                new_load = backend.current_load,
                "Backend updated"
            );
            metrics::record_backend_state(backend);
            Ok(backend.clone())
        })?;
        Ok(backend)
    }

    /// Run one fluctuation tick against the current fleet.
    pub fn apply_fluctuation<R: Rng + ?Sized>(
        &self,
        simulator: &FluctuationSimulator,
        rng: &mut R,
    ) -> FluctuationReport {
        let result = self.mutate(|backends| {
            let changes = simulator.perturb(backends, rng);
            for change in &changes {
                if let Some(backend) = backends.iter().find(|b| b.id == change.backend_id) {
                    metrics::record_backend_state(backend);
                }
            }
            Ok(changes)
        });

        // The closure above never fails.
        let (changes, generation) = result.unwrap_or_else(|_| (Vec::new(), self.generation()));
        metrics::record_fluctuation(changes.len());
        FluctuationReport {
            generation,
            changes,
        }
    }

    /// Generation of the currently published snapshot.
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Serialize writers, mutate a private copy, then publish it.
    ///
    /// Returns the closure's output with the generation that was published.
    /// The slice handed to `f` cannot grow or shrink, so backends are never
    /// added or removed here.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut [Backend]) -> RegistryResult<T>,
    ) -> RegistryResult<(T, u64)> {
        // The lock guards no data and a snapshot is published whole or not
        // at all, so a poisoned lock is still safe to reuse.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.current.load_full();
        let mut next = current.backends.clone();

        let out = f(&mut next)?;

        let generation = current.generation + 1;
        self.current.store(Arc::new(FleetSnapshot {
            generation,
            backends: next,
        }));
        Ok((out, generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::backend;

    fn registry() -> BackendRegistry {
        BackendRegistry::new(vec![
            backend("gpu-east", "us-east-1"),
            backend("gpu-west", "us-west-2"),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = BackendRegistry::new(vec![
            backend("gpu-east", "us-east-1"),
            backend("gpu-east", "us-west-2"),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_update_status_and_load() {
        let registry = registry();
        let updated = registry
            .update_backend(
                "gpu-east",
                BackendUpdate {
                    status: Some(BackendStatus::Degraded),
                    load: Some(75.0),
                },
            )
            .unwrap();

        assert_eq!(updated.status, BackendStatus::Degraded);
        assert_eq!(updated.current_load, 75.0);
        assert_eq!(registry.get("gpu-east").unwrap().status, BackendStatus::Degraded);
        assert_eq!(registry.snapshot().generation(), 1);
    }

    #[test]
    fn test_update_unknown_backend() {
        let registry = registry();
        let err = registry
            .update_backend("nope", BackendUpdate { status: Some(BackendStatus::Down), load: None })
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound("nope".into()));
        assert_eq!(registry.snapshot().generation(), 0);
    }

    #[test]
    fn test_out_of_range_load_rejected_before_mutation() {
        let registry = registry();
        let before = registry.snapshot();

        let err = registry
            .update_backend(
                "gpu-east",
                BackendUpdate { status: Some(BackendStatus::Down), load: Some(140.0) },
            )
            .unwrap_err();

        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(*registry.snapshot(), *before);
    }

    #[test]
    fn test_empty_update_rejected() {
        let registry = registry();
        let err = registry.update_backend("gpu-east", BackendUpdate::default()).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_updates() {
        let registry = registry();
        let snapshot = registry.snapshot();

        registry
            .update_backend("gpu-west", BackendUpdate { status: Some(BackendStatus::Down), load: None })
            .unwrap();

        assert_eq!(snapshot.get("gpu-west").unwrap().status, BackendStatus::Healthy);
        assert_eq!(registry.get("gpu-west").unwrap().status, BackendStatus::Down);
    }

    #[test]
    fn test_concurrent_writers_get_their_own_generation() {
        use crate::config::FluctuationConfig;
        use crate::registry::FluctuationSimulator;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let registry = Arc::new(registry());
        let simulator = FluctuationSimulator::new(FluctuationConfig {
            change_probability: 1.0,
            ..FluctuationConfig::default()
        });

        let updater = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let load = (i % 100) as f64;
                    registry
                        .update_backend("gpu-east", BackendUpdate { status: None, load: Some(load) })
                        .unwrap();
                }
            })
        };

        let mut rng = StdRng::seed_from_u64(3);
        let mut generations = Vec::new();
        for _ in 0..200 {
            generations.push(registry.apply_fluctuation(&simulator, &mut rng).generation);
        }
        updater.join().unwrap();

        // Each tick reports the generation it published itself, so no two
        // ticks can report the same one.
        let mut unique = generations.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), generations.len());
        assert!(generations.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(registry.generation(), 400);
    }

    #[test]
    fn test_poisoned_write_lock_is_recovered() {
        let registry = Arc::new(registry());
        let poisoner = registry.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write_lock.lock().unwrap();
            panic!("writer panicked");
        })
        .join();
        assert!(registry.write_lock.is_poisoned());

        let updated = registry
            .update_backend("gpu-east", BackendUpdate { status: Some(BackendStatus::Down), load: None })
            .unwrap();
        assert_eq!(updated.status, BackendStatus::Down);
        assert_eq!(registry.generation(), 1);
    }
}
