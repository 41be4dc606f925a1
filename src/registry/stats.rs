//! Aggregate views over a fleet snapshot.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::registry::backend::BackendStatus;
use crate::registry::store::FleetSnapshot;

/// Fleet-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetStats {
    pub generation: u64,
    pub total_backends: usize,
    pub by_status: BTreeMap<BackendStatus, usize>,
    pub by_region: BTreeMap<String, usize>,
    pub by_chip_type: BTreeMap<String, usize>,
    /// Mean load over every backend, Down included.
    pub average_load: f64,
    pub healthy_percentage: f64,
    pub supported_models: BTreeSet<String>,
}

impl FleetStats {
    pub fn from_snapshot(snapshot: &FleetSnapshot) -> Self {
        let backends = snapshot.backends();

        let mut by_status: BTreeMap<BackendStatus, usize> =
            BackendStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_region = BTreeMap::new();
        let mut by_chip_type = BTreeMap::new();
        let mut supported_models = BTreeSet::new();
        let mut load_sum = 0.0;

        for backend in backends {
            *by_status.entry(backend.status).or_default() += 1;
            *by_region.entry(backend.region.clone()).or_default() += 1;
            *by_chip_type.entry(backend.chip_type.clone()).or_default() += 1;
            supported_models.extend(backend.supported_models.iter().cloned());
            load_sum += backend.current_load;
        }

        let total = backends.len();
        let healthy = by_status.get(&BackendStatus::Healthy).copied().unwrap_or(0);

        Self {
            generation: snapshot.generation(),
            total_backends: total,
            by_status,
            by_region,
            by_chip_type,
            average_load: mean(load_sum, total),
            healthy_percentage: mean(healthy as f64 * 100.0, total),
            supported_models,
        }
    }
}

/// Counters for one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionStats {
    pub backend_count: usize,
    pub healthy_backends: usize,
    pub degraded_backends: usize,
    pub down_backends: usize,
    pub average_load: f64,
    pub chip_types: BTreeSet<String>,
    pub supported_models: BTreeSet<String>,
    pub compliance_tags: BTreeSet<String>,
}

impl RegionStats {
    /// Per-region statistics, keyed by region name.
    pub fn by_region(snapshot: &FleetSnapshot) -> BTreeMap<String, RegionStats> {
        let mut regions: BTreeMap<String, RegionStats> = BTreeMap::new();

        for backend in snapshot.backends() {
            let stats = regions.entry(backend.region.clone()).or_default();
            stats.backend_count += 1;
            match backend.status {
                BackendStatus::Healthy => stats.healthy_backends += 1,
                BackendStatus::Degraded => stats.degraded_backends += 1,
                BackendStatus::Down => stats.down_backends += 1,
            }
            // Summed here, divided below.
            stats.average_load += backend.current_load;
            stats.chip_types.insert(backend.chip_type.clone());
            stats.supported_models.extend(backend.supported_models.iter().cloned());
            stats.compliance_tags.extend(backend.compliance_tags.iter().cloned());
        }

        for stats in regions.values_mut() {
            stats.average_load = mean(stats.average_load, stats.backend_count);
        }
        regions
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
