//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single hardware inference backend
//! - Track health status (Healthy/Degraded/Down)
//! - Track current load percentage (drives the queue-time estimate)
//!
//! Queue time is not stored here. It is derived from `current_load` by the
//! latency model every time it is read.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::registry::{RegistryError, RegistryResult};

/// Lowest accepted load percentage.
pub const MIN_LOAD: f64 = 0.0;
/// Highest accepted load percentage.
pub const MAX_LOAD: f64 = 100.0;

/// Health status of a backend.
///
/// Ordered from best to worst, so `Healthy < Degraded < Down`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Healthy = 0,
    Degraded = 1,
    Down = 2,
}

impl BackendStatus {
    /// All variants, best first.
    pub const ALL: [BackendStatus; 3] = [
        BackendStatus::Healthy,
        BackendStatus::Degraded,
        BackendStatus::Down,
    ];

    /// Wire/label representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendStatus::Healthy => "healthy",
            BackendStatus::Degraded => "degraded",
            BackendStatus::Down => "down",
        }
    }

    /// Return true if the backend may receive traffic.
    pub fn is_selectable(&self) -> bool {
        *self != BackendStatus::Down
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendStatus {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(BackendStatus::Healthy),
            "degraded" => Ok(BackendStatus::Degraded),
            "down" => Ok(BackendStatus::Down),
            other => Err(RegistryError::Validation(format!(
                "unknown backend status '{}' (expected healthy, degraded or down)",
                other
            ))),
        }
    }
}

/// A single hardware backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backend {
    /// Unique backend identifier.
    pub id: String,
    /// Hardware label, e.g. "NVIDIA H100".
    pub chip_type: String,
    /// Region key into the latency table.
    pub region: String,
    /// Current health status.
    pub status: BackendStatus,
    /// Current load in percent, always within [0, 100].
    pub current_load: f64,
    /// Processing latency at zero queue, in milliseconds.
    pub base_latency_ms: f64,
    /// Price per token in USD.
    pub cost_per_token: f64,
    /// Model identifiers this backend can serve.
    pub supported_models: BTreeSet<String>,
    /// Jurisdiction / regulatory tags this backend satisfies.
    pub compliance_tags: BTreeSet<String>,
}

impl Backend {
    /// Build a backend from its configuration entry.
    pub fn from_config(config: &BackendConfig) -> RegistryResult<Self> {
        validate_load(config.current_load)?;
        Ok(Self {
            id: config.id.clone(),
            chip_type: config.chip_type.clone(),
            region: config.region.clone(),
            status: config.status,
            current_load: config.current_load,
            base_latency_ms: config.base_latency_ms,
            cost_per_token: config.cost_per_token,
            supported_models: config.supported_models.iter().cloned().collect(),
            compliance_tags: config.compliance_tags.iter().cloned().collect(),
        })
    }

    /// Return true if the backend can serve `model`.
    pub fn supports_model(&self, model: &str) -> bool {
        self.supported_models.contains(model)
    }

    /// Tags from `required` that this backend does not advertise.
    pub fn missing_compliance<'a>(&self, required: &'a BTreeSet<String>) -> Vec<&'a str> {
        required
            .iter()
            .filter(|tag| !self.compliance_tags.contains(*tag))
            .map(String::as_str)
            .collect()
    }

    /// Cost of serving `token_size` tokens.
    pub fn cost_for(&self, token_size: u64) -> f64 {
        self.cost_per_token * token_size as f64
    }
}

/// Reject loads outside [0, 100] (and NaN).
pub fn validate_load(load: f64) -> RegistryResult<()> {
    if !(MIN_LOAD..=MAX_LOAD).contains(&load) {
        return Err(RegistryError::Validation(format!(
            "load {} is outside the range [{}, {}]",
            load, MIN_LOAD, MAX_LOAD
        )));
    }
    Ok(())
}
