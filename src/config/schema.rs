//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::registry::BackendStatus;

/// Root configuration for the inference router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Network latency model.
    pub latency: LatencyConfig,

    /// Region coordinates, exposed read-only.
    pub regions: Vec<RegionConfig>,

    /// Scoring weights.
    pub scoring: ScoringConfig,

    /// Background fluctuation simulator.
    pub fluctuation: FluctuationConfig,

    /// Backend fleet.
    pub backends: Vec<BackendConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin` routes.
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// One directed region-pair latency.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LatencyPair {
    pub from: String,
    pub to: String,
    pub ms: f64,
}

impl LatencyPair {
    fn new(from: &str, to: &str, ms: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            ms,
        }
    }
}

/// Latency model configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Latency for region pairs missing from the table, in ms.
    pub default_ms: f64,

    /// Queue time at 100% load, in ms.
    pub saturation_ms: f64,

    /// Token count at which processing takes exactly `base_latency_ms`.
    pub reference_tokens: u64,

    /// Region-pair latencies. A pair also answers the reverse direction
    /// unless that direction is listed separately.
    pub pairs: Vec<LatencyPair>,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        let mut pairs = vec![
            LatencyPair::new("us-east-1", "us-west-1", 70.0),
            LatencyPair::new("us-east-1", "us-west-2", 80.0),
            LatencyPair::new("us-west-1", "us-west-2", 20.0),
            LatencyPair::new("us-east-1", "eu-west-1", 80.0),
            LatencyPair::new("us-east-1", "eu-central-1", 90.0),
            LatencyPair::new("us-west-1", "eu-west-1", 140.0),
            LatencyPair::new("eu-west-1", "eu-central-1", 25.0),
            LatencyPair::new("ap-northeast-1", "ap-southeast-1", 70.0),
            LatencyPair::new("us-west-1", "ap-northeast-1", 110.0),
            LatencyPair::new("us-west-1", "ap-southeast-1", 180.0),
            LatencyPair::new("us-east-1", "ap-northeast-1", 170.0),
            LatencyPair::new("eu-central-1", "ap-southeast-1", 160.0),
        ];
        for region in [
            "us-east-1",
            "us-west-1",
            "us-west-2",
            "eu-west-1",
            "eu-central-1",
            "ap-northeast-1",
            "ap-southeast-1",
        ] {
            pairs.push(LatencyPair::new("global", region, 100.0));
        }

        Self {
            default_ms: 150.0,
            saturation_ms: 400.0,
            reference_tokens: 1000,
            pairs,
        }
    }
}

/// Region name and coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RegionConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Scoring weights.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of latency pressure (final latency / SLA).
    pub latency_weight: f64,

    /// Weight of normalized cost at priority 5.
    pub cost_weight: f64,

    /// Cost at which the normalized cost term reaches 0.5, in USD.
    pub cost_reference: f64,

    /// Cost weight multiplier when a request sets `prefer_cost`.
    pub prefer_cost_multiplier: f64,

    /// Score multiplier for degraded backends.
    pub degraded_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            latency_weight: 1.0,
            cost_weight: 1.0,
            cost_reference: 0.02,
            prefer_cost_multiplier: 2.0,
            degraded_penalty: 1.5,
        }
    }
}

/// Fluctuation simulator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FluctuationConfig {
    /// Run the simulator in the background.
    pub enabled: bool,

    /// Background tick interval in seconds.
    pub interval_secs: u64,

    /// Probability that a given backend changes on a tick.
    pub change_probability: f64,

    /// Upper bound on changes per tick.
    pub max_changes_per_tick: usize,

    /// Lower bound for a new load, in percent.
    pub min_load: f64,

    /// Upper bound for a new load, in percent.
    pub max_load: f64,
}

impl Default for FluctuationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 30,
            change_probability: 0.1,
            max_changes_per_tick: 3,
            min_load: 10.0,
            max_load: 90.0,
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub id: String,

    /// Hardware label.
    pub chip_type: String,

    /// Region key into the latency table.
    pub region: String,

    /// Initial status (default: healthy).
    #[serde(default = "default_status")]
    pub status: BackendStatus,

    /// Initial load in percent.
    #[serde(default)]
    pub current_load: f64,

    /// Processing latency at zero queue, in ms.
    pub base_latency_ms: f64,

    /// Price per token in USD.
    pub cost_per_token: f64,

    /// Model identifiers served.
    #[serde(default)]
    pub supported_models: Vec<String>,

    /// Compliance tags satisfied.
    #[serde(default)]
    pub compliance_tags: Vec<String>,
}

fn default_status() -> BackendStatus {
    BackendStatus::Healthy
}
