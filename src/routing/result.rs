//! Routing outcome types.

use serde::Serialize;

use crate::registry::BackendStatus;
use crate::routing::filter::FilteredBackend;
use crate::routing::request::InferenceRequest;
use crate::routing::scorer::{ConsideredBackend, ScoredCandidate};

/// Error reported when no backend passes the filter.
pub const NO_COMPATIBLE_BACKEND: &str = "no compatible backend";
/// Error reported when the primary failed and nothing is left to fall back to.
pub const NO_FALLBACK_BACKEND: &str = "no fallback backend available";
/// Failure reason attached to an injected primary failure.
pub const SIMULATED_FAILURE: &str = "simulated backend failure";

/// Chosen backend, or why none was chosen. Never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RoutingDecision {
    Selected {
        backend_id: String,
        chip_type: String,
        region: String,
        status: BackendStatus,
        current_load: f64,
        final_latency_ms: f64,
        final_cost: f64,
        score: f64,
        estimated_queue_time_ms: f64,
    },
    Failed {
        error: String,
    },
}

impl RoutingDecision {
    pub(crate) fn selected(candidate: &ScoredCandidate<'_>) -> Self {
        let backend = candidate.backend;
        RoutingDecision::Selected {
            backend_id: backend.id.clone(),
            chip_type: backend.chip_type.clone(),
            region: backend.region.clone(),
            status: backend.status,
            current_load: backend.current_load,
            final_latency_ms: candidate.latency.total_ms,
            final_cost: candidate.cost,
            score: candidate.score,
            estimated_queue_time_ms: candidate.latency.queue_ms,
        }
    }

    pub(crate) fn failed(error: &str) -> Self {
        RoutingDecision::Failed {
            error: error.to_string(),
        }
    }

    pub fn backend_id(&self) -> Option<&str> {
        match self {
            RoutingDecision::Selected { backend_id, .. } => Some(backend_id),
            RoutingDecision::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RoutingDecision::Selected { .. } => None,
            RoutingDecision::Failed { error } => Some(error),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, RoutingDecision::Selected { .. })
    }

    pub fn final_latency_ms(&self) -> Option<f64> {
        match self {
            RoutingDecision::Selected {
                final_latency_ms, ..
            } => Some(*final_latency_ms),
            RoutingDecision::Failed { .. } => None,
        }
    }

    pub fn final_cost(&self) -> Option<f64> {
        match self {
            RoutingDecision::Selected { final_cost, .. } => Some(*final_cost),
            RoutingDecision::Failed { .. } => None,
        }
    }
}

/// Details of a primary failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackInfo {
    pub original_backend_id: String,
    pub original_chip_type: String,
    pub failure_reason: String,
}

/// Complete outcome of one routing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingResult {
    pub decision: RoutingDecision,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_info: Option<FallbackInfo>,
    pub sla_met: bool,
    pub considered_backends: Vec<ConsideredBackend>,
    pub filtered_backends: Vec<FilteredBackend>,
    pub request_info: InferenceRequest,
    /// Registry generation the decision was made against.
    pub generation: u64,
}

impl RoutingResult {
    pub fn selected_backend_id(&self) -> Option<&str> {
        self.decision.backend_id()
    }

    pub fn error(&self) -> Option<&str> {
        self.decision.error()
    }

    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match (self.decision.is_selected(), self.is_fallback) {
            (true, false) => "routed",
            (true, true) => "fallback",
            (false, false) => "no_backend",
            (false, true) => "fallback_exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serializes_flat() {
        let decision = RoutingDecision::failed(NO_COMPATIBLE_BACKEND);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "no compatible backend" }));
        assert_eq!(decision.backend_id(), None);
        assert_eq!(decision.error(), Some(NO_COMPATIBLE_BACKEND));
    }

    #[test]
    fn test_selected_has_no_error_field() {
        let decision = RoutingDecision::Selected {
            backend_id: "b1".into(),
            chip_type: "GPU".into(),
            region: "us-east-1".into(),
            status: BackendStatus::Healthy,
            current_load: 10.0,
            final_latency_ms: 55.0,
            final_cost: 0.02,
            score: 0.3,
            estimated_queue_time_ms: 0.4,
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["backend_id"], "b1");
        assert!(json.get("error").is_none());
    }
}
