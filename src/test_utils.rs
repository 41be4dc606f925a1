//! Fixtures shared by unit tests.

use std::collections::BTreeSet;

use crate::registry::{Backend, BackendStatus};
use crate::routing::InferenceRequest;

/// A healthy, idle GPU backend serving `gpt-4` with no compliance tags.
pub fn backend(id: &str, region: &str) -> Backend {
    Backend {
        id: id.to_string(),
        chip_type: "NVIDIA H100".to_string(),
        region: region.to_string(),
        status: BackendStatus::Healthy,
        current_load: 0.0,
        base_latency_ms: 50.0,
        cost_per_token: 0.00002,
        supported_models: tags(&["gpt-4"]),
        compliance_tags: BTreeSet::new(),
    }
}

/// A 1000-token `gpt-4` request from `us-east-1` with a 200 ms SLA.
pub fn request() -> InferenceRequest {
    InferenceRequest {
        id: "req-test".to_string(),
        model: "gpt-4".to_string(),
        token_size: 1000,
        required_latency_ms: 200,
        user_region: "us-east-1".to_string(),
        compliance_tags: BTreeSet::new(),
        priority: 1,
        max_cost: None,
        prefer_cost: false,
        simulate_failure: false,
    }
}

pub fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}
