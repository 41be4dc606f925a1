//! Routing request types.
//!
//! # Responsibilities
//! - Define the validated [`InferenceRequest`] the engine works on
//! - Define the [`RouteRequest`] wire shape with its defaults
//! - Reject malformed requests before they reach the engine

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest priority (most latency-sensitive).
pub const PRIORITY_HIGHEST: u8 = 1;
/// Lowest priority (most cost-sensitive).
pub const PRIORITY_LOWEST: u8 = 5;

/// Reasons a wire request is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("model must not be empty")]
    EmptyModel,

    #[error("token_size must be greater than 0")]
    ZeroTokenSize,

    #[error("required_latency must be greater than 0")]
    ZeroLatency,

    #[error("priority {0} out of range (expected 1..=5)")]
    PriorityOutOfRange(u8),

    #[error("max_cost must be a non-negative number, got {0}")]
    InvalidMaxCost(f64),

    #[error("user_region must not be empty")]
    EmptyRegion,

    #[error("invalid latency update: {0}")]
    InvalidLatencyUpdate(String),
}

/// One routing query, validated and immutable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub id: String,
    pub model: String,
    pub token_size: u64,
    pub required_latency_ms: u64,
    pub user_region: String,
    /// Empty means no compliance constraint.
    pub compliance_tags: BTreeSet<String>,
    /// 1 (highest) to 5 (lowest).
    pub priority: u8,
    pub max_cost: Option<f64>,
    pub prefer_cost: bool,
    /// Fault injection: the primary choice fails and the engine falls back.
    pub simulate_failure: bool,
}

/// JSON body accepted by the route endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRequest {
    pub model: String,
    pub token_size: u64,
    #[serde(alias = "required_latency_ms")]
    pub required_latency: u64,
    pub user_region: String,
    pub compliance_tags: Vec<String>,
    pub priority: u8,
    pub max_cost: Option<f64>,
    pub prefer_cost: bool,
    pub simulate_failure: bool,
}

impl Default for RouteRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            token_size: 1000,
            required_latency: 200,
            user_region: "us-east-1".to_string(),
            compliance_tags: Vec::new(),
            priority: PRIORITY_HIGHEST,
            max_cost: None,
            prefer_cost: false,
            simulate_failure: false,
        }
    }
}

impl RouteRequest {
    /// Shorthand for a request with every other field at its default.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Validate and convert into an engine request with a fresh id.
    pub fn into_request(self) -> Result<InferenceRequest, RequestError> {
        let model = self.model.trim().to_string();
        if model.is_empty() {
            return Err(RequestError::EmptyModel);
        }
        if self.token_size == 0 {
            return Err(RequestError::ZeroTokenSize);
        }
        if self.required_latency == 0 {
            return Err(RequestError::ZeroLatency);
        }
        if !(PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&self.priority) {
            return Err(RequestError::PriorityOutOfRange(self.priority));
        }
        if let Some(max_cost) = self.max_cost {
            if !max_cost.is_finite() || max_cost < 0.0 {
                return Err(RequestError::InvalidMaxCost(max_cost));
            }
        }
        let user_region = self.user_region.trim().to_string();
        if user_region.is_empty() {
            return Err(RequestError::EmptyRegion);
        }

        Ok(InferenceRequest {
            id: uuid::Uuid::new_v4().to_string(),
            model,
            token_size: self.token_size,
            required_latency_ms: self.required_latency,
            user_region,
            compliance_tags: self
                .compliance_tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            priority: self.priority,
            max_cost: self.max_cost,
            prefer_cost: self.prefer_cost,
            simulate_failure: self.simulate_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let wire: RouteRequest = serde_json::from_str(r#"{"model": "gpt-4"}"#).unwrap();
        let request = wire.into_request().unwrap();

        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.token_size, 1000);
        assert_eq!(request.required_latency_ms, 200);
        assert_eq!(request.user_region, "us-east-1");
        assert_eq!(request.priority, 1);
        assert!(request.compliance_tags.is_empty());
        assert!(!request.simulate_failure);
        assert!(uuid::Uuid::parse_str(&request.id).is_ok());
    }

    #[test]
    fn test_required_latency_alias() {
        let wire: RouteRequest =
            serde_json::from_str(r#"{"model": "gpt-4", "required_latency_ms": 90}"#).unwrap();
        assert_eq!(wire.required_latency, 90);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        assert_eq!(
            RouteRequest::for_model("  ").into_request(),
            Err(RequestError::EmptyModel)
        );

        let mut wire = RouteRequest::for_model("gpt-4");
        wire.token_size = 0;
        assert_eq!(wire.into_request(), Err(RequestError::ZeroTokenSize));

        let mut wire = RouteRequest::for_model("gpt-4");
        wire.required_latency = 0;
        assert_eq!(wire.into_request(), Err(RequestError::ZeroLatency));

        let mut wire = RouteRequest::for_model("gpt-4");
        wire.priority = 6;
        assert_eq!(wire.into_request(), Err(RequestError::PriorityOutOfRange(6)));

        let mut wire = RouteRequest::for_model("gpt-4");
        wire.priority = 0;
        assert_eq!(wire.into_request(), Err(RequestError::PriorityOutOfRange(0)));

        let mut wire = RouteRequest::for_model("gpt-4");
        wire.max_cost = Some(-1.0);
        assert_eq!(wire.into_request(), Err(RequestError::InvalidMaxCost(-1.0)));
    }

    #[test]
    fn test_compliance_tags_deduplicated() {
        let mut wire = RouteRequest::for_model("gpt-4");
        wire.compliance_tags = vec!["gdpr".into(), "gdpr".into(), " ".into()];
        let request = wire.into_request().unwrap();
        assert_eq!(request.compliance_tags.len(), 1);
    }
}
