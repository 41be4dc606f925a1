//! Routing recommendations for a request profile.
//!
//! A probe request (1000 tokens, priority 1) is routed without touching
//! request metrics. The outcome is turned into a recommended backend, a few
//! alternatives, and for unroutable profiles a breakdown of which filter
//! rules rejected the fleet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::request::{InferenceRequest, RequestError, RouteRequest};
use crate::routing::result::{RoutingDecision, RoutingResult};

/// Token count used for the probe request.
pub const PROBE_TOKENS: u64 = 1000;
/// How many runner-up backends to report.
pub const MAX_ALTERNATIVES: usize = 2;

/// Request profile to get recommendations for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationQuery {
    pub model: String,
    #[serde(alias = "required_latency")]
    pub required_latency_ms: u64,
    pub compliance_tags: Vec<String>,
    pub user_region: String,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        let route = RouteRequest::default();
        Self {
            model: route.model,
            required_latency_ms: route.required_latency,
            compliance_tags: route.compliance_tags,
            user_region: route.user_region,
        }
    }
}

impl RecommendationQuery {
    /// Validated probe request for this profile.
    pub fn probe_request(&self) -> Result<InferenceRequest, RequestError> {
        RouteRequest {
            model: self.model.clone(),
            token_size: PROBE_TOKENS,
            required_latency: self.required_latency_ms,
            user_region: self.user_region.clone(),
            compliance_tags: self.compliance_tags.clone(),
            priority: 1,
            ..Default::default()
        }
        .into_request()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedBackend {
    pub backend_id: String,
    pub chip_type: String,
    pub region: String,
    pub estimated_latency_ms: f64,
    pub estimated_cost: f64,
    pub meets_sla: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureAnalysis {
    pub filtered_backends_count: usize,
    /// Count per rejection message.
    pub common_reasons: BTreeMap<String, usize>,
    /// Count per filter rule.
    pub rules_hit: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub can_route: bool,
    pub sla_met: bool,
    pub request_profile: RecommendationQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_backend: Option<RecommendedBackend>,
    pub alternatives: Vec<RecommendedBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_failure_analysis: Option<FailureAnalysis>,
    pub suggestions: Vec<String>,
}

impl Recommendation {
    pub fn from_result(query: &RecommendationQuery, result: &RoutingResult) -> Self {
        let recommended_backend = match &result.decision {
            RoutingDecision::Selected {
                backend_id,
                chip_type,
                region,
                final_latency_ms,
                final_cost,
                ..
            } => Some(RecommendedBackend {
                backend_id: backend_id.clone(),
                chip_type: chip_type.clone(),
                region: region.clone(),
                estimated_latency_ms: *final_latency_ms,
                estimated_cost: *final_cost,
                meets_sla: result.sla_met,
            }),
            RoutingDecision::Failed { .. } => None,
        };

        let alternatives = if recommended_backend.is_some() {
            result
                .considered_backends
                .iter()
                .skip(1)
                .take(MAX_ALTERNATIVES)
                .map(|c| RecommendedBackend {
                    backend_id: c.backend_id.clone(),
                    chip_type: c.chip_type.clone(),
                    region: c.region.clone(),
                    estimated_latency_ms: c.final_latency_ms,
                    estimated_cost: c.final_cost,
                    meets_sla: c.meets_sla,
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut suggestions = Vec::new();
        let routing_failure_analysis = if recommended_backend.is_none() {
            let mut common_reasons: BTreeMap<String, usize> = BTreeMap::new();
            let mut rules_hit: BTreeMap<String, usize> = BTreeMap::new();
            for filtered in &result.filtered_backends {
                *common_reasons.entry(filtered.reason.clone()).or_default() += 1;
                *rules_hit.entry(filtered.rule.to_string()).or_default() += 1;
            }
            for rule in rules_hit.keys() {
                if let Some(suggestion) = suggestion_for(rule) {
                    suggestions.push(suggestion.to_string());
                }
            }
            Some(FailureAnalysis {
                filtered_backends_count: result.filtered_backends.len(),
                common_reasons,
                rules_hit,
            })
        } else {
            None
        };

        if recommended_backend.is_some() && !result.sla_met {
            suggestions.push(
                "Increase latency SLA or request from a region closer to compatible backends"
                    .to_string(),
            );
        }

        Self {
            can_route: recommended_backend.is_some(),
            sla_met: result.sla_met,
            request_profile: query.clone(),
            recommended_backend,
            alternatives,
            routing_failure_analysis,
            suggestions,
        }
    }
}

fn suggestion_for(rule: &str) -> Option<&'static str> {
    match rule {
        "model" => Some("Request a different supported model"),
        "compliance" => Some("Adjust compliance requirements if possible"),
        "max_cost" => Some("Raise the cost ceiling"),
        "status" => Some("Wait for down backends to recover"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::registry::{Backend, BackendRegistry, BackendStatus};
    use crate::routing::engine::{EngineSettings, RoutingEngine};
    use crate::test_utils::{backend, tags};

    fn engine(backends: Vec<Backend>) -> RoutingEngine {
        let registry = Arc::new(BackendRegistry::new(backends).unwrap());
        RoutingEngine::new(registry, EngineSettings::default())
    }

    fn query(model: &str) -> RecommendationQuery {
        RecommendationQuery {
            model: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_probe_request_shape() {
        let probe = query("gpt-4").probe_request().unwrap();
        assert_eq!(probe.token_size, PROBE_TOKENS);
        assert_eq!(probe.priority, 1);
        assert!(!probe.simulate_failure);
        assert!(query("").probe_request().is_err());
    }

    #[test]
    fn test_recommendation_with_alternatives() {
        let engine = engine(vec![
            backend("a", "us-east-1"),
            backend("b", "us-east-1"),
            backend("c", "us-east-1"),
            backend("d", "us-east-1"),
        ]);
        let rec = engine.recommend(query("gpt-4")).unwrap();

        assert!(rec.can_route);
        assert!(rec.sla_met);
        assert_eq!(rec.recommended_backend.unwrap().backend_id, "a");
        let alternatives: Vec<&str> = rec.alternatives.iter().map(|a| a.backend_id.as_str()).collect();
        assert_eq!(alternatives, vec!["b", "c"]);
        assert!(rec.routing_failure_analysis.is_none());
        assert!(rec.suggestions.is_empty());
    }

    #[test]
    fn test_failure_analysis() {
        let mut down = backend("down", "us-east-1");
        down.status = BackendStatus::Down;
        let mut other = backend("other", "us-east-1");
        other.supported_models = tags(&["llama-3-8b"]);
        let engine = engine(vec![down, other, backend("plain", "us-east-1")]);

        let mut q = query("gpt-4");
        q.compliance_tags = vec!["gdpr".into()];
        let rec = engine.recommend(q).unwrap();

        assert!(!rec.can_route);
        assert!(rec.alternatives.is_empty());
        let analysis = rec.routing_failure_analysis.unwrap();
        assert_eq!(analysis.filtered_backends_count, 3);
        assert_eq!(analysis.rules_hit["status"], 1);
        assert_eq!(analysis.rules_hit["model"], 1);
        assert_eq!(analysis.rules_hit["compliance"], 1);
        assert_eq!(analysis.common_reasons["Backend is down"], 1);
        assert!(rec
            .suggestions
            .contains(&"Adjust compliance requirements if possible".to_string()));
        assert!(rec
            .suggestions
            .contains(&"Request a different supported model".to_string()));
    }
}
