//! Routing decision engine.
//!
//! # Responsibilities
//! - Drive filter → score → select → fallback → decision for one request
//! - Pin one registry snapshot and one latency/scoring configuration per call
//! - Publish new latency/scoring settings without blocking routing calls
//!
//! # State Machine
//! ```text
//! Filtering ──(none compatible)──────────────────────────► Decided(error)
//!     │
//!     ▼
//! Scoring ─► Selecting ──(simulate_failure)─► Fallback ──► Decided(next | error)
//!                 │
//!                 └──────────────────────────────────────► Decided(primary)
//! ```
//! At most one fallback hop per call.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{LatencyConfig, RouterConfig, ScoringConfig};
use crate::latency::LatencyModel;
use crate::observability::metrics;
use crate::registry::{Backend, BackendRegistry, FleetSnapshot};
use crate::routing::filter::BackendFilter;
use crate::routing::recommend::{Recommendation, RecommendationQuery};
use crate::routing::request::{InferenceRequest, RequestError};
use crate::routing::result::{
    FallbackInfo, RoutingDecision, RoutingResult, NO_COMPATIBLE_BACKEND, NO_FALLBACK_BACKEND,
    SIMULATED_FAILURE,
};
use crate::routing::scorer::{BackendScorer, ConsideredBackend, ScoredCandidate};
use crate::routing::summary::RoutingSummary;

/// Latency model and scorer used together for one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub latency: LatencyModel,
    pub scorer: BackendScorer,
}

impl EngineSettings {
    pub fn new(latency: &LatencyConfig, scoring: &ScoringConfig) -> Self {
        Self {
            latency: LatencyModel::from_config(latency),
            scorer: BackendScorer::new(scoring.clone()),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new(&LatencyConfig::default(), &ScoringConfig::default())
    }
}

/// Results of a batch routing call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchRouting {
    pub results: Vec<RoutingResult>,
    pub summary: RoutingSummary,
}

enum RouteState<'a> {
    Filtering,
    Scoring(Vec<&'a Backend>),
    Selecting,
    Fallback,
    Decided(Choice),
}

enum Choice {
    Candidate(usize),
    Error(&'static str),
}

/// Routes requests against a shared registry.
#[derive(Debug)]
pub struct RoutingEngine {
    registry: Arc<BackendRegistry>,
    settings: ArcSwap<EngineSettings>,
}

impl RoutingEngine {
    pub fn new(registry: Arc<BackendRegistry>, settings: EngineSettings) -> Self {
        Self {
            registry,
            settings: ArcSwap::from_pointee(settings),
        }
    }

    pub fn from_config(registry: Arc<BackendRegistry>, config: &RouterConfig) -> Self {
        Self::new(registry, EngineSettings::new(&config.latency, &config.scoring))
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Settings currently in effect.
    pub fn settings(&self) -> Arc<EngineSettings> {
        self.settings.load_full()
    }

    /// Replace latency and scoring settings.
    pub fn reload(&self, latency: &LatencyConfig, scoring: &ScoringConfig) {
        self.settings
            .store(Arc::new(EngineSettings::new(latency, scoring)));
        tracing::info!(
            latency_pairs = latency.pairs.len(),
            default_ms = latency.default_ms,
            "Routing settings reloaded"
        );
    }

    /// Set the network latency for one region pair (one direction).
    pub fn update_latency(&self, from: &str, to: &str, ms: f64) -> Result<(), RequestError> {
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(RequestError::InvalidLatencyUpdate(
                "regions must not be empty".to_string(),
            ));
        }
        if !ms.is_finite() || ms < 0.0 {
            return Err(RequestError::InvalidLatencyUpdate(format!(
                "latency must be a non-negative number, got {}",
                ms
            )));
        }

        self.settings.rcu(|current| {
            Arc::new(EngineSettings {
                latency: current.latency.with_latency(from, to, ms),
                scorer: current.scorer.clone(),
            })
        });
        tracing::info!(from, to, ms, "Network latency updated");
        Ok(())
    }

    /// Route one request against the current fleet.
    pub fn route(&self, request: &InferenceRequest) -> RoutingResult {
        let result = self.evaluate(request);
        metrics::record_routing(&result);
        result
    }

    /// Route one request against a caller-provided snapshot.
    pub fn route_with_snapshot(
        &self,
        snapshot: &FleetSnapshot,
        request: &InferenceRequest,
    ) -> RoutingResult {
        let settings = self.settings.load_full();
        decide(snapshot, &settings, request)
    }

    /// Route several requests, each against the fleet as it is at that moment.
    pub fn route_batch(&self, requests: &[InferenceRequest]) -> BatchRouting {
        let results: Vec<RoutingResult> = requests.iter().map(|r| self.route(r)).collect();
        let summary = RoutingSummary::from_results(&results);
        tracing::info!(
            requests = summary.total_requests,
            successful = summary.successful_routes,
            fallbacks = summary.fallback_routes,
            "Batch routed"
        );
        BatchRouting { results, summary }
    }

    /// Recommendations for a request profile, based on a probe request.
    pub fn recommend(&self, query: RecommendationQuery) -> Result<Recommendation, RequestError> {
        let request = query.probe_request()?;
        let result = self.evaluate(&request);
        Ok(Recommendation::from_result(&query, &result))
    }

    fn evaluate(&self, request: &InferenceRequest) -> RoutingResult {
        let snapshot = self.registry.snapshot();
        let settings = self.settings.load_full();
        decide(&snapshot, &settings, request)
    }
}

/// Run the state machine for one request.
pub fn decide(
    snapshot: &FleetSnapshot,
    settings: &EngineSettings,
    request: &InferenceRequest,
) -> RoutingResult {
    let mut filtered = Vec::new();
    let mut ranked: Vec<ScoredCandidate<'_>> = Vec::new();
    let mut fallback_info: Option<FallbackInfo> = None;
    let mut state = RouteState::Filtering;

    let choice = loop {
        state = match state {
            RouteState::Filtering => {
                let outcome = BackendFilter::apply(snapshot.backends(), request);
                filtered = outcome.filtered;
                if outcome.compatible.is_empty() {
                    RouteState::Decided(Choice::Error(NO_COMPATIBLE_BACKEND))
                } else {
                    RouteState::Scoring(outcome.compatible)
                }
            }
            RouteState::Scoring(compatible) => {
                ranked = settings
                    .scorer
                    .rank(&settings.latency, &compatible, request);
                RouteState::Selecting
            }
            RouteState::Selecting => match ranked.first() {
                None => RouteState::Decided(Choice::Error(NO_COMPATIBLE_BACKEND)),
                Some(primary) if request.simulate_failure => {
                    tracing::warn!(
                        request_id = %request.id,
                        backend_id = %primary.backend.id,
                        reason = SIMULATED_FAILURE,
                        "Primary backend failed, falling back"
                    );
                    fallback_info = Some(FallbackInfo {
                        original_backend_id: primary.backend.id.clone(),
                        original_chip_type: primary.backend.chip_type.clone(),
                        failure_reason: SIMULATED_FAILURE.to_string(),
                    });
                    RouteState::Fallback
                }
                Some(_) => RouteState::Decided(Choice::Candidate(0)),
            },
            RouteState::Fallback => {
                if ranked.len() > 1 {
                    RouteState::Decided(Choice::Candidate(1))
                } else {
                    RouteState::Decided(Choice::Error(NO_FALLBACK_BACKEND))
                }
            }
            RouteState::Decided(choice) => break choice,
        };
    };

    let (decision, sla_met) = match choice {
        Choice::Candidate(index) => {
            let candidate = &ranked[index];
            tracing::info!(
                request_id = %request.id,
                backend_id = %candidate.backend.id,
                region = %candidate.backend.region,
                final_latency_ms = candidate.latency.total_ms,
                score = candidate.score,
                sla_met = candidate.meets_sla,
                "Request routed"
            );
            (RoutingDecision::selected(candidate), candidate.meets_sla)
        }
        Choice::Error(error) => {
            tracing::info!(
                request_id = %request.id,
                model = %request.model,
                filtered = filtered.len(),
                error,
                "Request not routed"
            );
            (RoutingDecision::failed(error), false)
        }
    };

    RoutingResult {
        decision,
        is_fallback: fallback_info.is_some(),
        fallback_info,
        sla_met,
        considered_backends: ranked.iter().map(ConsideredBackend::from).collect(),
        filtered_backends: filtered,
        request_info: request.clone(),
        generation: snapshot.generation(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::NetworkLatencyTable;
    use crate::registry::{BackendStatus, BackendUpdate};
    use crate::test_utils::{backend, request, tags};

    fn settings() -> EngineSettings {
        let mut table = NetworkLatencyTable::new(150.0);
        table.set("us-east-1", "eu-west-1", 80.0);
        EngineSettings {
            latency: LatencyModel::new(table, 400.0, 1000),
            scorer: BackendScorer::default(),
        }
    }

    fn engine(backends: Vec<Backend>) -> RoutingEngine {
        let registry = Arc::new(BackendRegistry::new(backends).unwrap());
        RoutingEngine::new(registry, settings())
    }

    #[test]
    fn test_routes_to_best_candidate() {
        let mut a = backend("a", "us-east-1");
        a.current_load = 10.0;
        let mut b = backend("b", "eu-west-1");
        b.current_load = 90.0;

        let result = engine(vec![a, b]).route(&request());
        assert_eq!(result.selected_backend_id(), Some("a"));
        assert!(result.sla_met);
        assert!(!result.is_fallback);
        assert!(result.fallback_info.is_none());
        assert_eq!(result.considered_backends.len(), 2);
        assert!(result.filtered_backends.is_empty());
    }

    #[test]
    fn test_no_compatible_backend() {
        let mut req = request();
        req.model = "unknown".into();

        let result = engine(vec![backend("a", "us-east-1")]).route(&req);
        assert_eq!(result.error(), Some(NO_COMPATIBLE_BACKEND));
        assert!(!result.is_fallback);
        assert!(!result.sla_met);
        assert!(result.considered_backends.is_empty());
        assert_eq!(result.filtered_backends.len(), 1);
        assert_eq!(result.outcome(), "no_backend");
    }

    #[test]
    fn test_simulated_failure_falls_back() {
        let mut req = request();
        req.simulate_failure = true;
        let engine = engine(vec![backend("a", "us-east-1"), backend("b", "eu-west-1")]);

        let result = engine.route(&req);
        assert!(result.is_fallback);
        assert_eq!(result.selected_backend_id(), Some("b"));
        let info = result.fallback_info.unwrap();
        assert_eq!(info.original_backend_id, "a");
        assert_eq!(info.failure_reason, SIMULATED_FAILURE);
        assert_eq!(result.considered_backends.len(), 2);
    }

    #[test]
    fn test_fallback_exhausted() {
        let mut req = request();
        req.simulate_failure = true;

        let result = engine(vec![backend("a", "us-east-1")]).route(&req);
        assert_eq!(result.error(), Some(NO_FALLBACK_BACKEND));
        assert!(result.is_fallback);
        assert_eq!(
            result.fallback_info.as_ref().map(|f| f.failure_reason.as_str()),
            Some(SIMULATED_FAILURE)
        );
        assert_eq!(result.outcome(), "fallback_exhausted");
    }

    #[test]
    fn test_sla_flag_matches_latency() {
        let mut far = backend("far", "ap-southeast-1");
        far.current_load = 80.0;
        let mut req = request();
        req.required_latency_ms = 100;

        let result = engine(vec![far]).route(&req);
        let latency = result.decision.final_latency_ms().unwrap();
        assert_eq!(result.sla_met, latency <= 100.0);
        assert!(!result.sla_met);
    }

    #[test]
    fn test_partition_covers_snapshot() {
        let mut down = backend("down", "us-east-1");
        down.status = BackendStatus::Down;
        let mut tagged = backend("tagged", "eu-west-1");
        tagged.compliance_tags = tags(&["gdpr"]);
        let engine = engine(vec![backend("plain", "us-east-1"), down, tagged]);

        let mut req = request();
        req.compliance_tags = tags(&["gdpr"]);
        let result = engine.route(&req);

        let mut ids: Vec<String> = result
            .considered_backends
            .iter()
            .map(|c| c.backend_id.clone())
            .chain(result.filtered_backends.iter().map(|f| f.backend_id.clone()))
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["down", "plain", "tagged"]);
        assert_eq!(result.selected_backend_id(), Some("tagged"));
    }

    #[test]
    fn test_decision_uses_pinned_snapshot() {
        let engine = engine(vec![backend("a", "us-east-1"), backend("b", "us-east-1")]);
        let snapshot = engine.registry().snapshot();

        engine
            .registry()
            .update_backend(
                "a",
                BackendUpdate {
                    status: Some(BackendStatus::Down),
                    load: None,
                },
            )
            .unwrap();

        let pinned = engine.route_with_snapshot(&snapshot, &request());
        assert_eq!(pinned.selected_backend_id(), Some("a"));
        assert_eq!(pinned.generation, snapshot.generation());

        let fresh = engine.route(&request());
        assert_eq!(fresh.selected_backend_id(), Some("b"));
    }

    #[test]
    fn test_update_latency_changes_routing() {
        let engine = engine(vec![backend("east", "us-east-1"), backend("west", "eu-west-1")]);
        let mut req = request();
        req.user_region = "eu-central-1".into();

        // Both regions unknown from eu-central-1: equal latency, tie broken by id.
        assert_eq!(engine.route(&req).selected_backend_id(), Some("east"));

        engine.update_latency("eu-central-1", "eu-west-1", 20.0).unwrap();
        assert_eq!(engine.route(&req).selected_backend_id(), Some("west"));

        assert!(engine.update_latency("eu-central-1", "eu-west-1", -1.0).is_err());
        assert!(engine.update_latency("", "eu-west-1", 1.0).is_err());
    }

    #[test]
    fn test_reload_replaces_settings() {
        let engine = engine(vec![backend("a", "us-east-1")]);
        let mut latency = LatencyConfig::default();
        latency.default_ms = 42.0;
        engine.reload(&latency, &ScoringConfig::default());
        assert_eq!(engine.settings().latency.table().default_ms(), 42.0);
    }

    #[test]
    fn test_route_batch_summary() {
        let engine = engine(vec![backend("a", "us-east-1"), backend("b", "us-east-1")]);
        let mut failing = request();
        failing.simulate_failure = true;
        let mut unknown = request();
        unknown.model = "nope".into();

        let batch = engine.route_batch(&[request(), failing, unknown]);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.summary.successful_routes, 2);
        assert_eq!(batch.summary.fallback_routes, 1);
        assert_eq!(batch.summary.failed_routes, 1);
    }
}
