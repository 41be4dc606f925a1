//! Candidate scoring and ranking.
//!
//! # Responsibilities
//! - Give every compatible backend a comparable score (lower is better)
//! - Rank candidates with a total, deterministic order
//!
//! # Scoring
//! ```text
//! r      = final_latency / required_latency
//! c      = cost / (cost + cost_reference)                 ∈ [0, 1)
//! w_c'   = cost_weight * (0.6 + 0.1 * (priority - 1)) * (prefer_cost ? multiplier : 1)
//! health = degraded ? degraded_penalty : 1
//!
//! r <= 1 : score = (latency_weight * r + w_c' * c) * health
//! r >  1 : score = ceiling + ((r - 1) + w_c' * c) * health
//!          ceiling = (latency_weight + w_c') * degraded_penalty + 1
//! ```
//!
//! `ceiling` is above anything an SLA-meeting candidate can score under the
//! same weights, so a breach always ranks behind every candidate that meets
//! the SLA.

use std::cmp::Ordering;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::latency::{LatencyBreakdown, LatencyModel};
use crate::registry::{Backend, BackendStatus};
use crate::routing::request::InferenceRequest;

/// A compatible backend with its modelled latency, cost and score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub backend: &'a Backend,
    pub latency: LatencyBreakdown,
    pub cost: f64,
    pub score: f64,
    pub meets_sla: bool,
}

/// Per-candidate entry reported in a routing result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsideredBackend {
    #[serde(rename = "id")]
    pub backend_id: String,
    #[serde(rename = "chip")]
    pub chip_type: String,
    pub region: String,
    pub status: BackendStatus,
    pub current_load: f64,
    pub score: f64,
    pub final_latency_ms: f64,
    pub final_cost: f64,
    pub estimated_queue_time_ms: f64,
    pub meets_sla: bool,
}

impl From<&ScoredCandidate<'_>> for ConsideredBackend {
    fn from(candidate: &ScoredCandidate<'_>) -> Self {
        let backend = candidate.backend;
        Self {
            backend_id: backend.id.clone(),
            chip_type: backend.chip_type.clone(),
            region: backend.region.clone(),
            status: backend.status,
            current_load: backend.current_load,
            score: candidate.score,
            final_latency_ms: candidate.latency.total_ms,
            final_cost: candidate.cost,
            estimated_queue_time_ms: candidate.latency.queue_ms,
            meets_sla: candidate.meets_sla,
        }
    }
}

/// Weighted latency/cost scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendScorer {
    weights: ScoringConfig,
}

impl BackendScorer {
    pub fn new(weights: ScoringConfig) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringConfig {
        &self.weights
    }

    /// Effective cost weight for a request.
    fn cost_weight(&self, request: &InferenceRequest) -> f64 {
        let priority = request.priority.clamp(1, 5) as f64;
        let mut weight = self.weights.cost_weight * (0.6 + 0.1 * (priority - 1.0));
        if request.prefer_cost {
            weight *= self.weights.prefer_cost_multiplier;
        }
        weight
    }

    fn health_factor(&self, backend: &Backend) -> f64 {
        match backend.status {
            BackendStatus::Degraded => self.weights.degraded_penalty,
            _ => 1.0,
        }
    }

    /// Score one backend for a request.
    pub fn score<'a>(
        &self,
        model: &LatencyModel,
        backend: &'a Backend,
        request: &InferenceRequest,
    ) -> ScoredCandidate<'a> {
        let latency = model.final_latency(request, backend);
        let cost = model.final_cost(backend, request);

        let required = request.required_latency_ms.max(1) as f64;
        let pressure = latency.total_ms / required;
        let cost_weight = self.cost_weight(request);
        let normalized_cost = if cost + self.weights.cost_reference > 0.0 {
            cost / (cost + self.weights.cost_reference)
        } else {
            0.0
        };
        let health = self.health_factor(backend);
        let meets_sla = latency.total_ms <= request.required_latency_ms as f64;

        let score = if meets_sla {
            (self.weights.latency_weight * pressure + cost_weight * normalized_cost) * health
        } else {
            let ceiling =
                (self.weights.latency_weight + cost_weight) * self.weights.degraded_penalty.max(1.0)
                    + 1.0;
            ceiling + ((pressure - 1.0).max(0.0) + cost_weight * normalized_cost) * health
        };

        ScoredCandidate {
            backend,
            latency,
            cost,
            score,
            meets_sla,
        }
    }

    /// Score and sort candidates, best first.
    pub fn rank<'a>(
        &self,
        model: &LatencyModel,
        candidates: &[&'a Backend],
        request: &InferenceRequest,
    ) -> Vec<ScoredCandidate<'a>> {
        let mut scored: Vec<ScoredCandidate<'a>> = candidates
            .iter()
            .copied()
            .map(|backend| self.score(model, backend, request))
            .collect();
        scored.sort_by(compare_candidates);
        scored
    }
}

impl Default for BackendScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Ascending score, then lower cost, then id.
pub fn compare_candidates(a: &ScoredCandidate<'_>, b: &ScoredCandidate<'_>) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.cost.total_cmp(&b.cost))
        .then_with(|| a.backend.id.cmp(&b.backend.id))
}
