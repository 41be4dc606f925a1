//! Candidate filtering.
//!
//! # Responsibilities
//! - Split a fleet snapshot into compatible and rejected backends
//! - Attach exactly one rejection reason to every rejected backend
//!
//! # Design Decisions
//! - Rules run in a fixed order (status, model, compliance, cost) and stop at
//!   the first failure, so the reported reason is deterministic
//! - No latency rule: an SLA breach is a scoring concern, not a filter one
//! - Stateless; safe to share across threads

use std::fmt;

use serde::Serialize;

use crate::registry::{Backend, BackendStatus};
use crate::routing::request::InferenceRequest;

/// Why a backend was excluded.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterReason {
    Down,
    ModelNotSupported { model: String },
    MissingCompliance { missing: Vec<String> },
    CostExceeded { estimated: f64, max: f64 },
}

impl FilterReason {
    /// Machine-readable rule name.
    pub fn rule(&self) -> &'static str {
        match self {
            FilterReason::Down => "status",
            FilterReason::ModelNotSupported { .. } => "model",
            FilterReason::MissingCompliance { .. } => "compliance",
            FilterReason::CostExceeded { .. } => "max_cost",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::Down => write!(f, "Backend is down"),
            FilterReason::ModelNotSupported { model } => write!(f, "Model {} not supported", model),
            FilterReason::MissingCompliance { missing } => {
                write!(f, "Missing compliance tags: {}", missing.join(", "))
            }
            FilterReason::CostExceeded { estimated, max } => write!(
                f,
                "Estimated cost (${:.6}) exceeds maximum (${:.6})",
                estimated, max
            ),
        }
    }
}

/// A backend excluded from consideration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredBackend {
    #[serde(rename = "id")]
    pub backend_id: String,
    #[serde(rename = "chip")]
    pub chip_type: String,
    pub region: String,
    pub status: BackendStatus,
    pub reason: String,
    pub rule: &'static str,
}

impl FilteredBackend {
    fn new(backend: &Backend, reason: &FilterReason) -> Self {
        Self {
            backend_id: backend.id.clone(),
            chip_type: backend.chip_type.clone(),
            region: backend.region.clone(),
            status: backend.status,
            reason: reason.to_string(),
            rule: reason.rule(),
        }
    }
}

/// Result of filtering one snapshot.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome<'a> {
    pub compatible: Vec<&'a Backend>,
    pub filtered: Vec<FilteredBackend>,
}

/// Compatibility rules applied to every backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendFilter;

impl BackendFilter {
    /// First rule the backend fails, or `None` if it is compatible.
    pub fn check(backend: &Backend, request: &InferenceRequest) -> Option<FilterReason> {
        if !backend.status.is_selectable() {
            return Some(FilterReason::Down);
        }

        if !backend.supports_model(&request.model) {
            return Some(FilterReason::ModelNotSupported {
                model: request.model.clone(),
            });
        }

        let missing = backend.missing_compliance(&request.compliance_tags);
        if !missing.is_empty() {
            return Some(FilterReason::MissingCompliance {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        if let Some(max) = request.max_cost {
            let estimated = backend.cost_for(request.token_size);
            if estimated > max {
                return Some(FilterReason::CostExceeded { estimated, max });
            }
        }

        None
    }

    /// Partition `backends` for `request`, preserving input order.
    pub fn apply<'a>(backends: &'a [Backend], request: &InferenceRequest) -> FilterOutcome<'a> {
        let mut outcome = FilterOutcome::default();

        for backend in backends {
            match Self::check(backend, request) {
                None => outcome.compatible.push(backend),
                Some(reason) => {
                    tracing::debug!(
                        request_id = %request.id,
                        backend_id = %backend.id,
                        rule = reason.rule(),
                        reason = %reason,
                        "Backend filtered"
                    );
                    outcome.filtered.push(FilteredBackend::new(backend, &reason));
                }
            }
        }

        outcome
    }
}
