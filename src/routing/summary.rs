//! Aggregate report over a batch of routing results.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::routing::result::RoutingResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutingSummary {
    pub total_requests: usize,
    pub successful_routes: usize,
    pub failed_routes: usize,
    /// Successful routes that went through a fallback.
    pub fallback_routes: usize,
    /// Share of successful routes that needed a fallback, in percent.
    pub fallback_percentage: f64,
    /// Share of requests that got a backend, in percent.
    pub success_rate: f64,
    pub sla_met_count: usize,
    /// Mean over successful routes only.
    pub average_latency_ms: f64,
    pub average_cost: f64,
    pub backend_usage: BTreeMap<String, usize>,
    pub most_used_backend: Option<String>,
}

impl RoutingSummary {
    pub fn from_results(results: &[RoutingResult]) -> Self {
        let mut summary = RoutingSummary {
            total_requests: results.len(),
            ..Default::default()
        };
        let mut latency_sum = 0.0;
        let mut cost_sum = 0.0;

        for result in results {
            if result.sla_met {
                summary.sla_met_count += 1;
            }
            let Some(backend_id) = result.selected_backend_id() else {
                summary.failed_routes += 1;
                continue;
            };

            summary.successful_routes += 1;
            if result.is_fallback {
                summary.fallback_routes += 1;
            }
            latency_sum += result.decision.final_latency_ms().unwrap_or_default();
            cost_sum += result.decision.final_cost().unwrap_or_default();
            *summary.backend_usage.entry(backend_id.to_string()).or_default() += 1;
        }

        if summary.successful_routes > 0 {
            let successful = summary.successful_routes as f64;
            summary.average_latency_ms = latency_sum / successful;
            summary.average_cost = cost_sum / successful;
            summary.fallback_percentage = summary.fallback_routes as f64 * 100.0 / successful;
        }
        if summary.total_requests > 0 {
            summary.success_rate =
                summary.successful_routes as f64 * 100.0 / summary.total_requests as f64;
        }

        // BTreeMap iterates by id, so ties resolve to the smallest id.
        summary.most_used_backend = summary
            .backend_usage
            .iter()
            .fold(None::<(&String, usize)>, |best, (id, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((id, *count)),
            })
            .map(|(id, _)| id.clone());

        summary
    }
}
