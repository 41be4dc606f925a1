//! Latency and cost model for a (request, backend) pair.
//!
//! ```text
//! final_latency = network(user_region, backend.region)
//!               + queue(backend.current_load)
//!               + processing(backend.base_latency_ms, token_size)
//!
//! queue(load)        = saturation_ms * u^3,  u = load / 100
//! processing(b, n)   = b * (0.5 + 0.5 * n / reference_tokens)
//! final_cost         = cost_per_token * token_size
//! ```
//!
//! The cubic queue curve stays near zero below ~60% load and climbs steeply
//! past 80%, which is where the fleet starts queueing for real.

use serde::Serialize;

use crate::config::LatencyConfig;
use crate::latency::table::NetworkLatencyTable;
use crate::registry::Backend;
use crate::routing::InferenceRequest;

/// Components of a modelled latency, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyBreakdown {
    pub network_ms: f64,
    pub queue_ms: f64,
    pub processing_ms: f64,
    pub total_ms: f64,
}

/// Network table plus queue and processing curves.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyModel {
    table: NetworkLatencyTable,
    saturation_ms: f64,
    reference_tokens: f64,
}

impl LatencyModel {
    pub fn new(table: NetworkLatencyTable, saturation_ms: f64, reference_tokens: u64) -> Self {
        Self {
            table,
            saturation_ms: saturation_ms.max(0.0),
            reference_tokens: reference_tokens.max(1) as f64,
        }
    }

    pub fn from_config(config: &LatencyConfig) -> Self {
        Self::new(
            NetworkLatencyTable::from_config(config),
            config.saturation_ms,
            config.reference_tokens,
        )
    }

    pub fn table(&self) -> &NetworkLatencyTable {
        &self.table
    }

    /// Copy of this model with one region-pair latency replaced.
    pub fn with_latency(&self, from: &str, to: &str, ms: f64) -> Self {
        let mut next = self.clone();
        next.table.set(from, to, ms);
        next
    }

    pub fn network_latency(&self, from_region: &str, to_region: &str) -> f64 {
        self.table.lookup(from_region, to_region)
    }

    /// Modelled queue wait for a load percentage.
    pub fn queue_time_for_load(&self, load: f64) -> f64 {
        let u = (load / 100.0).clamp(0.0, 1.0);
        self.saturation_ms * u * u * u
    }

    /// Modelled queue wait for a backend, derived from its current load.
    pub fn queue_time(&self, backend: &Backend) -> f64 {
        self.queue_time_for_load(backend.current_load)
    }

    /// Processing time for `token_size` tokens on `backend`.
    pub fn processing_latency(&self, backend: &Backend, token_size: u64) -> f64 {
        let volume = token_size as f64 / self.reference_tokens;
        backend.base_latency_ms * (0.5 + 0.5 * volume)
    }

    /// Network + queue + processing latency for a request on a backend.
    pub fn final_latency(&self, request: &InferenceRequest, backend: &Backend) -> LatencyBreakdown {
        let network_ms = self.network_latency(&request.user_region, &backend.region);
        let queue_ms = self.queue_time(backend);
        let processing_ms = self.processing_latency(backend, request.token_size);
        LatencyBreakdown {
            network_ms,
            queue_ms,
            processing_ms,
            total_ms: network_ms + queue_ms + processing_ms,
        }
    }

    /// Cost of serving the request on the backend.
    pub fn final_cost(&self, backend: &Backend, request: &InferenceRequest) -> f64 {
        backend.cost_for(request.token_size)
    }
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self::from_config(&LatencyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{backend, request};

    fn model() -> LatencyModel {
        let mut table = NetworkLatencyTable::new(150.0);
        table.set("us-east-1", "eu-west-1", 80.0);
        LatencyModel::new(table, 400.0, 1000)
    }

    #[test]
    fn test_queue_time_curve() {
        let model = model();
        assert_eq!(model.queue_time_for_load(0.0), 0.0);
        assert_eq!(model.queue_time_for_load(100.0), 400.0);

        let mut previous = 0.0;
        for load in (0..=100).map(f64::from) {
            let q = model.queue_time_for_load(load);
            assert!(q >= previous, "queue time must not decrease (load {})", load);
            previous = q;
        }

        // 80%+ band must be visibly worse than anything up to 60%.
        assert!(model.queue_time_for_load(80.0) > 2.0 * model.queue_time_for_load(60.0));
    }

    #[test]
    fn test_processing_monotonic_in_tokens() {
        let model = model();
        let b = backend("b", "us-east-1");
        assert_eq!(model.processing_latency(&b, 1000), 50.0);
        assert!(model.processing_latency(&b, 2000) > model.processing_latency(&b, 1000));
        assert!(model.processing_latency(&b, 1) < model.processing_latency(&b, 1000));
    }

    #[test]
    fn test_final_latency_sums_components() {
        let model = model();
        let mut b = backend("b", "eu-west-1");
        b.current_load = 50.0;
        let breakdown = model.final_latency(&request(), &b);

        assert_eq!(breakdown.network_ms, 80.0);
        assert_eq!(breakdown.queue_ms, 50.0);
        assert_eq!(breakdown.processing_ms, 50.0);
        assert_eq!(breakdown.total_ms, 180.0);
    }

    #[test]
    fn test_final_cost() {
        let model = model();
        let b = backend("b", "us-east-1");
        let cost = model.final_cost(&b, &request());
        assert!((cost - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_with_latency_leaves_original_untouched() {
        let model = model();
        let updated = model.with_latency("us-east-1", "ap-northeast-1", 160.0);
        assert_eq!(updated.network_latency("us-east-1", "ap-northeast-1"), 160.0);
        assert_eq!(model.network_latency("us-east-1", "ap-northeast-1"), 150.0);
    }
}
