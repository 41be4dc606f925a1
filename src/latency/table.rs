//! Inter-region network latency table.
//!
//! # Design Decisions
//! - Same region is always 0 ms
//! - A missing (from, to) entry falls back to (to, from), so symmetric links
//!   only need to be configured once
//! - Unknown pairs get `default_ms` instead of an error; the table may be partial

use std::collections::{BTreeMap, HashMap};

use crate::config::LatencyConfig;

/// Region-pair → network latency lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLatencyTable {
    default_ms: f64,
    entries: HashMap<(String, String), f64>,
}

impl NetworkLatencyTable {
    /// Empty table answering `default_ms` for every cross-region pair.
    pub fn new(default_ms: f64) -> Self {
        Self {
            default_ms,
            entries: HashMap::new(),
        }
    }

    pub fn from_config(config: &LatencyConfig) -> Self {
        let mut table = Self::new(config.default_ms);
        for pair in &config.pairs {
            table.set(&pair.from, &pair.to, pair.ms);
        }
        table
    }

    /// Latency reported for pairs missing from the table.
    pub fn default_ms(&self) -> f64 {
        self.default_ms
    }

    /// Set the latency for one direction.
    pub fn set(&mut self, from: &str, to: &str, ms: f64) {
        self.entries.insert((from.to_string(), to.to_string()), ms);
    }

    /// Network latency from `from` to `to` in milliseconds.
    pub fn lookup(&self, from: &str, to: &str) -> f64 {
        if from == to {
            return 0.0;
        }
        if let Some(ms) = self.entries.get(&(from.to_string(), to.to_string())) {
            return *ms;
        }
        if let Some(ms) = self.entries.get(&(to.to_string(), from.to_string())) {
            return *ms;
        }
        tracing::debug!(from, to, default_ms = self.default_ms, "No latency entry for region pair");
        self.default_ms
    }

    /// Configured entries as `from → to → ms`.
    pub fn as_map(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        let mut map: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for ((from, to), ms) in &self.entries {
            map.entry(from.clone()).or_default().insert(to.clone(), *ms);
        }
        map
    }
}
