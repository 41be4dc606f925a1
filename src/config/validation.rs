//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check backend ids are unique and loads are within [0, 100]
//! - Validate value ranges (weights >= 0, probabilities in [0, 1], addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `backends[2].current_load`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn check_non_negative(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ValidationError::new(field, format!("must be >= 0, got {}", value)));
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address '{}'", value)));
    }
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let latency = &config.latency;
    check_non_negative(&mut errors, "latency.default_ms", latency.default_ms);
    check_non_negative(&mut errors, "latency.saturation_ms", latency.saturation_ms);
    if latency.reference_tokens == 0 {
        errors.push(ValidationError::new("latency.reference_tokens", "must be > 0"));
    }
    for (i, pair) in latency.pairs.iter().enumerate() {
        let field = format!("latency.pairs[{}]", i);
        if pair.from.trim().is_empty() || pair.to.trim().is_empty() {
            errors.push(ValidationError::new(&field, "regions must not be empty"));
        }
        check_non_negative(&mut errors, &format!("{}.ms", field), pair.ms);
    }

    for (i, region) in config.regions.iter().enumerate() {
        let field = format!("regions[{}]", i);
        if region.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        }
        if !(-90.0..=90.0).contains(&region.latitude) {
            errors.push(ValidationError::new(format!("{}.latitude", field), "must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&region.longitude) {
            errors.push(ValidationError::new(format!("{}.longitude", field), "must be within [-180, 180]"));
        }
    }

    let scoring = &config.scoring;
    check_non_negative(&mut errors, "scoring.latency_weight", scoring.latency_weight);
    check_non_negative(&mut errors, "scoring.cost_weight", scoring.cost_weight);
    check_non_negative(&mut errors, "scoring.cost_reference", scoring.cost_reference);
    check_non_negative(&mut errors, "scoring.prefer_cost_multiplier", scoring.prefer_cost_multiplier);
    if !scoring.degraded_penalty.is_finite() || scoring.degraded_penalty < 1.0 {
        errors.push(ValidationError::new("scoring.degraded_penalty", "must be >= 1"));
    }

    let fluctuation = &config.fluctuation;
    if !(0.0..=1.0).contains(&fluctuation.change_probability) {
        errors.push(ValidationError::new("fluctuation.change_probability", "must be within [0, 1]"));
    }
    if fluctuation.interval_secs == 0 {
        errors.push(ValidationError::new("fluctuation.interval_secs", "must be > 0"));
    }
    if !(0.0..=100.0).contains(&fluctuation.min_load)
        || !(0.0..=100.0).contains(&fluctuation.max_load)
        || fluctuation.min_load > fluctuation.max_load
    {
        errors.push(ValidationError::new(
            "fluctuation.min_load",
            "min_load and max_load must satisfy 0 <= min_load <= max_load <= 100",
        ));
    }

    let mut seen = HashSet::new();
    for (i, backend) in config.backends.iter().enumerate() {
        let field = format!("backends[{}]", i);
        if backend.id.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.id", field), "must not be empty"));
        } else if !seen.insert(backend.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.id", field),
                format!("duplicate backend id '{}'", backend.id),
            ));
        }
        if backend.region.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.region", field), "must not be empty"));
        }
        if !(0.0..=100.0).contains(&backend.current_load) {
            errors.push(ValidationError::new(
                format!("{}.current_load", field),
                format!("must be within [0, 100], got {}", backend.current_load),
            ));
        }
        check_non_negative(&mut errors, &format!("{}.base_latency_ms", field), backend.base_latency_ms);
        check_non_negative(&mut errors, &format!("{}.cost_per_token", field), backend.cost_per_token);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackendConfig;
    use crate::registry::BackendStatus;

    fn backend(id: &str) -> BackendConfig {
        BackendConfig {
            id: id.to_string(),
            chip_type: "GPU".to_string(),
            region: "us-east-1".to_string(),
            status: BackendStatus::Healthy,
            current_load: 10.0,
            base_latency_ms: 50.0,
            cost_per_token: 0.00002,
            supported_models: vec!["gpt-4".to_string()],
            compliance_tags: vec![],
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::default()), Ok(()));
    }

    #[test]
    fn test_duplicate_backend_ids() {
        let mut config = RouterConfig::default();
        config.backends = vec![backend("a"), backend("a")];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "backends[1].id");
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "nope".into();
        config.scoring.latency_weight = -0.5;
        config.fluctuation.change_probability = 1.5;
        let mut bad = backend("a");
        bad.current_load = -3.0;
        config.backends = vec![bad];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"scoring.latency_weight"));
        assert!(fields.contains(&"fluctuation.change_probability"));
        assert!(fields.contains(&"backends[0].current_load"));
    }

    #[test]
    fn test_error_display_and_source() {
        let err = ValidationError::new("timeouts.request_secs", "must be > 0");
        assert_eq!(err.to_string(), "timeouts.request_secs: must be > 0");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
