//! Inference Router Library
//!
//! Routes AI-inference requests to the best backend in a heterogeneous,
//! geographically distributed accelerator fleet, balancing latency SLA, cost,
//! compliance and backend health.

// Core subsystems
pub mod latency;
pub mod registry;
pub mod routing;

// Service shell
pub mod admin;
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

#[cfg(test)]
mod test_utils;

pub use config::schema::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::BackendRegistry;
pub use routing::RoutingEngine;
