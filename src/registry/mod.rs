//! Backend registry subsystem.
//!
//! # Data Flow
//! ```text
//! [[backends]] config
//!     → backend.rs (typed Backend records)
//!     → store.rs (BackendRegistry, published as immutable FleetSnapshot)
//!
//! Routing call:
//!     registry.snapshot() → Arc<FleetSnapshot> (lock-free, never changes)
//!
//! Admin update / fluctuation:
//!     write lock → clone current backends → validate + mutate
//!     → publish next snapshot (generation + 1)
//! ```
//!
//! # Design Decisions
//! - Copy-on-write: readers never block, writers serialize on a mutex
//! - Validation happens before publication; a rejected update changes nothing
//! - Backends are never added or removed after construction
//! - Queue time is derived from load by the latency model, never stored

pub mod backend;
pub mod fluctuation;
pub mod stats;
pub mod store;

use thiserror::Error;

pub use backend::{Backend, BackendStatus};
pub use fluctuation::{FluctuationMonitor, FluctuationReport, FluctuationSimulator, StatusChange};
pub use stats::{FleetStats, RegionStats};
pub use store::{BackendRegistry, BackendUpdate, FleetSnapshot};

/// Errors returned by registry admin operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// No backend with the given id.
    #[error("backend '{0}' not found")]
    NotFound(String),

    /// Rejected input (bad status, out-of-range load, duplicate id).
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
