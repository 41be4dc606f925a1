//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RouteRequest (wire)
//!     → request.rs (defaults, validation → InferenceRequest)
//!     → engine.rs (pin registry snapshot + settings)
//!     → filter.rs (compatible / filtered-with-reason)
//!     → scorer.rs (latency model, score, rank)
//!     → engine.rs (select, optional fallback)
//!     → result.rs (RoutingResult)
//! ```
//!
//! # Design Decisions
//! - "No backend" and "fallback exhausted" are data in the result, never errors
//! - Every backend in the snapshot is either considered or filtered, never both
//! - Ranking is total: score, then cost, then id

pub mod engine;
pub mod filter;
pub mod recommend;
pub mod request;
pub mod result;
pub mod scorer;
pub mod summary;

pub use engine::{decide, BatchRouting, EngineSettings, RoutingEngine};
pub use filter::{BackendFilter, FilterOutcome, FilterReason, FilteredBackend};
pub use recommend::{Recommendation, RecommendationQuery};
pub use request::{InferenceRequest, RequestError, RouteRequest};
pub use result::{FallbackInfo, RoutingDecision, RoutingResult};
pub use scorer::{BackendScorer, ConsideredBackend, ScoredCandidate};
pub use summary::RoutingSummary;
