//! Latency modelling subsystem.
//!
//! # Data Flow
//! ```text
//! [latency] config (default_ms, saturation_ms, reference_tokens, pairs)
//!     → table.rs (region-pair lookup)
//!     → model.rs (network + queue + processing, cost)
//!     → consumed by routing::scorer and routing::engine
//! ```
//!
//! # Design Decisions
//! - Network latency is a looked-up value, never measured
//! - The model is immutable; admin edits produce a new model that is
//!   swapped in whole, so a decision always sees one consistent table

pub mod model;
pub mod table;

pub use model::{LatencyBreakdown, LatencyModel};
pub use table::NetworkLatencyTable;
