//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, limits, timeout)
//!     → handlers.rs (decode JSON, validate)
//!     → routing engine / registry
//!     → JSON response (error.rs maps failures to status codes)
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
