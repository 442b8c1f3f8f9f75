//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /v1/process`: declarative FFmpeg processing with batch or streamed results
//! - Liveness/readiness probes
//! - Request ID, request logging and Prometheus metrics middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
