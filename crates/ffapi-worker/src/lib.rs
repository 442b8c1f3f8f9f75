//! Per-request job pipeline.
//!
//! This crate provides:
//! - Concurrent input materialization (object storage, HTTP, inline base64)
//! - Sequential FFmpeg step execution inside the job workspace
//! - Result collection (upload / inline) and streaming file selection
//! - Structured job logging

pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod materializer;

pub use collector::{collect_results, first_output, list_outputs, OutputFile};
pub use config::WorkerConfig;
pub use error::{InputError, WorkerError, WorkerResult};
pub use executor::{JobExecutor, JobOutput};
pub use logging::JobLogger;
pub use materializer::materialize_inputs;
