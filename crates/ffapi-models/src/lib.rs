//! Shared data models for the ffapi processing service.
//!
//! This crate provides Serde-serializable types for:
//! - Process requests (inputs, command steps, output options)
//! - Object storage connection settings
//! - Per-file results and the batch response envelope
//! - Job identifiers used for log correlation

pub mod job;
pub mod request;
pub mod result;
pub mod storage;

pub use job::JobId;
pub use request::{CommandStep, Input, InputSource, OutputSpec, ProcessRequest};
pub use result::{JobResult, ProcessResponse};
pub use storage::S3Config;
