//! S3-compatible object storage gateway.
//!
//! This crate provides:
//! - `s3://bucket/key` address parsing
//! - The [`ObjectStore`] get/put capability used by the job pipeline
//! - An aws-sdk-s3 backed client built from a per-request [`S3Config`](ffapi_models::S3Config)
//! - An in-memory store for tests and local runs

pub mod address;
pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use address::ObjectAddress;
pub use client::S3Client;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryObjectStore;
pub use store::{ObjectStore, S3StoreFactory, StoreFactory};
