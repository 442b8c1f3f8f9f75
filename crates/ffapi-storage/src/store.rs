//! Object store capability used by the job pipeline.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ffapi_models::S3Config;

use crate::client::S3Client;
use crate::error::StorageResult;

/// Get/put access to byte blobs addressed as `s3://bucket/key`.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `address`.
    async fn get(&self, address: &str) -> StorageResult<Vec<u8>>;

    /// Upload the file at `path` as `<base_address>/<name>` and return the
    /// canonical address of the stored object.
    async fn put(&self, base_address: &str, path: &Path, name: &str) -> StorageResult<String>;
}

/// Builds an [`ObjectStore`] from a request's storage configuration.
pub trait StoreFactory: Send + Sync {
    fn connect(&self, config: &S3Config) -> Arc<dyn ObjectStore>;
}

/// Factory producing aws-sdk-s3 backed clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3StoreFactory;

impl StoreFactory for S3StoreFactory {
    fn connect(&self, config: &S3Config) -> Arc<dyn ObjectStore> {
        Arc::new(S3Client::new(config))
    }
}
