//! In-memory object store.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::address::ObjectAddress;
use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// Object store backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<ObjectAddress, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` at `address`, replacing any existing object.
    pub async fn insert(&self, address: &str, data: impl Into<Vec<u8>>) -> StorageResult<()> {
        let address = ObjectAddress::parse_object(address)?;
        self.objects.write().await.insert(address, data.into());
        Ok(())
    }

    /// Contents of the object at `address`, if present.
    pub async fn object(&self, address: &str) -> Option<Vec<u8>> {
        let address = ObjectAddress::parse_object(address).ok()?;
        self.objects.read().await.get(&address).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, address: &str) -> StorageResult<Vec<u8>> {
        let parsed = ObjectAddress::parse_object(address)?;
        self.objects
            .read()
            .await
            .get(&parsed)
            .cloned()
            .ok_or_else(|| StorageError::not_found(parsed.to_string()))
    }

    async fn put(&self, base_address: &str, path: &Path, name: &str) -> StorageResult<String> {
        let target = ObjectAddress::parse(base_address)?.child(name);
        let data = tokio::fs::read(path).await?;
        debug!("Storing {} bytes at {}", data.len(), target);
        self.objects.write().await.insert(target.clone(), data);
        Ok(target.to_string())
    }
}
