//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use ffapi_models::S3Config;
use tracing::{debug, info};

use crate::address::ObjectAddress;
use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// S3-compatible storage client.
///
/// Cheap to clone; the underlying SDK client is shared.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a client with static credentials from `config`.
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "ffapi",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.path_style());

        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(config.endpoint_url());
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Download an object as bytes.
    pub async fn download_bytes(&self, address: &ObjectAddress) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", address);

        let response = self
            .client
            .get_object()
            .bucket(address.bucket())
            .key(address.key())
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey")
                    || e.as_service_error().map(|s| s.is_no_such_key()) == Some(true)
                {
                    StorageError::not_found(address.to_string())
                } else {
                    StorageError::download_failed(DisplayErrorContext(&e).to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Upload a local file to `address`.
    pub async fn upload_file(&self, path: &Path, address: &ObjectAddress) -> StorageResult<()> {
        debug!("Uploading {} to {}", path.display(), address);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(address.bucket())
            .key(address.key())
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        info!("Uploaded {} to {}", path.display(), address);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn get(&self, address: &str) -> StorageResult<Vec<u8>> {
        let address = ObjectAddress::parse_object(address)?;
        self.download_bytes(&address).await
    }

    async fn put(&self, base_address: &str, path: &Path, name: &str) -> StorageResult<String> {
        let target = ObjectAddress::parse(base_address)?.child(name);
        self.upload_file(path, &target).await?;
        Ok(target.to_string())
    }
}
