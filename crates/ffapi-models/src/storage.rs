//! Object storage connection settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-request S3-compatible storage configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct S3Config {
    /// Endpoint host (with or without scheme)
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Use TLS when the endpoint has no scheme (default: true)
    pub use_ssl: Option<bool>,
    /// Path-style bucket addressing (default: true)
    pub path_style: Option<bool>,
}

impl S3Config {
    pub fn use_ssl(&self) -> bool {
        self.use_ssl.unwrap_or(true)
    }

    pub fn path_style(&self) -> bool {
        self.path_style.unwrap_or(true)
    }

    /// Endpoint URL with a scheme derived from [`S3Config::use_ssl`] when
    /// the configured endpoint has none.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            return self.endpoint.clone();
        }
        let scheme = if self.use_ssl() { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("use_ssl", &self.use_ssl())
            .field("path_style", &self.path_style())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_scheme() {
        let mut config = S3Config {
            endpoint: "minio:9000".into(),
            ..S3Config::default()
        };
        assert_eq!(config.endpoint_url(), "https://minio:9000");

        config.use_ssl = Some(false);
        assert_eq!(config.endpoint_url(), "http://minio:9000");

        config.endpoint = "https://s3.example.com".into();
        assert_eq!(config.endpoint_url(), "https://s3.example.com");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = S3Config {
            secret_key: "hunter2".into(),
            ..S3Config::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
