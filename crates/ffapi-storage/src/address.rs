//! Object addresses in `s3://bucket/key` form.

use std::fmt;

use crate::error::{StorageError, StorageResult};

const SCHEME: &str = "s3://";

/// A parsed object address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectAddress {
    bucket: String,
    key: String,
}

impl ObjectAddress {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an address. The `s3://` prefix is optional; the bucket is
    /// everything up to the first `/`, the key is the rest (possibly empty).
    pub fn parse(address: &str) -> StorageResult<Self> {
        let trimmed = address.strip_prefix(SCHEME).unwrap_or(address);
        let (bucket, key) = trimmed.split_once('/').unwrap_or((trimmed, ""));

        if bucket.is_empty() {
            return Err(StorageError::invalid_address(address));
        }

        Ok(Self::new(bucket, key))
    }

    /// Parse an address that must name an object (non-empty key).
    pub fn parse_object(address: &str) -> StorageResult<Self> {
        let parsed = Self::parse(address)?;
        if parsed.key.is_empty() {
            return Err(StorageError::invalid_address(address));
        }
        Ok(parsed)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Address of `name` under this address treated as a prefix.
    pub fn child(&self, name: &str) -> Self {
        let prefix = self.key.trim_end_matches('/');
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };
        Self::new(self.bucket.clone(), key)
    }
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let addr = ObjectAddress::parse("s3://media/raw/in.mp4").unwrap();
        assert_eq!(addr.bucket(), "media");
        assert_eq!(addr.key(), "raw/in.mp4");
        assert_eq!(addr.to_string(), "s3://media/raw/in.mp4");

        let bare = ObjectAddress::parse("media/in.mp4").unwrap();
        assert_eq!(bare, ObjectAddress::new("media", "in.mp4"));
    }

    #[test]
    fn test_parse_rejects_missing_bucket() {
        assert!(ObjectAddress::parse("s3://").is_err());
        assert!(ObjectAddress::parse("s3:///key").is_err());
        assert!(ObjectAddress::parse_object("s3://bucket").is_err());
        assert!(ObjectAddress::parse_object("s3://bucket/").is_err());
    }

    #[test]
    fn test_child_trims_prefix() {
        let base = ObjectAddress::parse("s3://media/out/").unwrap();
        assert_eq!(base.child("a.mp4").to_string(), "s3://media/out/a.mp4");

        let base = ObjectAddress::parse("s3://media/out").unwrap();
        assert_eq!(base.child("a.mp4").to_string(), "s3://media/out/a.mp4");

        let base = ObjectAddress::parse("s3://media").unwrap();
        assert_eq!(base.child("a.mp4").to_string(), "s3://media/a.mp4");
    }
}
