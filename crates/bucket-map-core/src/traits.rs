//! Core trait for the remote object store.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Object store operation, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Enumerate the keys of a bucket.
    List,
    /// Fetch an object body.
    Get,
    /// Create or overwrite an object.
    Put,
    /// Remove an object.
    Delete,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Bucket not found: {0}")]
    NoSuchBucket(String),
    #[error("Object not found: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },
    #[error("Access denied for {op} on {target}")]
    AccessDenied { op: StoreOp, target: String },
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether this error reports a missing object.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchKey { .. })
    }
}

/// Trait for object storage backends.
///
/// Implementations are client handles: credentials and transport are
/// settled when the handle is built, and every call is a single round trip.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object key visible in the bucket.
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError>;

    /// Fetch the body of an object. Fails with `NoSuchKey` if absent.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Create or overwrite an object.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError>;

    /// Remove an object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}
