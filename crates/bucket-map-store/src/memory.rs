//! In-memory object store.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bucket_map_core::{ObjectStore, StoreError, StoreOp};
use bytes::Bytes;

type Buckets = HashMap<String, BTreeMap<String, Bytes>>;

#[derive(Default)]
struct Inner {
    buckets: RwLock<Buckets>,
    denied: RwLock<HashSet<StoreOp>>,
    puts: AtomicUsize,
}

/// In-memory object store.
///
/// Clones share the same buckets, like handles to one remote service.
/// Data is lost when the last handle is dropped.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create a store with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one empty bucket.
    #[must_use]
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.create_bucket(bucket);
        store
    }

    /// Create a bucket if it does not exist yet.
    pub fn create_bucket(&self, bucket: &str) {
        self.inner
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(bucket.to_string())
            .or_default();
    }

    /// Make every subsequent `op` fail with `AccessDenied`.
    pub fn deny(&self, op: StoreOp) {
        self.inner
            .denied
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    /// Lift a previous `deny`.
    pub fn allow(&self, op: StoreOp) {
        self.inner
            .denied
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    /// Raw body of an object, bypassing access checks.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.inner
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)?
            .get(key)
            .cloned()
    }

    /// Store a raw body, bypassing access checks. Creates the bucket if needed.
    pub fn insert_object(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.inner
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    /// Number of successful `put_object` calls across all handles.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.inner.puts.load(Ordering::SeqCst)
    }

    fn check(&self, op: StoreOp, target: &str) -> Result<(), StoreError> {
        let denied = self
            .inner
            .denied
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        if denied.contains(&op) {
            return Err(StoreError::AccessDenied {
                op,
                target: target.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        self.check(StoreOp::List, bucket)?;
        let buckets = self
            .inner
            .buckets
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        Ok(objects.keys().cloned().collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.check(StoreOp::Get, &format!("{bucket}/{key}"))?;
        let buckets = self
            .inner
            .buckets
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.check(StoreOp::Put, &format!("{bucket}/{key}"))?;
        let mut buckets = self
            .inner
            .buckets
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?
            .insert(key.to_string(), body);

        self.inner.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.check(StoreOp::Delete, &format!("{bucket}/{key}"))?;
        let mut buckets = self
            .inner
            .buckets
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}
