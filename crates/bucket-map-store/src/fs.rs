//! Local directory object store.

use std::{
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use bucket_map_core::{ObjectStore, StoreError, StoreOp};
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

/// Suffix of in-flight writes; such files are never listed.
const TEMP_SUFFIX: &str = ".bucket-map-tmp";

/// Object store over a local directory.
///
/// Layout is `root/<bucket>/<key>`. Buckets are plain directories and must
/// exist before use. Keys may contain `/` to nest objects.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory backing `bucket`.
    ///
    /// # Errors
    /// Returns error if the bucket name is not a single path segment or
    /// the directory cannot be created.
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir).await?;
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        let mut parts = Path::new(bucket).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket)),
            _ => Err(StoreError::InvalidKey(bucket.to_string())),
        }
    }

    async fn existing_bucket_dir(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        let dir = self.bucket_dir(bucket)?;
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(StoreError::NoSuchBucket(bucket.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NoSuchBucket(bucket.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let dir = self.existing_bucket_dir(bucket).await?;
        let valid = !key.is_empty()
            && !key.ends_with(TEMP_SUFFIX)
            && key.split('/').all(|segment| {
                !segment.is_empty()
                    && matches!(
                        Path::new(segment).components().next(),
                        Some(Component::Normal(_))
                    )
                    && Path::new(segment).components().count() == 1
            });
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(dir.join(key))
    }
}

fn not_found(bucket: &str, key: &str) -> StoreError {
    StoreError::NoSuchKey {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}

/// Permission failures surface as `AccessDenied` for every object operation.
fn object_error(op: StoreOp, bucket: &str, key: &str, e: io::Error) -> StoreError {
    if e.kind() == ErrorKind::PermissionDenied {
        StoreError::AccessDenied {
            op,
            target: format!("{bucket}/{key}"),
        }
    } else {
        e.into()
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let root = self.existing_bucket_dir(bucket).await?;
        let mut keys = Vec::new();
        let mut pending = vec![(root, String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };

                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if !name.ends_with(TEMP_SUFFIX) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(bucket, key).await?;
        match fs::read(&path).await {
            Ok(body) => Ok(Bytes::from(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(bucket, key)),
            Err(e) => Err(object_error(StoreOp::Get, bucket, key, e)),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| object_error(StoreOp::Put, bucket, key, e))?;
        }

        let mut temp = path.clone().into_os_string();
        temp.push(format!(".{}{TEMP_SUFFIX}", Uuid::new_v4().simple()));
        let temp = PathBuf::from(temp);

        fs::write(&temp, &body)
            .await
            .map_err(|e| object_error(StoreOp::Put, bucket, key, e))?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(object_error(StoreOp::Put, bucket, key, e));
        }

        tracing::trace!(bucket, key, bytes = body.len(), "object written");
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(bucket, key)),
            Err(e) => Err(object_error(StoreOp::Delete, bucket, key, e)),
        }
    }
}
