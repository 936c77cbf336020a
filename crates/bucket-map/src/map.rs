//! JSON map mirrored to a single remote object.

use std::{fmt, sync::Arc, time::Instant};

use bucket_map_core::{Credentials, JsonMap, MapEvent, MapObserver, MapOptions, ObjectStore};
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{MapError, RemoteCause};

/// Dictionary-like map whose authoritative content is one JSON object in a
/// bucket.
///
/// Reads are served from the in-memory mirror. Mutations update the mirror
/// and then call `save(false)`, which only writes when autosave is on.
/// Every write replaces the whole remote document.
pub struct RemoteMap<S: ObjectStore> {
    store: S,
    bucket_name: String,
    credentials: Credentials,
    file_name: String,
    autosave: bool,
    default: Option<JsonMap>,
    data: JsonMap,
    observer: Option<Arc<dyn MapObserver>>,
}

impl<S: ObjectStore> RemoteMap<S> {
    /// Open a map, loading or creating its backing object.
    ///
    /// Initial `data` in the options replaces whatever was loaded. The map
    /// is always written once before this returns, whatever the autosave
    /// setting.
    ///
    /// # Errors
    /// Returns `Configuration` if a required parameter is empty, and
    /// `RemoteLoad`, `RemoteCreate` or `RemoteSave` if a remote step fails.
    pub async fn open(store: S, options: MapOptions) -> Result<Self, MapError> {
        if let Some(name) = options.missing_parameter() {
            return Err(MapError::Configuration(format!("{name} must be specified")));
        }

        let MapOptions {
            bucket_name,
            credentials,
            file_name,
            autosave,
            data,
            default,
            observer,
        } = options;

        tracing::debug!(
            bucket = %bucket_name,
            file = %file_name,
            access_key_id = %credentials.access_key_id,
            autosave,
            "opening remote map"
        );

        let mut map = Self {
            store,
            bucket_name,
            credentials,
            file_name,
            autosave,
            default,
            data: JsonMap::new(),
            observer,
        };

        map.load().await?;
        if let Some(data) = data {
            map.data = data;
        }
        map.save(true).await?;

        Ok(map)
    }

    /// Load the backing object, creating it from the default seed if absent.
    ///
    /// # Errors
    /// Returns `RemoteLoad` if listing, fetching or decoding fails, and
    /// `RemoteCreate` if the missing object cannot be written.
    pub async fn load(&mut self) -> Result<(), MapError> {
        let keys = self
            .store
            .list_keys(&self.bucket_name)
            .await
            .map_err(|e| self.load_error(e.into()))?;

        let data = if keys.iter().any(|k| *k == self.file_name) {
            self.fetch().await?
        } else {
            tracing::debug!(
                bucket = %self.bucket_name,
                file = %self.file_name,
                "object not in bucket, creating it"
            );
            let seed = self.default.clone().unwrap_or_default();
            self.put(&seed).await.map_err(|source| {
                tracing::warn!(
                    bucket = %self.bucket_name,
                    file = %self.file_name,
                    error = %source,
                    "failed to create object"
                );
                MapError::RemoteCreate {
                    file_name: self.file_name.clone(),
                    source,
                }
            })?;
            tracing::info!(
                bucket = %self.bucket_name,
                file = %self.file_name,
                "created remote object"
            );
            self.emit(MapEvent::Created {
                file_name: self.file_name.clone(),
            });
            seed
        };

        self.data = data;
        Ok(())
    }

    /// Re-fetch the backing object without creating it.
    ///
    /// # Errors
    /// Returns `RemoteLoad` if the object is missing or unreadable.
    pub async fn reload(&mut self) -> Result<(), MapError> {
        self.data = self.fetch().await?;
        Ok(())
    }

    /// Write the map to the backing object.
    ///
    /// Does nothing unless `force` is set or autosave is on.
    ///
    /// # Errors
    /// Returns `RemoteSave` if serialization or the write fails.
    pub async fn save(&self, force: bool) -> Result<(), MapError> {
        if !force && !self.autosave {
            tracing::trace!(
                bucket = %self.bucket_name,
                file = %self.file_name,
                "save skipped, autosave off"
            );
            self.emit(MapEvent::SaveSkipped {
                file_name: self.file_name.clone(),
            });
            return Ok(());
        }

        let start = Instant::now();
        let bytes = self.put(&self.data).await.map_err(|source| {
            tracing::warn!(
                bucket = %self.bucket_name,
                file = %self.file_name,
                error = %source,
                "failed to save map"
            );
            MapError::RemoteSave {
                file_name: self.file_name.clone(),
                source,
            }
        })?;
        let elapsed = start.elapsed();

        tracing::debug!(
            bucket = %self.bucket_name,
            file = %self.file_name,
            bytes,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "saved map"
        );
        self.emit(MapEvent::Saved {
            file_name: self.file_name.clone(),
            bytes,
            elapsed,
        });
        Ok(())
    }

    /// Get the value stored under `key`.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the key is absent.
    pub fn get(&self, key: &str) -> Result<&Value, MapError> {
        self.data
            .get(key)
            .ok_or_else(|| MapError::KeyNotFound(key.to_string()))
    }

    /// Get the value under `key` decoded into `T`.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the key is absent and `InvalidArgument` if
    /// the value does not decode as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, MapError> {
        serde_json::from_value(self.get(key)?.clone())
            .map_err(|e| MapError::InvalidArgument(format!("{key}: {e}")))
    }

    /// Insert or overwrite a value.
    ///
    /// # Errors
    /// Returns `RemoteSave` if autosave is on and the write fails.
    pub async fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), MapError> {
        let key = key.into();
        tracing::debug!(bucket = %self.bucket_name, file = %self.file_name, key = %key, "set");
        self.data.insert(key, value.into());
        self.save(false).await
    }

    /// Insert or overwrite a value of any serializable type.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the value cannot be represented as JSON
    /// and `RemoteSave` if autosave is on and the write fails.
    pub async fn set_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), MapError> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| MapError::InvalidArgument(format!("{key}: {e}")))?;
        self.set(key, value).await
    }

    /// Remove `key` and return its value.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the key is absent and `RemoteSave` if
    /// autosave is on and the write fails.
    pub async fn remove(&mut self, key: &str) -> Result<Value, MapError> {
        tracing::debug!(bucket = %self.bucket_name, file = %self.file_name, key, "remove");
        let value = self
            .data
            .shift_remove(key)
            .ok_or_else(|| MapError::KeyNotFound(key.to_string()))?;
        self.save(false).await?;
        Ok(value)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> serde_json::map::Keys<'_> {
        self.data.keys()
    }

    /// Values in insertion order.
    pub fn values(&self) -> serde_json::map::Values<'_> {
        self.data.values()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.data.iter()
    }

    /// Owned copy of the current content.
    #[must_use]
    pub fn snapshot(&self) -> JsonMap {
        self.data.clone()
    }

    /// Remove every entry.
    ///
    /// # Errors
    /// Returns `RemoteSave` if autosave is on and the write fails.
    pub async fn clear(&mut self) -> Result<(), MapError> {
        tracing::debug!(
            bucket = %self.bucket_name,
            file = %self.file_name,
            entries = self.data.len(),
            "clear"
        );
        self.data.clear();
        self.save(false).await
    }

    /// Merge entries from `other`; later keys overwrite. Saves once.
    ///
    /// # Errors
    /// Returns `RemoteSave` if autosave is on and the write fails.
    pub async fn update<I, K, V>(&mut self, other: I) -> Result<(), MapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.data
            .extend(other.into_iter().map(|(k, v)| (k.into(), v.into())));
        tracing::debug!(
            bucket = %self.bucket_name,
            file = %self.file_name,
            entries = self.data.len(),
            "update"
        );
        self.save(false).await
    }

    /// Remove `key` and return its value, or return `default` if absent.
    ///
    /// Nothing is saved when the key was absent.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the key is absent and no default was given,
    /// and `RemoteSave` if autosave is on and the write fails.
    pub async fn pop(&mut self, key: &str, default: Option<Value>) -> Result<Value, MapError> {
        match self.data.shift_remove(key) {
            Some(value) => {
                tracing::debug!(bucket = %self.bucket_name, file = %self.file_name, key, "pop");
                self.save(false).await?;
                Ok(value)
            }
            None => default.ok_or_else(|| MapError::KeyNotFound(key.to_string())),
        }
    }

    /// Remove and return the most recently inserted entry.
    ///
    /// # Errors
    /// Returns `EmptyMap` if there are no entries and `RemoteSave` if
    /// autosave is on and the write fails.
    pub async fn pop_item(&mut self) -> Result<(String, Value), MapError> {
        let key = self.data.keys().next_back().cloned().ok_or(MapError::EmptyMap)?;
        let value = self.data.shift_remove(&key).ok_or(MapError::EmptyMap)?;
        tracing::debug!(bucket = %self.bucket_name, file = %self.file_name, key = %key, "pop_item");
        self.save(false).await?;
        Ok((key, value))
    }

    /// Return the value under `key`, inserting `default` (or `null`) first
    /// if absent. Saves only when an insertion happened.
    ///
    /// # Errors
    /// Returns `RemoteSave` if an insertion happened, autosave is on and
    /// the write fails.
    pub async fn set_default(
        &mut self,
        key: impl Into<String>,
        default: Option<Value>,
    ) -> Result<Value, MapError> {
        let key = key.into();
        if let Some(value) = self.data.get(&key) {
            return Ok(value.clone());
        }

        let value = default.unwrap_or(Value::Null);
        tracing::debug!(
            bucket = %self.bucket_name,
            file = %self.file_name,
            key = %key,
            "set_default inserted"
        );
        self.data.insert(key, value.clone());
        self.save(false).await?;
        Ok(value)
    }

    /// Remove the backing object and empty the local mirror.
    ///
    /// # Errors
    /// Returns `RemoteDelete` if the store refuses or fails the delete.
    pub async fn delete_remote(&mut self) -> Result<(), MapError> {
        self.store
            .delete_object(&self.bucket_name, &self.file_name)
            .await
            .map_err(|source| {
                tracing::warn!(
                    bucket = %self.bucket_name,
                    file = %self.file_name,
                    error = %source,
                    "failed to delete object"
                );
                MapError::RemoteDelete {
                    file_name: self.file_name.clone(),
                    source,
                }
            })?;

        tracing::info!(bucket = %self.bucket_name, file = %self.file_name, "deleted remote object");
        self.data.clear();
        self.emit(MapEvent::RemoteDeleted {
            file_name: self.file_name.clone(),
        });
        Ok(())
    }

    /// Object key of the backing document.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Bucket holding the backing document.
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Access key identifier.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.credentials.access_key_id
    }

    /// Store credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether every mutation is persisted immediately.
    #[must_use]
    pub const fn autosave(&self) -> bool {
        self.autosave
    }

    /// Change the autosave policy.
    ///
    /// Turning autosave on immediately writes the current content.
    ///
    /// # Errors
    /// Returns `RemoteSave` if that write fails. The flag stays changed.
    pub async fn set_autosave(&mut self, autosave: bool) -> Result<(), MapError> {
        self.autosave = autosave;
        if autosave {
            self.save(true).await?;
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<JsonMap, MapError> {
        let body = self
            .store
            .get_object(&self.bucket_name, &self.file_name)
            .await
            .map_err(|e| self.load_error(e.into()))?;
        let data = decode(&body).map_err(|e| self.load_error(e))?;

        tracing::debug!(
            bucket = %self.bucket_name,
            file = %self.file_name,
            entries = data.len(),
            "loaded map"
        );
        self.emit(MapEvent::Loaded {
            file_name: self.file_name.clone(),
            entries: data.len(),
        });
        Ok(data)
    }

    async fn put(&self, data: &JsonMap) -> Result<usize, RemoteCause> {
        let body = serde_json::to_vec(data)?;
        let bytes = body.len();
        self.store
            .put_object(&self.bucket_name, &self.file_name, Bytes::from(body))
            .await
            .map_err(RemoteCause::from)?;
        Ok(bytes)
    }

    fn load_error(&self, source: RemoteCause) -> MapError {
        tracing::warn!(
            bucket = %self.bucket_name,
            file = %self.file_name,
            error = %source,
            "failed to load map"
        );
        MapError::RemoteLoad {
            file_name: self.file_name.clone(),
            source,
        }
    }

    fn emit(&self, event: MapEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

impl<S: ObjectStore + Clone> RemoteMap<S> {
    /// Open a new map on the same bucket, key and settings, with one entry
    /// per key all holding `value` (or `null`).
    ///
    /// This overwrites the shared backing object with the new content.
    ///
    /// # Errors
    /// Same as [`RemoteMap::open`].
    pub async fn from_keys<I, K>(&self, keys: I, value: Option<Value>) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let value = value.unwrap_or(Value::Null);
        let data: JsonMap = keys
            .into_iter()
            .map(|k| (k.into(), value.clone()))
            .collect();

        let mut options = MapOptions::new(
            self.bucket_name.clone(),
            self.credentials.clone(),
            self.file_name.clone(),
        )
        .autosave(self.autosave)
        .data(data);
        options.default.clone_from(&self.default);
        options.observer.clone_from(&self.observer);

        Self::open(self.store.clone(), options).await
    }
}

impl<'a, S: ObjectStore> IntoIterator for &'a RemoteMap<S> {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<S: ObjectStore> fmt::Debug for RemoteMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMap")
            .field("bucket_name", &self.bucket_name)
            .field("file_name", &self.file_name)
            .field("credentials", &self.credentials)
            .field("autosave", &self.autosave)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

fn decode(body: &[u8]) -> Result<JsonMap, RemoteCause> {
    match serde_json::from_slice(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(RemoteCause::NotAnObject),
    }
}
