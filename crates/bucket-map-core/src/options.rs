//! Construction parameters for a remote map.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::MapObserver;

/// In-memory content of a map: string keys to JSON values, in insertion order.
pub type JsonMap = serde_json::Map<String, Value>;

/// Access credentials for the object store.
///
/// The secret is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

impl Credentials {
    /// Create credentials from an access key pair.
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Options for opening a remote map.
#[derive(Clone)]
pub struct MapOptions {
    /// Bucket holding the backing object.
    pub bucket_name: String,
    /// Store credentials.
    pub credentials: Credentials,
    /// Object key of the backing JSON document.
    pub file_name: String,
    /// Persist after every mutation.
    pub autosave: bool,
    /// Content that replaces whatever was loaded.
    pub data: Option<JsonMap>,
    /// Seed content, used only when the backing object does not exist yet.
    pub default: Option<JsonMap>,
    /// Observability hook.
    pub observer: Option<Arc<dyn MapObserver>>,
}

impl MapOptions {
    /// Create options with the required parameters.
    #[must_use]
    pub fn new(
        bucket_name: impl Into<String>,
        credentials: Credentials,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            credentials,
            file_name: file_name.into(),
            autosave: false,
            data: None,
            default: None,
            observer: None,
        }
    }

    /// Set the autosave policy.
    #[must_use]
    pub fn autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Set the initial content.
    #[must_use]
    pub fn data(mut self, data: JsonMap) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the seed content for a missing object.
    #[must_use]
    pub fn default_data(mut self, default: JsonMap) -> Self {
        self.default = Some(default);
        self
    }

    /// Attach an observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn MapObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Name of the first required parameter that is empty, if any.
    #[must_use]
    pub fn missing_parameter(&self) -> Option<&'static str> {
        if self.bucket_name.trim().is_empty() {
            Some("bucket_name")
        } else if self.credentials.access_key_id.trim().is_empty() {
            Some("access_key_id")
        } else if self.credentials.secret_access_key.trim().is_empty() {
            Some("access_secret_key")
        } else if self.file_name.trim().is_empty() {
            Some("file_name")
        } else {
            None
        }
    }
}

impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("bucket_name", &self.bucket_name)
            .field("credentials", &self.credentials)
            .field("file_name", &self.file_name)
            .field("autosave", &self.autosave)
            .field("data", &self.data)
            .field("default", &self.default)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
