//! Remote map errors.

use bucket_map_core::{ConfigError, StoreError};
use thiserror::Error;

/// Underlying cause of a failed remote step.
#[derive(Debug, Error)]
pub enum RemoteCause {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document is not a JSON object")]
    NotAnObject,
}

/// Remote map error.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Failed to load {file_name}: {source}")]
    RemoteLoad {
        file_name: String,
        #[source]
        source: RemoteCause,
    },
    #[error("Failed to create {file_name}: {source}")]
    RemoteCreate {
        file_name: String,
        #[source]
        source: RemoteCause,
    },
    #[error("Failed to save {file_name}: {source}")]
    RemoteSave {
        file_name: String,
        #[source]
        source: RemoteCause,
    },
    #[error("Failed to delete {file_name}: {source}")]
    RemoteDelete {
        file_name: String,
        #[source]
        source: StoreError,
    },
    #[error("Key not found: {0}")]
    KeyNotFound(String),
    #[error("Map is empty")]
    EmptyMap,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ConfigError> for MapError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue { .. } => Self::InvalidArgument(err.to_string()),
            _ => Self::Configuration(err.to_string()),
        }
    }
}
