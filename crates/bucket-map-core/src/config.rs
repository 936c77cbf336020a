//! Loading map parameters from a config file or the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{Credentials, MapOptions};

/// Environment variable holding the bucket name.
pub const ENV_BUCKET: &str = "BUCKET_MAP_BUCKET";
/// Environment variable holding the access key id.
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding the object key.
pub const ENV_FILE: &str = "BUCKET_MAP_FILE";
/// Environment variable holding the autosave flag.
pub const ENV_AUTOSAVE: &str = "BUCKET_MAP_AUTOSAVE";

/// Config error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Map parameters as they appear in a config file.
///
/// Unset fields stay `None` so that merging with `or` can tell "absent"
/// from an explicit value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct MapConfig {
    pub bucket_name: Option<String>,
    pub access_key_id: Option<String>,
    pub access_secret_key: Option<String>,
    pub file_name: Option<String>,
    pub autosave: Option<bool>,
}

/// File form before `autosave` is validated; it may be a bool or a string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    bucket_name: Option<String>,
    access_key_id: Option<String>,
    access_secret_key: Option<String>,
    file_name: Option<String>,
    autosave: Option<Value>,
}

impl TryFrom<RawConfig> for MapConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let autosave = match raw.autosave {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(flag),
            Some(Value::String(text)) => Some(parse_bool(&text).ok_or(
                ConfigError::InvalidValue {
                    name: "autosave",
                    value: text,
                },
            )?),
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "autosave",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            bucket_name: raw.bucket_name,
            access_key_id: raw.access_key_id,
            access_secret_key: raw.access_secret_key,
            file_name: raw.file_name,
            autosave,
        })
    }
}

impl MapConfig {
    /// Default config location: `<config dir>/bucket-map/config.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bucket-map").join("config.json"))
    }

    /// Read a JSON config file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, and
    /// `InvalidValue` if `autosave` is not a boolean.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::try_from(raw)?;
        tracing::debug!(path = %path.display(), "loaded map config");
        Ok(config)
    }

    /// Read parameters from the process environment.
    ///
    /// # Errors
    /// Returns error if the autosave variable is not a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read parameters through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if the autosave variable is not a boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let autosave = match lookup(ENV_AUTOSAVE) {
            Some(raw) => Some(parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                name: ENV_AUTOSAVE,
                value: raw,
            })?),
            None => None,
        };

        Ok(Self {
            bucket_name: lookup(ENV_BUCKET),
            access_key_id: lookup(ENV_ACCESS_KEY_ID),
            access_secret_key: lookup(ENV_SECRET_ACCESS_KEY),
            file_name: lookup(ENV_FILE),
            autosave,
        })
    }

    /// Fill unset fields from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            bucket_name: self.bucket_name.or(other.bucket_name),
            access_key_id: self.access_key_id.or(other.access_key_id),
            access_secret_key: self.access_secret_key.or(other.access_secret_key),
            file_name: self.file_name.or(other.file_name),
            autosave: self.autosave.or(other.autosave),
        }
    }

    /// Convert into map options.
    ///
    /// # Errors
    /// Returns error if a required parameter is absent or blank.
    pub fn into_options(self) -> Result<MapOptions, ConfigError> {
        let bucket_name = required(self.bucket_name, "bucket_name")?;
        let access_key_id = required(self.access_key_id, "access_key_id")?;
        let access_secret_key = required(self.access_secret_key, "access_secret_key")?;
        let file_name = required(self.file_name, "file_name")?;

        Ok(MapOptions::new(
            bucket_name,
            Credentials::new(access_key_id, access_secret_key),
            file_name,
        )
        .autosave(self.autosave.unwrap_or(false)))
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
