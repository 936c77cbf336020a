//! Core abstractions for JSON maps persisted in object storage.
//!
//! This crate provides the fundamental building blocks:
//! - `ObjectStore` - The list/get/put/delete collaborator a map persists through
//! - `Credentials` and `MapOptions` - Construction parameters for a map
//! - `MapConfig` - Loading those parameters from a file or the environment
//! - `MapEvent` and `MapObserver` - Injectable observability hook
//! - `RecordingObserver` - Observer that keeps a bounded event history

pub mod config;
pub mod event;
pub mod options;
pub mod recorder;
pub mod traits;

pub use config::{ConfigError, MapConfig};
pub use event::{MapEvent, MapObserver, NoopObserver};
pub use options::{Credentials, JsonMap, MapOptions};
pub use recorder::RecordingObserver;
pub use traits::{ObjectStore, StoreError, StoreOp};
