//! Dictionary-like JSON map persisted as a single object-store object.
//!
//! A `RemoteMap` keeps its content in memory and mirrors it to one JSON
//! document in a bucket. Opening a map loads the document, or creates it
//! when the key is absent. With autosave on, every mutation rewrites the
//! whole document; otherwise call `save(true)` when ready.
//!
//! ```rust
//! use bucket_map::{Credentials, MapOptions, RemoteMap};
//! use bucket_map_store::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bucket_map::MapError> {
//! let store = MemoryStore::with_bucket("state");
//! let options = MapOptions::new("state", Credentials::new("id", "secret"), "bot.json");
//!
//! let mut map = RemoteMap::open(store, options).await?;
//! map.set("last_seen", 42).await?;
//! map.save(true).await?;
//! assert_eq!(map.get("last_seen")?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! Concurrent writers to the same object are not coordinated: the last
//! save to complete wins.

pub mod error;
pub mod map;

pub use bucket_map_core::{
    Credentials, JsonMap, MapConfig, MapEvent, MapObserver, MapOptions, NoopObserver,
    ObjectStore, RecordingObserver, StoreError, StoreOp,
};
pub use error::{MapError, RemoteCause};
pub use map::RemoteMap;
