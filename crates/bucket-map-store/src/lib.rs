//! Object store backends for bucket-map.
//!
//! Provides:
//! - `MemoryStore` - Shared in-process buckets, for tests and development
//! - `FsStore` - Buckets as directories on the local filesystem

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "fs")]
pub mod fs;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;

#[cfg(feature = "fs")]
pub use fs::FsStore;
