//! Versioned response cache.
//!
//! This module provides the `CacheStorage` seam and two backends:
//! - `MemoryCacheStorage`: process-local, lost when the host recycles
//! - `DiskCacheStorage`: one JSON file per store, survives restarts
//!
//! Store names embed the router version as `<prefix>-<version>`; see
//! `CacheName` for parsing and stale-store detection.

pub mod disk;
pub mod memory;
pub mod name;
pub mod storage;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use name::CacheName;
pub use storage::{CacheError, CacheStorage, CachedData};
