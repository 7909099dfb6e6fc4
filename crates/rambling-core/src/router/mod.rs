//! The cache router: network-first routing with a versioned cache fallback.
//!
//! - `CacheRouter`: the router itself, driven through `Lifecycle`
//! - `Manifest`: URLs pre-cached for logged-out visitors
//! - `SharedStatus`: online/login flags reported by pages
//! - `BestEffort`: the failure policy for work that must never fail its caller

pub mod cache_router;
pub mod lifecycle;
pub mod manifest;
pub mod policy;
pub mod seed;
pub mod status;

use reqwest::Url;
use thiserror::Error;

use crate::cache::CacheError;

pub use cache_router::CacheRouter;
pub use lifecycle::{Lifecycle, ResponseSource, Routed};
pub use manifest::Manifest;
pub use policy::BestEffort;
pub use seed::{SeedOutcome, SeedReport};
pub use status::{SharedStatus, Status};

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Cache storage error: {0}")]
    Cache(#[from] CacheError),
}

/// Everything the router needs to know about the deployment it serves.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Origin whose requests are routed.
    pub origin: Url,
    /// Running version; embedded in the cache store name.
    pub version: u32,
    pub cache_prefix: String,
    pub manifest: Manifest,
}

impl RouterOptions {
    pub fn new(origin: Url, version: u32) -> Self {
        Self {
            origin,
            version,
            cache_prefix: crate::config::DEFAULT_CACHE_PREFIX.to_string(),
            manifest: Manifest::default(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }
}
