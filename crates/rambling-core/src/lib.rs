//! Core library for rambling-sw.
//!
//! A background cache router for a single web origin: requests are sent
//! network-first and fall back to a versioned local cache, a fixed manifest
//! of URLs is pre-cached for logged-out visitors, and caches left behind by
//! older versions are evicted when a new version activates.
//!
//! The router talks to its host through three seams:
//! - `CacheStorage`: named cache stores (`cache` module)
//! - `Network`: outbound requests (`net` module)
//! - `Clients`: open pages that receive broadcasts (`clients` module)

pub mod cache;
pub mod clients;
pub mod config;
pub mod host;
pub mod models;
pub mod net;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use clients::{Clients, LocalClients};
pub use config::Config;
pub use host::{HostError, HostEvent, LifecycleState, ServiceWorkerHost};
pub use models::{Request, StoredResponse};
pub use net::{HttpNetwork, Network};
pub use router::{CacheRouter, Lifecycle, Routed, RouterOptions};
