//! Outbound network access for the router.
//!
//! `Network` is the seam the router fetches through; `HttpNetwork` is the
//! reqwest-backed implementation. Every router request carries
//! `FetchOptions` describing its credential and caching mode.

pub mod client;
pub mod error;
pub mod options;

pub use client::{HttpNetwork, Network};
pub use error::NetError;
pub use options::{CacheMode, Credentials, FetchOptions};
