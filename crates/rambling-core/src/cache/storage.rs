use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::StoredResponse;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache store {name}: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid cache store name: {0}")]
    InvalidName(String),
}

/// A stored value together with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Named cache stores scoped to one origin.
///
/// Writing to a store that does not exist creates it. Reading from a
/// missing store is a miss, not an error.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of every existing store.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Create the store if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), CacheError>;

    /// Delete a store; returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;

    async fn match_entry(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<CachedData<StoredResponse>>, CacheError>;

    /// Insert or overwrite the entry for `key`.
    async fn put(&self, name: &str, key: &str, response: StoredResponse) -> Result<(), CacheError>;

    /// All entries of a store ordered by key; empty if the store is missing.
    async fn entries(
        &self,
        name: &str,
    ) -> Result<Vec<(String, CachedData<StoredResponse>)>, CacheError>;
}
