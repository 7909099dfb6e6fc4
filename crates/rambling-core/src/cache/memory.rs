use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::{CacheError, CacheStorage, CachedData};
use crate::models::StoredResponse;

type Store = BTreeMap<String, CachedData<StoredResponse>>;

/// In-process cache storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<BTreeMap<String, Store>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn open(&self, name: &str) -> Result<(), CacheError> {
        self.stores
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.stores.write().await.remove(name).is_some())
    }

    async fn match_entry(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<CachedData<StoredResponse>>, CacheError> {
        Ok(self
            .stores
            .read()
            .await
            .get(name)
            .and_then(|store| store.get(key))
            .cloned())
    }

    async fn put(&self, name: &str, key: &str, response: StoredResponse) -> Result<(), CacheError> {
        self.stores
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), CachedData::new(response));
        Ok(())
    }

    async fn entries(
        &self,
        name: &str,
    ) -> Result<Vec<(String, CachedData<StoredResponse>)>, CacheError> {
        Ok(self
            .stores
            .read()
            .await
            .get(name)
            .map(|store| store.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
