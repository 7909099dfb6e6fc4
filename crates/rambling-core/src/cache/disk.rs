use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::storage::{CacheError, CacheStorage, CachedData};
use crate::models::StoredResponse;

/// File extension of store files.
const STORE_EXTENSION: &str = "json";

type Store = BTreeMap<String, CachedData<StoredResponse>>;

/// Cache storage backed by one JSON file per store under `root`.
///
/// Writes go through a temporary file and a rename so a crash never
/// leaves a half-written store behind.
pub struct DiskCacheStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&root).map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", name, STORE_EXTENSION)))
    }

    async fn load(&self, name: &str) -> Result<Option<Store>, CacheError> {
        let path = self.store_path(name)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let store = serde_json::from_str(&contents).map_err(|source| CacheError::Corrupt {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(store))
    }

    async fn save(&self, name: &str, store: &Store) -> Result<(), CacheError> {
        let path = self.store_path(name)?;
        let tmp = path.with_extension("tmp");
        let contents = serde_json::to_vec(store).map_err(|source| CacheError::Corrupt {
            name: name.to_string(),
            source,
        })?;

        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|source| CacheError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| CacheError::Io { path, source })?;
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let io_err = |source| CacheError::Io {
            path: self.root.clone(),
            source,
        };

        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STORE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn open(&self, name: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        if self.load(name).await?.is_none() {
            debug!(store = name, "Creating cache store");
            self.save(name, &Store::new()).await?;
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let _guard = self.write_lock.lock().await;
        let path = self.store_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    async fn match_entry(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<CachedData<StoredResponse>>, CacheError> {
        Ok(self
            .load(name)
            .await?
            .and_then(|mut store| store.remove(key)))
    }

    async fn put(&self, name: &str, key: &str, response: StoredResponse) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut store = self.load(name).await?.unwrap_or_default();
        store.insert(key.to_string(), CachedData::new(response));
        self.save(name, &store).await
    }

    async fn entries(
        &self,
        name: &str,
    ) -> Result<Vec<(String, CachedData<StoredResponse>)>, CacheError> {
        Ok(self
            .load(name)
            .await?
            .map(|store| store.into_iter().collect())
            .unwrap_or_default())
    }
}
