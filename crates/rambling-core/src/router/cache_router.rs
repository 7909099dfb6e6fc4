//! Network-first request routing over a versioned cache.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::lifecycle::{Lifecycle, ResponseSource, Routed};
use super::manifest::Manifest;
use super::policy::BestEffort;
use super::seed::{SeedOutcome, SeedReport};
use super::status::{SharedStatus, Status};
use super::{RouterError, RouterOptions};
use crate::cache::{CacheError, CacheName, CacheStorage};
use crate::clients::Clients;
use crate::models::{InboundMessage, OutboundMessage, Request};
use crate::net::{FetchOptions, NetError, Network};

/// Buffer size for page replies to a broadcast.
const REPLY_BUFFER_SIZE: usize = 16;

const SEEDING: BestEffort = BestEffort::new("seed");
const CACHE_WRITE: BestEffort = BestEffort::new("cache-write");
const CACHE_READ: BestEffort = BestEffort::new("cache-read");

#[derive(Error, Debug)]
enum SeedError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Net(#[from] NetError),
}

/// Result of broadcasting a message to open pages.
#[derive(Debug)]
pub struct Broadcast {
    /// Pages the message reached.
    pub delivered: usize,
    /// Resolves to the number of replies handled once every page has
    /// dropped its reply port.
    pub replies: JoinHandle<usize>,
}

/// The cache router.
/// Clone is cheap - all collaborators are shared.
#[derive(Clone)]
pub struct CacheRouter {
    options: Arc<RouterOptions>,
    cache_name: CacheName,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    status: SharedStatus,
}

impl CacheRouter {
    pub fn new(
        options: RouterOptions,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        clients: Arc<dyn Clients>,
    ) -> Self {
        let cache_name = CacheName::new(options.cache_prefix.clone(), options.version);
        Self {
            options: Arc::new(options),
            cache_name,
            storage,
            network,
            clients,
            status: SharedStatus::default(),
        }
    }

    /// Share an externally owned status object with this router.
    pub fn with_status(mut self, status: SharedStatus) -> Self {
        self.status = status;
        self
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    pub fn version(&self) -> u32 {
        self.options.version
    }

    /// Name of the store owned by the running version.
    pub fn cache_name(&self) -> String {
        self.cache_name.to_string()
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Startup path: ask every page for its status, then pre-cache the
    /// manifest without overwriting what is already there.
    pub async fn start(&self) -> SeedReport {
        info!(version = self.version(), "Service worker is starting");
        let broadcast = self
            .send_message(OutboundMessage::request_status_update())
            .await;
        debug!(delivered = broadcast.delivered, "Requested status update");
        self.cache_logged_out_files(false).await
    }

    /// Post a message to every open page, controlled or not. Replies are
    /// handled as inbound messages.
    pub async fn send_message(&self, message: OutboundMessage) -> Broadcast {
        let payload = message.to_value();
        let pages = self.clients.match_all(true).await;
        let (reply_tx, mut reply_rx) = mpsc::channel::<Value>(REPLY_BUFFER_SIZE);

        let posts = pages
            .iter()
            .map(|page| self.clients.post_message(page.id, payload.clone(), reply_tx.clone()));
        let delivered = join_all(posts).await.into_iter().filter(|ok| *ok).count();
        drop(reply_tx);

        let router = self.clone();
        let replies = tokio::spawn(async move {
            let mut handled = 0;
            while let Some(reply) = reply_rx.recv().await {
                router.on_message(&reply).await;
                handled += 1;
            }
            handled
        });

        Broadcast { delivered, replies }
    }

    /// Pre-cache every manifest URL concurrently.
    ///
    /// Without `force_reload`, URLs already in the store are left alone and
    /// not fetched. Individual failures never fail the pass.
    pub async fn cache_logged_out_files(&self, force_reload: bool) -> SeedReport {
        let cache_name = self.cache_name();
        let seeds = self.options.manifest.urls().iter().map(|entry| {
            let cache_name = cache_name.as_str();
            async move {
                let result = self.seed_one(cache_name, entry, force_reload).await;
                let outcome = SEEDING.absorb(entry, result).unwrap_or(SeedOutcome::Failed);
                (entry.clone(), outcome)
            }
        });

        let report = SeedReport {
            outcomes: join_all(seeds).await,
        };
        debug!(
            force_reload,
            stored = report.stored(),
            cached = report.count(SeedOutcome::AlreadyCached),
            failed = report.count(SeedOutcome::Failed),
            "Manifest seeding finished"
        );
        report
    }

    async fn seed_one(
        &self,
        cache_name: &str,
        entry: &str,
        force_reload: bool,
    ) -> Result<SeedOutcome, SeedError> {
        if !force_reload && self.storage.match_entry(cache_name, entry).await?.is_some() {
            return Ok(SeedOutcome::AlreadyCached);
        }

        let url = Manifest::resolve(&self.options.origin, entry)?;
        let response = self
            .network
            .fetch(&Request::get(url), FetchOptions::seeding())
            .await?;
        if !response.is_ok() {
            return Ok(SeedOutcome::Rejected(response.status));
        }

        self.storage.put(cache_name, entry, response).await?;
        Ok(SeedOutcome::Stored)
    }

    /// Existing store names that belong to an older or newer version.
    pub async fn stale_cache_names(&self) -> Result<Vec<String>, RouterError> {
        Ok(self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| self.cache_name.is_stale(name))
            .collect())
    }

    /// Delete every stale store concurrently; returns the deleted names.
    pub async fn clear_caches(&self) -> Result<Vec<String>, RouterError> {
        let stale = self.stale_cache_names().await?;
        try_join_all(stale.iter().map(|name| self.storage.delete(name))).await?;
        for name in &stale {
            debug!(store = %name, "Deleted stale cache");
        }
        Ok(stale)
    }

    async fn route(&self, request: Request) -> Option<Routed> {
        if !request.is_same_origin(&self.options.origin) {
            // TODO: route cross-origin requests once CORS responses can be cached opaquely
            debug!(url = %request.url, "Cross-origin request not routed");
            return None;
        }

        let cache_name = self.cache_name();
        let key = request.path().to_string();

        match self.network.fetch(&request, FetchOptions::routing()).await {
            Ok(response) if response.is_ok() => {
                let write = self.storage.put(&cache_name, &key, response.clone()).await;
                CACHE_WRITE.absorb(&key, write);
                return Some(Routed {
                    response,
                    source: ResponseSource::Network,
                });
            }
            Ok(response) => {
                debug!(path = %key, status = response.status, "Network response not ok, trying cache");
            }
            Err(e) => {
                debug!(path = %key, error = %e, "Network request failed, trying cache");
            }
        }

        let cached = CACHE_READ.absorb(&key, self.storage.match_entry(&cache_name, &key).await)??;
        Some(Routed {
            response: cached.data,
            source: ResponseSource::Cache,
        })
    }
}

#[async_trait]
impl Lifecycle for CacheRouter {
    async fn on_start(&self) {
        self.start().await;
    }

    async fn on_install(&self) -> Result<(), RouterError> {
        self.clients.skip_waiting().await;
        info!(version = self.version(), "Service worker installed");
        Ok(())
    }

    async fn on_activate(&self) -> Result<(), RouterError> {
        let removed = self.clear_caches().await?;
        self.storage.open(&self.cache_name()).await?;
        let report = self.cache_logged_out_files(true).await;
        self.clients.claim().await;
        info!(
            version = self.version(),
            removed = removed.len(),
            stored = report.stored(),
            "Service worker activated"
        );
        Ok(())
    }

    async fn on_fetch(&self, request: Request) -> Option<Routed> {
        self.route(request).await
    }

    async fn on_message(&self, data: &Value) {
        if let Some(update) = InboundMessage::status_update(data) {
            let status = self.status.apply(update);
            info!(
                version = self.version(),
                is_online = status.is_online,
                is_logged_in = status.is_logged_in,
                "Status update"
            );
        }
    }
}

#[cfg(test)]
mod tests;
