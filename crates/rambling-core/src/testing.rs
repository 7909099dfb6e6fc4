//! Test doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::models::{Request, StoredResponse};
use crate::net::{FetchOptions, NetError, Network};

/// Scripted network keyed by absolute URL. Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct FakeNetwork {
    responses: Mutex<HashMap<String, StoredResponse>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: StoredResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Make requests to `url` fail at the transport level.
    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().push(url.to_string());
    }

    /// Hold requests to `url` until the returned gate is notified.
    pub fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), gate.clone());
        gate
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(
        &self,
        request: &Request,
        options: FetchOptions,
    ) -> Result<StoredResponse, NetError> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push((url.clone(), options));

        let gate = self.gates.lock().unwrap().get(&url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(NetError::Offline(url));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| StoredResponse::new(404, "not found")))
    }
}
