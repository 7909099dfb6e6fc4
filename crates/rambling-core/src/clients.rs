//! Open pages the router can message and take control of.
//!
//! `LocalClients` keeps a registry of pages, each backed by a tokio channel.
//! A page receives `ClientEnvelope`s and may answer through the envelope's
//! reply sender; the router routes those replies into its message handler.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Buffer size for each page's inbox.
const INBOX_BUFFER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: ClientId,
    pub url: String,
    pub controlled: bool,
}

/// A message delivered to a page together with its reply port.
#[derive(Debug)]
pub struct ClientEnvelope {
    pub message: Value,
    pub reply: mpsc::Sender<Value>,
}

#[async_trait]
pub trait Clients: Send + Sync {
    /// Pages currently open; uncontrolled ones only when asked for.
    async fn match_all(&self, include_uncontrolled: bool) -> Vec<ClientInfo>;

    /// Deliver a message; returns false if the page is gone.
    async fn post_message(&self, id: ClientId, message: Value, reply: mpsc::Sender<Value>) -> bool;

    /// Take control of every open page.
    async fn claim(&self);

    /// Activate without waiting for pages of the previous version to close.
    async fn skip_waiting(&self);
}

struct Page {
    info: ClientInfo,
    inbox: mpsc::Sender<ClientEnvelope>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    pages: Vec<Page>,
    skip_waiting: bool,
}

/// In-process page registry.
#[derive(Default)]
pub struct LocalClients {
    registry: Mutex<Registry>,
}

impl LocalClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a page and return its id and inbox.
    pub async fn register(
        &self,
        url: impl Into<String>,
        controlled: bool,
    ) -> (ClientId, mpsc::Receiver<ClientEnvelope>) {
        let (tx, rx) = mpsc::channel(INBOX_BUFFER_SIZE);
        let mut registry = self.registry.lock().await;
        registry.next_id += 1;
        let id = ClientId(registry.next_id);
        registry.pages.push(Page {
            info: ClientInfo {
                id,
                url: url.into(),
                controlled,
            },
            inbox: tx,
        });
        (id, rx)
    }

    pub async fn is_controlled(&self, id: ClientId) -> Option<bool> {
        self.registry
            .lock()
            .await
            .pages
            .iter()
            .find(|p| p.info.id == id)
            .map(|p| p.info.controlled)
    }

    pub async fn skip_waiting_requested(&self) -> bool {
        self.registry.lock().await.skip_waiting
    }
}

#[async_trait]
impl Clients for LocalClients {
    async fn match_all(&self, include_uncontrolled: bool) -> Vec<ClientInfo> {
        let mut registry = self.registry.lock().await;
        registry.pages.retain(|p| !p.inbox.is_closed());
        registry
            .pages
            .iter()
            .filter(|p| include_uncontrolled || p.info.controlled)
            .map(|p| p.info.clone())
            .collect()
    }

    async fn post_message(&self, id: ClientId, message: Value, reply: mpsc::Sender<Value>) -> bool {
        let inbox = {
            let registry = self.registry.lock().await;
            match registry.pages.iter().find(|p| p.info.id == id) {
                Some(page) => page.inbox.clone(),
                None => return false,
            }
        };

        // Never wait on a page that stopped reading its inbox.
        match inbox.try_send(ClientEnvelope { message, reply }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(client = %id, "Page inbox full, message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client = %id, "Page closed before message delivery");
                self.registry
                    .lock()
                    .await
                    .pages
                    .retain(|p| p.info.id != id);
                false
            }
        }
    }

    async fn claim(&self) {
        let mut registry = self.registry.lock().await;
        for page in &mut registry.pages {
            page.info.controlled = true;
        }
        debug!(pages = registry.pages.len(), "Claimed open pages");
    }

    async fn skip_waiting(&self) {
        self.registry.lock().await.skip_waiting = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_match_all_filters_uncontrolled() {
        let clients = LocalClients::new();
        let (a, _rx_a) = clients.register("/", true).await;
        let (b, _rx_b) = clients.register("/about", false).await;

        let controlled: Vec<_> = clients.match_all(false).await.into_iter().map(|c| c.id).collect();
        assert_eq!(controlled, vec![a]);

        let all: Vec<_> = clients.match_all(true).await.into_iter().map(|c| c.id).collect();
        assert_eq!(all, vec![a, b]);
    }

    #[tokio::test]
    async fn test_post_message_delivers_with_reply_port() {
        let clients = LocalClients::new();
        let (id, mut inbox) = clients.register("/", true).await;
        let (reply_tx, mut reply_rx) = mpsc::channel(1);

        assert!(clients.post_message(id, json!({ "hi": 1 }), reply_tx).await);

        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.message, json!({ "hi": 1 }));
        envelope.reply.send(json!("pong")).await.unwrap();
        assert_eq!(reply_rx.recv().await, Some(json!("pong")));
    }

    #[tokio::test]
    async fn test_closed_pages_are_pruned() {
        let clients = LocalClients::new();
        let (id, inbox) = clients.register("/", true).await;
        drop(inbox);

        let (reply_tx, _reply_rx) = mpsc::channel(1);
        assert!(!clients.post_message(id, json!({}), reply_tx).await);
        assert!(clients.match_all(true).await.is_empty());
    }

    #[tokio::test]
    async fn test_full_inbox_does_not_block() {
        let clients = LocalClients::new();
        let (id, _inbox) = clients.register("/", true).await;
        let (reply_tx, _reply_rx) = mpsc::channel(1);

        for _ in 0..INBOX_BUFFER_SIZE {
            assert!(clients.post_message(id, json!({}), reply_tx.clone()).await);
        }
        assert!(!clients.post_message(id, json!({}), reply_tx).await);

        // The page is slow, not gone
        assert_eq!(clients.match_all(true).await.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_and_skip_waiting() {
        let clients = LocalClients::new();
        let (id, _inbox) = clients.register("/", false).await;
        assert_eq!(clients.is_controlled(id).await, Some(false));
        assert!(!clients.skip_waiting_requested().await);

        clients.claim().await;
        clients.skip_waiting().await;

        assert_eq!(clients.is_controlled(id).await, Some(true));
        assert!(clients.skip_waiting_requested().await);
    }
}
