use async_trait::async_trait;
use serde_json::Value;

use super::RouterError;
use crate::models::{Request, StoredResponse};

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub response: StoredResponse,
    pub source: ResponseSource,
}

/// Host lifecycle callbacks. The host awaits each one before it considers
/// the phase complete.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Runs each time the worker boots, before any event is delivered.
    async fn on_start(&self) {}

    async fn on_install(&self) -> Result<(), RouterError>;

    async fn on_activate(&self) -> Result<(), RouterError>;

    /// `None` means the request is left to the host (cross-origin, or
    /// neither network nor cache produced a response).
    async fn on_fetch(&self, request: Request) -> Option<Routed>;

    async fn on_message(&self, data: &Value);
}
