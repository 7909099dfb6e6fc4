//! Lifecycle host for a router.
//!
//! The host boots the worker once, enforces the order of lifecycle phases
//! (install, then activate, then fetch serving) and can run an event loop
//! over a channel: lifecycle
//! events and messages are handled one at a time while fetches are spawned
//! so independent requests interleave.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::models::Request;
use crate::router::{Lifecycle, Routed, RouterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installed,
    Activated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installed => "installed",
            LifecycleState::Activated => "activated",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Cannot {event} while {state}")]
    OutOfOrder {
        event: &'static str,
        state: LifecycleState,
    },

    #[error(transparent)]
    Router(#[from] RouterError),
}

/// Events delivered to a running host.
pub enum HostEvent {
    Install {
        done: oneshot::Sender<Result<(), HostError>>,
    },
    Activate {
        done: oneshot::Sender<Result<(), HostError>>,
    },
    Fetch {
        request: Request,
        respond: oneshot::Sender<Result<Option<Routed>, HostError>>,
    },
    Message(Value),
}

pub struct ServiceWorkerHost<L> {
    worker: Arc<L>,
    state: LifecycleState,
    started: bool,
}

impl<L: Lifecycle + 'static> ServiceWorkerHost<L> {
    pub fn new(worker: L) -> Self {
        Self {
            worker: Arc::new(worker),
            state: LifecycleState::Parsed,
            started: false,
        }
    }

    /// Run the worker's startup path. Only the first call has any effect.
    pub async fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.worker.on_start().await;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn worker(&self) -> &L {
        &self.worker
    }

    pub async fn install(&mut self) -> Result<(), HostError> {
        if self.state != LifecycleState::Parsed {
            return Err(HostError::OutOfOrder {
                event: "install",
                state: self.state,
            });
        }
        self.worker.on_install().await?;
        self.state = LifecycleState::Installed;
        Ok(())
    }

    /// Activation only counts as complete once the worker's handler has
    /// finished; a failed activation leaves the host installed.
    pub async fn activate(&mut self) -> Result<(), HostError> {
        if self.state != LifecycleState::Installed {
            return Err(HostError::OutOfOrder {
                event: "activate",
                state: self.state,
            });
        }
        self.worker.on_activate().await?;
        self.state = LifecycleState::Activated;
        Ok(())
    }

    pub async fn fetch(&self, request: Request) -> Result<Option<Routed>, HostError> {
        self.ensure_activated()?;
        Ok(self.worker.on_fetch(request).await)
    }

    pub async fn message(&self, data: &Value) {
        self.worker.on_message(data).await;
    }

    fn ensure_activated(&self) -> Result<(), HostError> {
        if self.state != LifecycleState::Activated {
            return Err(HostError::OutOfOrder {
                event: "fetch",
                state: self.state,
            });
        }
        Ok(())
    }

    /// Boot the worker, then process events until every sender is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) {
        self.start().await;
        info!("Host event loop started");
        while let Some(event) = events.recv().await {
            match event {
                HostEvent::Install { done } => {
                    let result = self.install().await;
                    if let Err(ref e) = result {
                        warn!(error = %e, "Install failed");
                    }
                    let _ = done.send(result);
                }
                HostEvent::Activate { done } => {
                    let result = self.activate().await;
                    if let Err(ref e) = result {
                        warn!(error = %e, "Activation failed");
                    }
                    let _ = done.send(result);
                }
                HostEvent::Fetch { request, respond } => {
                    if let Err(e) = self.ensure_activated() {
                        let _ = respond.send(Err(e));
                        continue;
                    }
                    let worker = Arc::clone(&self.worker);
                    tokio::spawn(async move {
                        let routed = worker.on_fetch(request).await;
                        if respond.send(Ok(routed)).is_err() {
                            debug!("Fetch caller went away before the response");
                        }
                    });
                }
                HostEvent::Message(data) => self.message(&data).await,
            }
        }
        info!("Host event loop stopped");
    }
}
