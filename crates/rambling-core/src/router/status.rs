use std::sync::{Arc, PoisonError, RwLock};

use crate::models::StatusUpdate;

/// Online and login state as last reported by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub is_online: bool,
    pub is_logged_in: bool,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            is_online: true,
            is_logged_in: false,
        }
    }
}

/// Status owned by a router instance and shared with whoever injected it.
///
/// Only the router's message handler writes to it.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus(Arc<RwLock<Status>>);

impl SharedStatus {
    pub fn new(status: Status) -> Self {
        Self(Arc::new(RwLock::new(status)))
    }

    pub fn get(&self) -> Status {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn apply(&self, update: StatusUpdate) -> Status {
        let mut status = self.0.write().unwrap_or_else(PoisonError::into_inner);
        status.is_online = update.is_online;
        status.is_logged_in = update.is_logged_in;
        *status
    }
}
