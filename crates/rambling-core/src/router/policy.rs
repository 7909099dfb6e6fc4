use std::fmt::Display;

use tracing::debug;

/// Failure policy for work whose errors must never reach the caller.
///
/// A failed step is logged at debug level and dropped; the surrounding
/// operation carries on and still reports success.
#[derive(Debug, Clone, Copy)]
pub struct BestEffort {
    operation: &'static str,
}

impl BestEffort {
    pub const fn new(operation: &'static str) -> Self {
        Self { operation }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn absorb<T, E: Display>(&self, target: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(operation = self.operation, item = target, error = %e, "Ignoring failure");
                None
            }
        }
    }
}
