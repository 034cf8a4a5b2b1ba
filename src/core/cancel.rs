//! Cooperative cancellation for long-running operations.
//!
//! Every public core entry point threads a [`CancellationToken`] down to
//! forge calls and filesystem mutations. Cancellation is checked before any
//! mutation, so an interrupted operation leaves either a fully installed
//! rule with a matching lockfile entry or no trace at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};

/// A cheaply clonable cancellation flag shared across an operation.
///
/// Cloning produces a handle to the same flag; cancelling any clone
/// cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Error out if cancellation has been requested.
    ///
    /// Call sites place this immediately before network fetches and
    /// filesystem writes.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            bail!("operation cancelled");
        }
        Ok(())
    }
}
