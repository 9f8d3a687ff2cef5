//! Cancellation tied to a view's lifetime.
//!
//! A view opens a [`ViewScope`] and runs its async work through a
//! [`ScopeHandle`]. Once the scope is closed (or dropped) pending work
//! resolves to [`Cancelled`] and its result is discarded.

use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;

/// The view that started the work is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cancelled: the view was closed")]
pub struct Cancelled;

/// Lifetime of one view. Closes when dropped.
#[derive(Debug)]
pub struct ViewScope {
    closed: watch::Sender<bool>,
}

impl ViewScope {
    #[must_use]
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self { closed }
    }

    /// A handle for running work in this scope.
    #[must_use]
    pub fn handle(&self) -> ScopeHandle {
        ScopeHandle {
            closed: self.closed.subscribe(),
        }
    }

    /// Cancel everything running in the scope.
    pub fn close(&self) {
        if !self.closed.send_replace(true) {
            tracing::debug!("View scope closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs futures until their scope closes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ScopeHandle {
    closed: watch::Receiver<bool>,
}

impl ScopeHandle {
    /// Drive `fut` to completion unless the scope closes first.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the scope is, or becomes, closed.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        let mut closed = self.closed.clone();
        if *closed.borrow_and_update() {
            return Err(Cancelled);
        }
        tokio::select! {
            output = fut => Ok(output),
            // Resolves on `true` or when the scope is dropped.
            _ = closed.wait_for(|closed| *closed) => Err(Cancelled),
        }
    }
}
