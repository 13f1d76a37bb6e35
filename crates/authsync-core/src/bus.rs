//! Invalidation signals.
//!
//! A signal says "the auth status may be stale" and nothing more. Delivery is
//! at-least-once and unordered; every signal turns into a reconcile request,
//! and the reconciler coalesces duplicates.

use crate::reconciler::Reconciler;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bus capacity. A lagging worker still reconciles, so overflow is harmless.
const BUS_CAPACITY: usize = 64;

/// Why the status may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidationReason {
    /// The core just started.
    Startup,
    LoginSuccess,
    Logout,
    FocusRegained,
    Navigation,
    ProfileUpdated,
    /// A refresh-eligible request was rejected even after a refresh.
    SessionRejected,
}

impl InvalidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::Startup => "startup",
            InvalidationReason::LoginSuccess => "login-success",
            InvalidationReason::Logout => "logout",
            InvalidationReason::FocusRegained => "focus-regained",
            InvalidationReason::Navigation => "navigation",
            InvalidationReason::ProfileUpdated => "profile-updated",
            InvalidationReason::SessionRejected => "session-rejected",
        }
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fan-out channel for [`InvalidationReason`]s.
#[derive(Clone)]
pub struct InvalidationBus {
    tx: broadcast::Sender<InvalidationReason>,
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish a signal. Having no listeners is not an error.
    pub fn emit(&self, reason: InvalidationReason) {
        debug!(reason = %reason, "Invalidation signal");
        let _ = self.tx.send(reason);
    }

    /// Listen for signals emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationReason> {
        self.tx.subscribe()
    }
}

/// Turn every signal into a reconcile request until the bus closes.
pub(crate) fn spawn_worker(
    mut rx: broadcast::Receiver<InvalidationReason>,
    reconciler: Arc<Reconciler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let reason = match rx.recv().await {
                Ok(reason) => reason,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Invalidation worker lagged, reconciling anyway");
                    InvalidationReason::Navigation
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Invalidation bus closed");
                    break;
                }
            };

            let reconciler = reconciler.clone();
            tokio::spawn(async move {
                reconciler.reconcile(reason).await;
            });
        }
    })
}
