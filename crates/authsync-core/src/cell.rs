//! The process-wide auth status cell.
//!
//! [`StateWriter`] is the only handle that can change the status. It is not
//! `Clone` and only the reconciler holds one. Readers get an
//! [`AuthStatusReader`], which can observe, await and subscribe but never
//! write.

use crate::status::AuthStatus;
use authsync_api::Profile;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// Callback type for status change notifications.
pub type StatusCallback = Box<dyn Fn(&AuthStatus) + Send + Sync>;

/// Everything a reader sees, published atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub status: AuthStatus,
    /// Set when the last reconciliation ran out of retries.
    pub indeterminate: bool,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: Vec<(u64, Arc<StatusCallback>)>,
}

/// Create the cell, returning its single writer and a reader.
pub(crate) fn channel() -> (StateWriter, AuthStatusReader) {
    let (tx, rx) = watch::channel(Snapshot::default());
    let listeners = Arc::new(Mutex::new(Listeners::default()));
    (
        StateWriter {
            tx,
            listeners: listeners.clone(),
        },
        AuthStatusReader { rx, listeners },
    )
}

/// Exclusive write handle.
pub(crate) struct StateWriter {
    tx: watch::Sender<Snapshot>,
    listeners: Arc<Mutex<Listeners>>,
}

impl StateWriter {
    pub(crate) fn current(&self) -> AuthStatus {
        self.tx.borrow().status.clone()
    }

    /// Install `Authenticated(profile)`. Returns true if the status changed.
    pub(crate) fn set_authenticated(&self, profile: Profile) -> bool {
        self.publish(AuthStatus::Authenticated { profile })
    }

    /// Install `Unauthenticated`. Returns true if the status changed.
    pub(crate) fn set_unauthenticated(&self) -> bool {
        self.publish(AuthStatus::Unauthenticated)
    }

    /// Flag the current status as unconfirmed without touching it.
    pub(crate) fn mark_indeterminate(&self) {
        self.tx.send_if_modified(|snapshot| {
            let modified = !snapshot.indeterminate;
            snapshot.indeterminate = true;
            modified
        });
    }

    fn publish(&self, status: AuthStatus) -> bool {
        let mut changed = false;
        self.tx.send_if_modified(|snapshot| {
            changed = snapshot.status != status;
            let modified = changed || snapshot.indeterminate;
            snapshot.status = status.clone();
            snapshot.indeterminate = false;
            modified
        });

        if changed {
            self.notify(&status);
        }
        changed
    }

    fn notify(&self, status: &AuthStatus) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<Arc<StatusCallback>> = self
            .listeners
            .lock()
            .callbacks
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in callbacks {
            callback(status);
        }
    }
}

/// Read-only view of the status cell. Cheap to clone.
#[derive(Clone)]
pub struct AuthStatusReader {
    rx: watch::Receiver<Snapshot>,
    listeners: Arc<Mutex<Listeners>>,
}

impl AuthStatusReader {
    /// Current status.
    pub fn status(&self) -> AuthStatus {
        self.rx.borrow().status.clone()
    }

    /// True when the last reconciliation could not confirm the status.
    pub fn is_indeterminate(&self) -> bool {
        self.rx.borrow().indeterminate
    }

    /// Wait for the next published change. Returns false once the core is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the status is no longer `Unknown` and return it.
    ///
    /// Returns `None` if the core shuts down first.
    pub async fn wait_until_known(&mut self) -> Option<AuthStatus> {
        self.rx
            .wait_for(|snapshot| snapshot.status.is_known())
            .await
            .ok()
            .map(|snapshot| snapshot.status.clone())
    }

    /// Call `callback` after every status change until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: StatusCallback) -> Subscription {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.callbacks.push((id, Arc::new(callback)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }
}

/// Handle for a status callback. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .callbacks
                .retain(|(id, _)| *id != self.id);
        }
    }
}
