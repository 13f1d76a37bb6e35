//! Client-side authentication state synchronization.
//!
//! One [`AuthSyncCore`] per process owns the only writable auth status. The
//! reconciler is its single writer: it probes the server, coalesces
//! overlapping triggers and retries transient failures with bounded backoff.
//! Everything else (guard, navigation, profile page) reads through an
//! [`AuthStatusReader`] and asks for reconciliation through the
//! [`InvalidationBus`].

mod bus;
mod cell;
mod consumers;
mod error;
mod guard;
mod hint;
mod reconciler;
pub mod routes;
mod runtime;
mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{InvalidationBus, InvalidationReason};
pub use cell::{AuthStatusReader, StatusCallback, Subscription};
pub use consumers::{Avatar, NavView, ProfileCard, ProfileView};
pub use error::{ActionError, ActionResult};
pub use guard::{guard_machine, AuthGuard, GuardView, Navigator};
pub use hint::{AuthHint, FileHintStore, HintStore, MemoryHintStore};
pub use reconciler::RetryPolicy;
pub use runtime::AuthSyncCore;
pub use status::{AuthStatus, ReconcileOutcome};
