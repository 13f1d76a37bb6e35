//! The reconciler: the single writer of the auth status.
//!
//! A reconciliation probes `GET /auth/profile` and installs the answer:
//!
//! - a profile installs `Authenticated(profile)`
//! - a 401 installs `Unauthenticated`, from any status
//! - anything else is retried with exponential backoff and never changes the
//!   status; when attempts run out the status is flagged indeterminate
//!
//! At most one probe runs at a time. Triggers that arrive while one is in
//! flight collapse into a single re-run after it finishes.
//!
//! Login and logout write the status locally. An answer to a probe that was
//! already on the wire when that happened is dropped and the probe repeats.
//! After logout, a profile answer is ignored until the next login.

use crate::bus::InvalidationReason;
use crate::cell::StateWriter;
use crate::hint::{AuthHint, HintStore};
use crate::status::{AuthStatus, ReconcileOutcome};
use authsync_api::{AuthApi, Profile};
use authsync_config::ReconcileSettings;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded exponential backoff for the profile probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per pass, first try included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReconcileSettings::default())
    }
}

impl From<&ReconcileSettings> for RetryPolicy {
    fn from(settings: &ReconcileSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Default)]
struct ProbeSlot {
    in_flight: bool,
    rerun_requested: bool,
}

/// Local writes that probes must not overwrite.
#[derive(Debug, Default)]
struct LocalEpoch {
    /// Bumped by every login seed and logout. A probe answer is only applied
    /// if no local write happened while it was on the wire.
    generation: u64,
    /// Set by logout, cleared by the next login. While set, a profile answer
    /// never promotes the status back to `Authenticated`.
    signed_out: bool,
}

/// Clears `in_flight` if the reconciling future is dropped mid-probe.
struct InFlight<'a> {
    slot: &'a Mutex<ProbeSlot>,
    released: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.released {
            let mut slot = self.slot.lock();
            slot.in_flight = false;
            slot.rerun_requested = false;
        }
    }
}

/// Owns the [`StateWriter`]; nothing else can change the status.
pub(crate) struct Reconciler {
    api: Arc<dyn AuthApi>,
    writer: StateWriter,
    policy: RetryPolicy,
    hints: Arc<dyn HintStore>,
    slot: Mutex<ProbeSlot>,
    epoch: Mutex<LocalEpoch>,
}

impl Reconciler {
    pub(crate) fn new(
        api: Arc<dyn AuthApi>,
        writer: StateWriter,
        policy: RetryPolicy,
        hints: Arc<dyn HintStore>,
    ) -> Self {
        Self {
            api,
            writer,
            policy,
            hints,
            slot: Mutex::new(ProbeSlot::default()),
            epoch: Mutex::new(LocalEpoch::default()),
        }
    }

    /// Probe the server and install the answer.
    ///
    /// Returns [`ReconcileOutcome::Coalesced`] immediately if a probe is
    /// already running; that probe then runs once more before it returns.
    pub(crate) async fn reconcile(&self, reason: InvalidationReason) -> ReconcileOutcome {
        {
            let mut slot = self.slot.lock();
            if slot.in_flight {
                slot.rerun_requested = true;
                debug!(reason = %reason, "Probe in flight, coalescing");
                return ReconcileOutcome::Coalesced;
            }
            slot.in_flight = true;
        }

        let mut flight = InFlight {
            slot: &self.slot,
            released: false,
        };
        debug!(reason = %reason, "Reconciling auth status");

        loop {
            let Some(outcome) = self.probe_with_backoff().await else {
                // The next probe starts after the local write, so it also
                // answers any re-run requested meanwhile.
                self.slot.lock().rerun_requested = false;
                debug!("Login or logout happened during the probe, discarding its answer");
                continue;
            };

            let rerun = {
                let mut slot = self.slot.lock();
                if slot.rerun_requested {
                    slot.rerun_requested = false;
                    true
                } else {
                    slot.in_flight = false;
                    false
                }
            };

            if rerun {
                debug!("Re-running probe requested during the previous one");
                continue;
            }
            flight.released = true;
            return outcome;
        }
    }

    /// One probe pass. `None` means a local write superseded the answer.
    async fn probe_with_backoff(&self) -> Option<ReconcileOutcome> {
        let max_attempts = self.policy.max_attempts.max(1);
        let started = self.generation();

        for attempt in 0..max_attempts {
            match self.api.fetch_profile().await {
                Ok(profile) => return self.settle_authenticated(profile, started).await,
                Err(err) if err.is_unauthorized() => {
                    return self.settle_unauthenticated(started).await
                }
                Err(err) => {
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Probe failed without an answer, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            attempts = max_attempts,
                            error = %err,
                            "Probe retries exhausted, keeping current status"
                        );
                    }
                }
            }
        }

        let epoch = self.epoch.lock();
        if epoch.generation != started {
            return None;
        }
        self.writer.mark_indeterminate();
        Some(ReconcileOutcome::Indeterminate(self.writer.current()))
    }

    fn generation(&self) -> u64 {
        self.epoch.lock().generation
    }

    async fn settle_authenticated(
        &self,
        profile: Profile,
        started: u64,
    ) -> Option<ReconcileOutcome> {
        let user_id = profile.id;
        {
            let epoch = self.epoch.lock();
            if epoch.generation != started {
                return None;
            }
            if epoch.signed_out {
                warn!(user_id, "Profile answered after logout, staying signed out");
                self.writer.set_unauthenticated();
                return Some(ReconcileOutcome::Settled(AuthStatus::Unauthenticated));
            }
            if self.writer.set_authenticated(profile) {
                info!(user_id, "Auth status settled: authenticated");
            }
        }
        self.remember(true).await;
        Some(ReconcileOutcome::Settled(self.writer.current()))
    }

    async fn settle_unauthenticated(&self, started: u64) -> Option<ReconcileOutcome> {
        {
            let epoch = self.epoch.lock();
            if epoch.generation != started {
                return None;
            }
            if self.writer.set_unauthenticated() {
                info!("Auth status settled: unauthenticated");
            }
        }
        self.remember(false).await;
        Some(ReconcileOutcome::Settled(AuthStatus::Unauthenticated))
    }

    /// Install the user returned by a successful login before the
    /// confirming probe answers.
    pub(crate) fn seed_optimistic(&self, profile: Profile) {
        debug!(user_id = profile.id, "Seeding authenticated status from login");
        let mut epoch = self.epoch.lock();
        epoch.generation += 1;
        epoch.signed_out = false;
        self.writer.set_authenticated(profile);
    }

    /// Drop to `Unauthenticated` without asking the server (logout). Stays
    /// signed out until the next [`Reconciler::seed_optimistic`].
    pub(crate) async fn force_signed_out(&self) {
        {
            let mut epoch = self.epoch.lock();
            epoch.generation += 1;
            epoch.signed_out = true;
            if self.writer.set_unauthenticated() {
                info!("Auth status set to unauthenticated by logout");
            }
        }
        self.remember(false).await;
    }

    async fn remember(&self, signed_in: bool) {
        let hints = self.hints.clone();
        match tokio::task::spawn_blocking(move || hints.store(AuthHint::new(signed_in))).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "Failed to persist auth hint"),
            Err(err) => warn!(error = %err, "Auth hint writer task failed"),
        }
    }
}
