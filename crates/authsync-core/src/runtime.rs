//! The process-wide auth sync runtime.
//!
//! [`AuthSyncCore`] wires the status cell, the reconciler and the
//! invalidation bus together and exposes the only operations UI code needs:
//! read the status, subscribe to it, ask for reconciliation, and run the
//! explicit login/logout/signup/profile actions.

use crate::bus::{spawn_worker, InvalidationBus, InvalidationReason};
use crate::cell::{self, AuthStatusReader, StatusCallback, Subscription};
use crate::consumers::{NavView, ProfileView};
use crate::error::{ActionError, ActionResult};
use crate::guard::{AuthGuard, Navigator};
use crate::hint::{AuthHint, HintStore};
use crate::reconciler::{Reconciler, RetryPolicy};
use crate::status::{AuthStatus, ReconcileOutcome};
use authsync_api::{AuthApi, Credentials, Profile, ProfileUpdate, SignupRequest};
use authsync_config::Config;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const LOGIN_REJECTED: &str = "Incorrect ID or password.";
const SIGNUP_REJECTED: &str = "Sign up was not accepted. Please try again.";
const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

/// Shared auth sync runtime. Create one per process.
pub struct AuthSyncCore {
    api: Arc<dyn AuthApi>,
    reconciler: Arc<Reconciler>,
    reader: AuthStatusReader,
    bus: InvalidationBus,
    hints: Arc<dyn HintStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    home_route: String,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AuthSyncCore {
    /// Build a core around an API client. Call [`AuthSyncCore::start`] from
    /// inside a tokio runtime to begin reconciling.
    pub fn new(
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        hints: Arc<dyn HintStore>,
        config: &Config,
    ) -> Self {
        let (writer, reader) = cell::channel();
        let reconciler = Reconciler::new(
            api.clone(),
            writer,
            RetryPolicy::from(&config.reconcile),
            hints.clone(),
        );

        Self {
            api,
            reconciler: Arc::new(reconciler),
            reader,
            bus: InvalidationBus::new(),
            hints,
            navigator,
            login_route: config.login_route.clone(),
            home_route: config.home_route.clone(),
            worker: Mutex::new(None),
        }
    }

    /// Start the invalidation worker and schedule the first probe.
    /// Calling it again is a no-op.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        *worker = Some(spawn_worker(self.bus.subscribe(), self.reconciler.clone()));
        drop(worker);

        info!("Auth sync started");
        self.bus.emit(InvalidationReason::Startup);
    }

    /// Current status.
    pub fn get_status(&self) -> AuthStatus {
        self.reader.status()
    }

    /// True when the last reconciliation ran out of retries.
    pub fn is_indeterminate(&self) -> bool {
        self.reader.is_indeterminate()
    }

    /// A read-only handle that can await changes.
    pub fn reader(&self) -> AuthStatusReader {
        self.reader.clone()
    }

    /// Call `on_change` after every status change.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, on_change: StatusCallback) -> Subscription {
        self.reader.subscribe(on_change)
    }

    /// The bus, for hosts that forward their own focus/navigation events.
    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// Schedule a reconciliation. Returns immediately.
    pub fn trigger_reconcile(&self, reason: InvalidationReason) {
        self.bus.emit(reason);
    }

    /// Reconcile now and wait for the outcome.
    pub async fn reconcile(&self, reason: InvalidationReason) -> ReconcileOutcome {
        self.reconciler.reconcile(reason).await
    }

    /// Last persisted hint. Only for optimistic rendering.
    pub fn hint(&self) -> Option<AuthHint> {
        match self.hints.load() {
            Ok(hint) => hint,
            Err(err) => {
                warn!(error = %err, "Failed to read auth hint");
                None
            }
        }
    }

    /// A fresh guard for a protected view.
    pub fn guard(&self) -> AuthGuard {
        AuthGuard::new(self.login_route.clone())
    }

    pub fn nav_view(&self) -> NavView {
        NavView::from_status(&self.get_status(), self.hint().as_ref())
    }

    pub fn profile_view(&self) -> ProfileView {
        ProfileView::from_status(&self.get_status())
    }

    /// Log in. On success the returned user is shown right away, then
    /// confirmed by a probe, and the host is sent home.
    pub async fn login(&self, credentials: Credentials) -> ActionResult<Profile> {
        if credentials.id.trim().is_empty() || credentials.password.is_empty() {
            return Err(ActionError::InvalidInput(
                "Please enter your ID and password.".to_string(),
            ));
        }

        let user = self
            .api
            .login(&credentials)
            .await
            .map_err(|err| ActionError::from_api(err, LOGIN_REJECTED))?;

        info!(user_id = user.id, "Login succeeded");
        self.reconciler.seed_optimistic(user.clone());
        self.bus.emit(InvalidationReason::LoginSuccess);
        self.navigator.navigate(&self.home_route);
        Ok(user)
    }

    /// Log out. Always ends `Unauthenticated` on the login route; a failed
    /// server call is only logged.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            warn!(error = %err, "Logout request failed, signing out locally");
        }

        self.reconciler.force_signed_out().await;
        self.bus.emit(InvalidationReason::Logout);
        self.navigator.navigate(&self.login_route);
    }

    /// Create an account. Does not sign in.
    pub async fn signup(&self, request: SignupRequest) -> ActionResult<()> {
        if request.id.trim().is_empty()
            || request.password.is_empty()
            || request.nickname.trim().is_empty()
        {
            return Err(ActionError::InvalidInput(
                "Please fill in ID, password and nickname.".to_string(),
            ));
        }

        let accepted = self
            .api
            .signup(&request)
            .await
            .map_err(|err| ActionError::from_api(err, SIGNUP_REJECTED))?;

        if !accepted {
            return Err(ActionError::Rejected(SIGNUP_REJECTED.to_string()));
        }
        info!(id = %request.id, "Signup succeeded");
        Ok(())
    }

    /// Edit the signed-in profile. The fresh profile reaches the status
    /// through the reconciler.
    pub async fn update_profile(&self, update: ProfileUpdate) -> ActionResult<Profile> {
        if update.is_empty() {
            return Err(ActionError::InvalidInput("Nothing to update.".to_string()));
        }
        if !self.get_status().is_authenticated() {
            return Err(ActionError::InvalidInput(
                "Sign in to edit your profile.".to_string(),
            ));
        }

        match self.api.update_profile(&update).await {
            Ok(profile) => {
                info!(user_id = profile.id, "Profile updated");
                self.bus.emit(InvalidationReason::ProfileUpdated);
                Ok(profile)
            }
            Err(err) if err.is_unauthorized() => {
                warn!("Profile update rejected after refresh, asking for reconciliation");
                self.bus.emit(InvalidationReason::SessionRejected);
                Err(ActionError::from_api(err, SESSION_EXPIRED))
            }
            Err(err) => Err(ActionError::from_api(err, SESSION_EXPIRED)),
        }
    }
}

impl Drop for AuthSyncCore {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
    }
}
