//! Scripted in-memory API double for unit tests.

use crate::guard::Navigator;
use async_trait::async_trait;
use authsync_api::{
    ApiError, ApiResult, AuthApi, Credentials, Profile, ProfileUpdate, SignupRequest,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub(crate) fn profile(username: &str) -> Profile {
    let created = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    Profile {
        id: 1,
        username: username.to_string(),
        nickname: None,
        bio: None,
        avatar_url: None,
        email: None,
        created_at: created,
        updated_at: created,
    }
}

/// One scripted answer. `ApiError` is not `Clone`, so scripts hold this instead.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Profile(Profile),
    Unauthorized,
    Transient,
    Validation(&'static str),
}

impl Reply {
    fn into_result(self) -> ApiResult<Profile> {
        match self {
            Reply::Profile(profile) => Ok(profile),
            Reply::Unauthorized => Err(ApiError::Unauthorized(String::new())),
            Reply::Transient => Err(ApiError::Timeout),
            Reply::Validation(message) => Err(ApiError::Validation(message.to_string())),
        }
    }

    fn into_unit(self) -> ApiResult<()> {
        self.into_result().map(|_| ())
    }
}

pub(crate) struct MockApi {
    probes: Mutex<VecDeque<Reply>>,
    probe_fallback: Mutex<Reply>,
    login_reply: Mutex<Reply>,
    logout_reply: Mutex<Reply>,
    update_reply: Mutex<Reply>,
    signup_reply: Mutex<Result<bool, &'static str>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    pub probe_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
}

impl MockApi {
    /// Every probe answers 401 unless scripted otherwise.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            probes: Mutex::new(VecDeque::new()),
            probe_fallback: Mutex::new(Reply::Unauthorized),
            login_reply: Mutex::new(Reply::Profile(profile("alice"))),
            logout_reply: Mutex::new(Reply::Profile(profile("alice"))),
            update_reply: Mutex::new(Reply::Profile(profile("alice"))),
            signup_reply: Mutex::new(Ok(true)),
            gate: Mutex::new(None),
            probe_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            signup_calls: AtomicUsize::new(0),
        })
    }

    /// Queue answers for the next probes, in order.
    pub(crate) fn script_probes(&self, replies: impl IntoIterator<Item = Reply>) {
        self.probes.lock().extend(replies);
    }

    /// Answer for probes once the script is exhausted.
    pub(crate) fn set_probe_fallback(&self, reply: Reply) {
        *self.probe_fallback.lock() = reply;
    }

    pub(crate) fn set_login_reply(&self, reply: Reply) {
        *self.login_reply.lock() = reply;
    }

    pub(crate) fn set_logout_reply(&self, reply: Reply) {
        *self.logout_reply.lock() = reply;
    }

    pub(crate) fn set_update_reply(&self, reply: Reply) {
        *self.update_reply.lock() = reply;
    }

    /// `Err(message)` answers as a server-side validation failure.
    pub(crate) fn set_signup_reply(&self, reply: Result<bool, &'static str>) {
        *self.signup_reply.lock() = reply;
    }

    /// Make every probe wait for a permit on the returned gate.
    pub(crate) fn hold_probes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub(crate) fn probes(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for MockApi {
    async fn login(&self, _credentials: &Credentials) -> ApiResult<Profile> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_reply.lock().clone().into_result()
    }

    async fn logout(&self) -> ApiResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_reply.lock().clone().into_unit()
    }

    async fn fetch_profile(&self) -> ApiResult<Profile> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let scripted = self.probes.lock().pop_front();
        scripted
            .unwrap_or_else(|| self.probe_fallback.lock().clone())
            .into_result()
    }

    async fn refresh(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn signup(&self, _request: &SignupRequest) -> ApiResult<bool> {
        self.signup_calls.fetch_add(1, Ordering::SeqCst);
        let reply = *self.signup_reply.lock();
        reply.map_err(|message| ApiError::Validation(message.to_string()))
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> ApiResult<Profile> {
        self.update_reply.lock().clone().into_result()
    }
}

/// Records every navigation.
#[derive(Default)]
pub(crate) struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().push(path.to_string());
    }
}
