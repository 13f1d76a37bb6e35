//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use authsync_api::{
    ApiError, ApiResult, AuthApi, Credentials, Profile, ProfileUpdate, SignupRequest,
};
use authsync_config::Config;
use authsync_core::{AuthStatus, AuthSyncCore, HintStore, MemoryHintStore, Navigator};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub fn profile(username: &str) -> Profile {
    let created = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
    Profile {
        id: 42,
        username: username.to_string(),
        nickname: None,
        bio: None,
        avatar_url: None,
        email: None,
        created_at: created,
        updated_at: created,
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    Profile(Profile),
    Unauthorized,
    Timeout,
    ServerError,
}

impl Answer {
    fn into_result(self) -> ApiResult<Profile> {
        match self {
            Answer::Profile(profile) => Ok(profile),
            Answer::Unauthorized => Err(ApiError::Unauthorized(String::new())),
            Answer::Timeout => Err(ApiError::Timeout),
            Answer::ServerError => Err(ApiError::Server {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
        }
    }
}

/// A remote API whose answers are scripted per call.
pub struct ScriptedApi {
    probes: Mutex<VecDeque<Answer>>,
    fallback: Mutex<Answer>,
    login: Mutex<Answer>,
    logout_fails: Mutex<bool>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    probe_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            probes: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Answer::Unauthorized),
            login: Mutex::new(Answer::Profile(profile("alice"))),
            logout_fails: Mutex::new(false),
            gate: Mutex::new(None),
            probe_calls: AtomicUsize::new(0),
        })
    }

    pub fn then(&self, answer: Answer) -> &Self {
        self.probes.lock().push_back(answer);
        self
    }

    pub fn otherwise(&self, answer: Answer) {
        *self.fallback.lock() = answer;
    }

    pub fn login_answers(&self, answer: Answer) {
        *self.login.lock() = answer;
    }

    pub fn fail_logout(&self) {
        *self.logout_fails.lock() = true;
    }

    pub fn gate_probes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for ScriptedApi {
    async fn login(&self, _credentials: &Credentials) -> ApiResult<Profile> {
        self.login.lock().clone().into_result()
    }

    async fn logout(&self) -> ApiResult<()> {
        if *self.logout_fails.lock() {
            return Err(ApiError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    async fn fetch_profile(&self) -> ApiResult<Profile> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let next = self.probes.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().clone())
            .into_result()
    }

    async fn refresh(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn signup(&self, _request: &SignupRequest) -> ApiResult<bool> {
        Ok(true)
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> ApiResult<Profile> {
        self.login.lock().clone().into_result()
    }
}

/// Navigator that remembers where it was sent.
#[derive(Default)]
pub struct Browser {
    history: Mutex<Vec<String>>,
}

impl Browser {
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Navigator for Browser {
    fn navigate(&self, path: &str) {
        self.history.lock().push(path.to_string());
    }
}

pub struct App {
    pub core: AuthSyncCore,
    pub api: Arc<ScriptedApi>,
    pub browser: Arc<Browser>,
}

pub fn app_with_hints(hints: Arc<dyn HintStore>) -> App {
    let api = ScriptedApi::new();
    let browser = Arc::new(Browser::default());
    let core = AuthSyncCore::new(api.clone(), browser.clone(), hints, &Config::default());
    App { core, api, browser }
}

pub fn app() -> App {
    app_with_hints(Arc::new(MemoryHintStore::new()))
}

/// Wait until the status satisfies `predicate`.
pub async fn wait_for_status(core: &AuthSyncCore, predicate: impl Fn(&AuthStatus) -> bool) -> AuthStatus {
    let mut reader = core.reader();
    loop {
        let status = reader.status();
        if predicate(&status) {
            return status;
        }
        if !reader.changed().await {
            return reader.status();
        }
    }
}
