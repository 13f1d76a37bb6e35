//! HTTP client for the cookie-session auth API.
//!
//! The session lives in HttpOnly cookies that this process never reads: the
//! reqwest cookie jar stores whatever the server sets and replays it on every
//! request. Logout empties the jar whatever the server answers.

use crate::cookies::SessionJar;
use crate::error::{ApiError, ApiResult};
use crate::types::{Credentials, LoginResponse, Profile, ProfileUpdate, SignupRequest};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";
const PROFILE_PATH: &str = "/auth/profile";
const REFRESH_PATH: &str = "/auth/refresh";
const SIGNUP_PATH: &str = "/auth/signup";

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Operations the sync core needs from the remote API.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`. The server sets the session cookie on success.
    async fn login(&self, credentials: &Credentials) -> ApiResult<Profile>;

    /// `POST /auth/logout`.
    async fn logout(&self) -> ApiResult<()>;

    /// `GET /auth/profile`, the authoritative probe. A 401 here is a plain
    /// "not logged in" answer and never triggers a refresh.
    async fn fetch_profile(&self) -> ApiResult<Profile>;

    /// `POST /auth/refresh`.
    async fn refresh(&self) -> ApiResult<()>;

    /// `POST /auth/signup`.
    async fn signup(&self, request: &SignupRequest) -> ApiResult<bool>;

    /// `PATCH /auth/profile`.
    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<Profile>;
}

/// Whether a 401 on this request should trigger a session refresh.
///
/// Only the profile update and non-auth resources qualify. The probe,
/// login, logout, signup and refresh itself answer authoritatively.
pub fn refresh_eligible(method: &Method, path: &str) -> bool {
    if !path.starts_with("/auth/") {
        return true;
    }
    *method == Method::PATCH && path == PROFILE_PATH
}

#[derive(Debug, Default)]
struct RefreshState {
    /// Bumped after every refresh attempt.
    generation: u64,
    /// Outcome of the most recent attempt.
    last_failed: bool,
}

/// reqwest-backed [`AuthApi`].
pub struct HttpAuthApi {
    http: reqwest::Client,
    cookies: Arc<SessionJar>,
    base_url: String,
    refresh_state: Mutex<RefreshState>,
}

impl HttpAuthApi {
    /// Create a client with its own cookie jar.
    ///
    /// `base_url` is the API origin, e.g. `http://localhost:3001`.
    pub fn new(base_url: &Url, timeout: Duration) -> ApiResult<Self> {
        let cookies = Arc::new(SessionJar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(timeout)
            .build()
            .map_err(ApiError::transport)?;

        Ok(Self {
            http,
            cookies,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            refresh_state: Mutex::new(RefreshState::default()),
        })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, path, "API request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(ApiError::transport)
    }

    /// Send a request, refreshing the session once on a 401 when the
    /// request is eligible.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResult<Response> {
        let seen = self.refresh_state.lock().await.generation;
        let response = self.send_once(&method, path, body.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !refresh_eligible(&method, path) {
            return Ok(response);
        }

        tracing::debug!(%method, path, "Session rejected, refreshing before retry");
        self.refresh_single_flight(seen).await?;
        self.send_once(&method, path, body.as_ref()).await
    }

    /// Run at most one refresh for every request that saw a 401 under the
    /// same generation. Latecomers reuse the outcome.
    async fn refresh_single_flight(&self, seen: u64) -> ApiResult<()> {
        let mut state = self.refresh_state.lock().await;

        if state.generation != seen {
            return if state.last_failed {
                Err(ApiError::Unauthorized("Session expired".to_string()))
            } else {
                Ok(())
            };
        }

        let result = self.refresh().await;
        state.generation = state.generation.wrapping_add(1);
        state.last_failed = result.is_err();

        result.map_err(|err| {
            tracing::warn!(error = %err, "Session refresh failed");
            ApiError::Unauthorized("Session expired".to_string())
        })
    }

    async fn check(response: Response, operation: &str) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body_summary = summarize_response_body(&body);
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(operation, "Unauthorized");
        } else {
            tracing::warn!(operation, status = %status, body_summary = %body_summary, "API request failed");
        }
        Err(ApiError::from_status(status, &body))
    }

    async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> ApiResult<T> {
        let response = Self::check(response, operation).await?;
        response.json::<T>().await.map_err(ApiError::transport)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> ApiResult<Profile> {
        let body = serde_json::to_value(credentials)
            .map_err(|err| ApiError::Validation(err.to_string()))?;
        let response = self.execute(Method::POST, LOGIN_PATH, Some(body)).await?;
        let login: LoginResponse = Self::read_json(response, "login").await?;
        tracing::debug!(user_id = login.user.id, "Login accepted");
        Ok(login.user)
    }

    async fn logout(&self) -> ApiResult<()> {
        let result = match self.execute(Method::POST, LOGOUT_PATH, None).await {
            Ok(response) => Self::check(response, "logout").await.map(|_| ()),
            Err(err) => Err(err),
        };
        self.cookies.clear();
        result
    }

    async fn fetch_profile(&self) -> ApiResult<Profile> {
        let response = self.execute(Method::GET, PROFILE_PATH, None).await?;
        Self::read_json(response, "fetch_profile").await
    }

    async fn refresh(&self) -> ApiResult<()> {
        let response = self.send_once(&Method::POST, REFRESH_PATH, None).await?;
        Self::check(response, "refresh").await?;
        Ok(())
    }

    async fn signup(&self, request: &SignupRequest) -> ApiResult<bool> {
        let body =
            serde_json::to_value(request).map_err(|err| ApiError::Validation(err.to_string()))?;
        let response = self.execute(Method::POST, SIGNUP_PATH, Some(body)).await?;
        Self::read_json(response, "signup").await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<Profile> {
        let body =
            serde_json::to_value(update).map_err(|err| ApiError::Validation(err.to_string()))?;
        let response = self.execute(Method::PATCH, PROFILE_PATH, Some(body)).await?;
        Self::read_json(response, "update_profile").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use axum::extract::State;
    use axum::http::{header, HeaderMap};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SESSION_COOKIE: &str = "session=valid";

    #[derive(Default)]
    struct FakeServer {
        refresh_calls: AtomicUsize,
        profile_calls: AtomicUsize,
        refresh_succeeds: bool,
        profile_status: Option<StatusCode>,
        slow_profile: bool,
        logout_fails: bool,
    }

    fn profile_json(nickname: &str) -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "username": "alice",
            "nickname": nickname,
            "bio": null,
            "profileImageUrl": null,
            "email": null,
            "createdAt": "2025-01-02T03:04:05.000Z",
            "updatedAt": "2025-01-02T03:04:05.000Z"
        })
    }

    fn has_session(headers: &HeaderMap) -> bool {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.contains(SESSION_COOKIE))
    }

    fn unauthorized() -> AxumResponse {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "statusCode": 401, "message": "Unauthorized" })),
        )
            .into_response()
    }

    async fn login(Json(body): Json<serde_json::Value>) -> AxumResponse {
        if body["password"] != "correct-horse" {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "statusCode": 401,
                    "message": "Invalid ID or password",
                    "error": "Unauthorized"
                })),
            )
                .into_response();
        }
        (
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly"))],
            Json(serde_json::json!({
                "access_token": "opaque",
                "refresh_token": "opaque",
                "user": profile_json("Al")
            })),
        )
            .into_response()
    }

    async fn profile(State(server): State<Arc<FakeServer>>, headers: HeaderMap) -> AxumResponse {
        server.profile_calls.fetch_add(1, Ordering::SeqCst);
        if server.slow_profile {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        if let Some(status) = server.profile_status {
            return (status, "upstream trouble").into_response();
        }
        if !has_session(&headers) {
            return unauthorized();
        }
        Json(profile_json("Al")).into_response()
    }

    async fn update_profile(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> AxumResponse {
        if !has_session(&headers) {
            return unauthorized();
        }
        let nickname = body["nickname"].as_str().unwrap_or("Al").to_string();
        Json(profile_json(&nickname)).into_response()
    }

    async fn refresh(State(server): State<Arc<FakeServer>>) -> AxumResponse {
        server.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if !server.refresh_succeeds {
            return unauthorized();
        }
        (
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly"))],
            StatusCode::OK,
        )
            .into_response()
    }

    async fn signup(Json(body): Json<serde_json::Value>) -> AxumResponse {
        if body["id"] == "taken" {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "statusCode": 400,
                    "message": ["id is already taken", "nickname is too short"],
                    "error": "Bad Request"
                })),
            )
                .into_response();
        }
        Json(true).into_response()
    }

    async fn logout(State(server): State<Arc<FakeServer>>) -> AxumResponse {
        if server.logout_fails {
            return (StatusCode::INTERNAL_SERVER_ERROR, "logout unavailable").into_response();
        }
        (
            [(header::SET_COOKIE, "session=; Path=/; Max-Age=0".to_string())],
            StatusCode::OK,
        )
            .into_response()
    }

    async fn start(server: FakeServer) -> (HttpAuthApi, Arc<FakeServer>) {
        let server = Arc::new(server);
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/logout", post(logout))
            .route("/auth/profile", get(profile).patch(update_profile))
            .route("/auth/refresh", post(refresh))
            .route("/auth/signup", post(signup))
            .with_state(server.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let api = HttpAuthApi::new(&base, Duration::from_millis(500)).unwrap();
        (api, server)
    }

    #[test]
    fn test_refresh_eligibility() {
        assert!(refresh_eligible(&Method::PATCH, "/auth/profile"));
        assert!(refresh_eligible(&Method::GET, "/posts/1"));
        assert!(!refresh_eligible(&Method::GET, "/auth/profile"));
        assert!(!refresh_eligible(&Method::POST, "/auth/login"));
        assert!(!refresh_eligible(&Method::POST, "/auth/logout"));
        assert!(!refresh_eligible(&Method::POST, "/auth/refresh"));
        assert!(!refresh_eligible(&Method::POST, "/auth/signup"));
    }

    #[tokio::test]
    async fn test_probe_without_session_is_unauthorized_and_never_refreshes() {
        let (api, server) = start(FakeServer {
            refresh_succeeds: true,
            ..Default::default()
        })
        .await;

        let err = api.fetch_profile().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_cookie_is_replayed_on_probe() {
        let (api, _server) = start(FakeServer::default()).await;

        let user = api
            .login(&Credentials::new("alice", "correct-horse"))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let profile = api.fetch_profile().await.unwrap();
        assert_eq!(profile.id, 7);

        api.logout().await.unwrap();
        let err = api.fetch_profile().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_failed_logout_still_drops_session_cookie() {
        let (api, server) = start(FakeServer {
            logout_fails: true,
            ..Default::default()
        })
        .await;

        api.login(&Credentials::new("alice", "correct-horse"))
            .await
            .unwrap();
        assert!(api.fetch_profile().await.is_ok());

        let err = api.logout().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);

        let err = api.fetch_profile().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(server.profile_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wrong_password_surfaces_server_message() {
        let (api, _server) = start(FakeServer::default()).await;

        let err = api
            .login(&Credentials::new("alice", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), "Invalid ID or password");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let (api, _server) = start(FakeServer {
            profile_status: Some(StatusCode::BAD_GATEWAY),
            ..Default::default()
        })
        .await;

        let err = api.fetch_profile().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let (api, _server) = start(FakeServer {
            slow_profile: true,
            ..Default::default()
        })
        .await;

        let err = api.fetch_profile().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout), "got {err:?}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let api = HttpAuthApi::new(&base, Duration::from_millis(500)).unwrap();
        let err = api.fetch_profile().await.unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_concurrent_updates_share_one_refresh() {
        let (api, server) = start(FakeServer {
            refresh_succeeds: true,
            ..Default::default()
        })
        .await;
        let api = Arc::new(api);

        let first = {
            let api = api.clone();
            tokio::spawn(async move {
                api.update_profile(&ProfileUpdate {
                    nickname: Some("First".into()),
                    ..Default::default()
                })
                .await
            })
        };
        let second = {
            let api = api.clone();
            tokio::spawn(async move {
                api.update_profile(&ProfileUpdate {
                    nickname: Some("Second".into()),
                    ..Default::default()
                })
                .await
            })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.nickname.as_deref(), Some("First"));
        assert_eq!(second.nickname.as_deref(), Some("Second"));
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_yields_unauthorized() {
        let (api, server) = start(FakeServer {
            refresh_succeeds: false,
            ..Default::default()
        })
        .await;

        let err = api
            .update_profile(&ProfileUpdate {
                bio: Some("hi".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_signup_validation_messages_joined() {
        let (api, _server) = start(FakeServer::default()).await;

        let ok = api
            .signup(&SignupRequest {
                id: "newbie".into(),
                password: "pw123456".into(),
                nickname: "New".into(),
                profile_image_url: None,
            })
            .await
            .unwrap();
        assert!(ok);

        let err = api
            .signup(&SignupRequest {
                id: "taken".into(),
                password: "pw123456".into(),
                nickname: "N".into(),
                profile_image_url: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.user_message(),
            "id is already taken, nickname is too short"
        );
    }
}
