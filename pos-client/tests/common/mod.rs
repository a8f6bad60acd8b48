//! Shared fixtures for session manager integration tests.

#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use pos_client::config::{ApiSettings, SessionSettings};
use pos_client::error::SessionError;
use pos_client::services::api_client::ApiClient;
use pos_client::session::{Clock, MemoryTokenStore, Navigator, SessionManager, TokenStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

/// Fixed "now" for every test: 2023-11-14T22:13:20Z.
pub const NOW: i64 = 1_700_000_000;

pub const LOGIN_ROUTE: &str = "/login";

/// Unsigned JWT with the given subject and expiry.
pub fn token(user_id: i64, exp: i64) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = serde_json::json!({
        "token_type": "access",
        "user_id": user_id,
        "role": "cashier",
        "exp": exp,
    });
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.sig", header, payload)
}

/// Token valid for an hour after `NOW`.
pub fn fresh_token(user_id: i64) -> String {
    token(user_id, NOW + 3600)
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(ts: i64) -> Self {
        Self {
            now: Mutex::new(DateTime::from_timestamp(ts, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

/// Session manager wired to a mock backend and in-memory token storage.
pub struct TestSession {
    pub server: MockServer,
    pub store: Arc<MemoryTokenStore>,
    pub clock: Arc<FixedClock>,
    pub navigator: Arc<RecordingNavigator>,
    pub manager: Arc<SessionManager>,
}

impl TestSession {
    pub async fn start() -> Self {
        Self::with_tokens(None, None).await
    }

    pub async fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let server = MockServer::start().await;
        let base_url = format!("{}/api/", server.uri());
        Self::build(server, base_url, access, refresh)
    }

    /// Backend URL that refuses connections.
    pub async fn unreachable(access: Option<&str>, refresh: Option<&str>) -> Self {
        let server = MockServer::start().await;
        Self::build(server, "http://127.0.0.1:9/api/".to_string(), access, refresh)
    }

    fn build(
        server: MockServer,
        base_url: String,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Self {
        let store = Arc::new(MemoryTokenStore::with_tokens(access, refresh));
        let clock = Arc::new(FixedClock::at(NOW));
        let navigator = Arc::new(RecordingNavigator::default());

        let manager = build_manager(
            base_url,
            store.clone() as Arc<dyn TokenStore>,
            clock.clone() as Arc<dyn Clock>,
            navigator.clone() as Arc<dyn Navigator>,
        );

        Self {
            server,
            store,
            clock,
            navigator,
            manager,
        }
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

fn build_manager(
    base_url: String,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
) -> Arc<SessionManager> {
    let api = Arc::new(
        ApiClient::new(&ApiSettings {
            base_url,
            timeout_secs: 5,
        })
        .expect("Failed to build API client"),
    );

    let settings = SessionSettings {
        token_file: PathBuf::from("unused.json"),
        expiry_margin_secs: 30,
        login_route: LOGIN_ROUTE.to_string(),
    };

    Arc::new(SessionManager::new(api, store, clock, navigator, &settings))
}

/// Token store that can be read and cleared but rejects every write.
pub struct ReadOnlyTokenStore {
    inner: MemoryTokenStore,
}

impl ReadOnlyTokenStore {
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            inner: MemoryTokenStore::with_tokens(access, refresh),
        }
    }
}

impl TokenStore for ReadOnlyTokenStore {
    fn access_token(&self) -> Option<String> {
        self.inner.access_token()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.refresh_token()
    }

    fn store_pair(&self, _access: &str, _refresh: &str) -> Result<(), SessionError> {
        Err(SessionError::StorageFailure("read-only file system".to_string()))
    }

    fn store_access(&self, _access: &str) -> Result<(), SessionError> {
        Err(SessionError::StorageFailure("read-only file system".to_string()))
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// Session manager whose token storage rejects writes.
pub struct ReadOnlySession {
    pub server: MockServer,
    pub store: Arc<ReadOnlyTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub manager: Arc<SessionManager>,
}

impl ReadOnlySession {
    pub async fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(ReadOnlyTokenStore::with_tokens(access, refresh));
        let navigator = Arc::new(RecordingNavigator::default());

        let manager = build_manager(
            format!("{}/api/", server.uri()),
            store.clone() as Arc<dyn TokenStore>,
            Arc::new(FixedClock::at(NOW)),
            navigator.clone() as Arc<dyn Navigator>,
        );

        Self {
            server,
            store,
            navigator,
            manager,
        }
    }
}
