use crate::config::SessionSettings;
use crate::error::SessionError;
use crate::models::auth::RegistrationResponse;
use crate::models::{
    ApiRequest, LoginRequest, RefreshRequest, RefreshResponse, RegistrationRequest, TokenPair,
};
use crate::services::api_client::ApiClient;
use crate::services::endpoints::{REGISTER, TOKEN_OBTAIN, TOKEN_REFRESH};
use crate::session::claims::{self, Claims};
use crate::session::clock::Clock;
use crate::session::navigator::Navigator;
use crate::session::single_flight::SingleFlight;
use crate::session::state::SessionState;
use crate::session::storage::TokenStore;
use chrono::Duration;
use reqwest::StatusCode;
use secrecy::Secret;
use std::sync::Arc;
use tokio::sync::watch;

/// Identity of the one renewal flow; all renewals coalesce on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AccessTokenRenewal;

type RenewalOutcome = Result<String, SessionError>;

/// Attaches credentials to backend calls and keeps the access token fresh.
///
/// Built once at startup and shared by reference (usually behind an `Arc`).
pub struct SessionManager {
    api: Arc<ApiClient>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    renewals: SingleFlight<AccessTokenRenewal, RenewalOutcome>,
    state: Arc<watch::Sender<SessionState>>,
    expiry_margin: Duration,
    login_route: String,
}

impl SessionManager {
    pub fn new(
        api: Arc<ApiClient>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
        settings: &SessionSettings,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);

        Self {
            api,
            store,
            clock,
            navigator,
            renewals: SingleFlight::new(),
            state: Arc::new(state),
            expiry_margin: settings.expiry_margin().unwrap_or_else(|| {
                tracing::warn!(
                    expiry_margin_secs = settings.expiry_margin_secs,
                    "Invalid expiry margin, using default"
                );
                Duration::seconds(claims::SAFETY_MARGIN_SECS)
            }),
            login_route: settings.login_route.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn claims(&self) -> Option<Claims> {
        self.state.borrow().claims().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Watch session transitions, e.g. to re-render on logout.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_renewing(&self) -> bool {
        self.renewals.is_in_flight(&AccessTokenRenewal)
    }

    /// Resolve the stored tokens into a definite session state.
    pub async fn bootstrap_session(&self) -> SessionState {
        let Some(access) = self.store.access_token() else {
            tracing::debug!("No stored access token");
            return self.become_anonymous();
        };

        match claims::decode_claims(&access) {
            Ok(claims) if !claims::is_expiring(&claims, self.clock.now(), Duration::zero()) => {
                tracing::info!(user_id = %claims.user_id, "Restored stored session");
                return self.become_authenticated(claims);
            }
            Ok(_) => tracing::info!("Stored access token expired, renewing"),
            Err(e) => tracing::warn!(error = %e, "Stored access token unreadable, renewing"),
        }

        match self.renew_access_token().await {
            Ok(access) => match claims::decode_claims(&access) {
                Ok(claims) => self.become_authenticated(claims),
                Err(e) => {
                    tracing::warn!(error = %e, "Renewed access token unreadable");
                    self.clear_credentials()
                }
            },
            Err(e) => {
                tracing::info!(error = %e, "Could not restore session");
                self.clear_credentials()
            }
        }
    }

    /// Exchange credentials for a token pair and start a session.
    ///
    /// On failure nothing is stored and any prior session is left as it was.
    pub async fn login(&self, username: &str, password: Secret<String>) -> Result<Claims, SessionError> {
        let body = LoginRequest {
            username: username.to_string(),
            password,
        };

        let response = self.api.post_json(TOKEN_OBTAIN, &body).await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(username = %username, status = status.as_u16(), "Login rejected");
            return Err(SessionError::AuthFailure(failure_detail(status, &detail)));
        }

        let pair: TokenPair = response
            .json()
            .await
            .map_err(|e| SessionError::AuthFailure(format!("unexpected login response: {}", e)))?;

        let claims = self.adopt_pair(&pair)?;
        tracing::info!(user_id = %claims.user_id, username = %username, "User logged in successfully");
        Ok(claims)
    }

    /// Create an account; the new user ends up logged in.
    pub async fn register(&self, request: RegistrationRequest) -> Result<Claims, SessionError> {
        let response = self.api.post_json(REGISTER, &request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(username = %request.username, status = status.as_u16(), "Registration rejected");
            return Err(SessionError::AuthFailure(failure_detail(status, &detail)));
        }

        let created: RegistrationResponse = response.json().await.map_err(|e| {
            SessionError::AuthFailure(format!("unexpected registration response: {}", e))
        })?;

        match created.into_pair() {
            Some(pair) => {
                let claims = self.adopt_pair(&pair)?;
                tracing::info!(user_id = %claims.user_id, "User registered and logged in");
                Ok(claims)
            }
            None => {
                tracing::info!(username = %request.username, "User registered, logging in");
                self.login(&request.username, request.password).await
            }
        }
    }

    /// Forget both tokens and the decoded session. Never fails.
    pub fn logout(&self) {
        self.clear_credentials();
        tracing::info!("User logged out");
    }

    /// Renew the access token with the stored refresh token.
    ///
    /// Concurrent callers share a single backend call and its outcome.
    pub async fn renew_access_token(&self) -> Result<String, SessionError> {
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);

        self.renewals
            .run(AccessTokenRenewal, move || async move {
                let Some(refresh) = store.refresh_token() else {
                    return Err(SessionError::NoRefreshToken);
                };

                tracing::debug!("Renewing access token");
                let response = api
                    .post_json(TOKEN_REFRESH, &RefreshRequest { refresh: &refresh })
                    .await
                    .map_err(|e| SessionError::RenewalFailure(e.to_string()))?;

                if !response.status().is_success() {
                    let status = response.status();
                    tracing::warn!(status = status.as_u16(), "Refresh token rejected");
                    return Err(SessionError::RenewalFailure(format!(
                        "refresh endpoint returned {}",
                        status
                    )));
                }

                let renewed: RefreshResponse = response
                    .json()
                    .await
                    .map_err(|e| SessionError::RenewalFailure(e.to_string()))?;

                store.store_access(&renewed.access)?;

                if let Ok(claims) = claims::decode_claims(&renewed.access) {
                    state.send_if_modified(|current| match current {
                        SessionState::Authenticated(existing) if *existing == claims => false,
                        _ => {
                            *current = SessionState::Authenticated(claims);
                            true
                        }
                    });
                }

                tracing::info!("Access token renewed");
                Ok(renewed.access)
            })
            .await
    }

    /// Fill in the bearer credential for an outbound request.
    ///
    /// A token that is expired, unreadable, or inside the safety margin is
    /// renewed first. If renewal fails the credentials are dropped and the
    /// request goes out anonymously.
    pub async fn attach_credentials(&self, mut request: ApiRequest) -> ApiRequest {
        if request.is_refresh_endpoint() {
            return request;
        }

        let Some(access) = self.store.access_token() else {
            request.set_bearer(None);
            return request;
        };

        if !claims::needs_renewal(&access, self.clock.now(), self.expiry_margin) {
            request.set_bearer(Some(access));
            return request;
        }

        match self.renew_access_token().await {
            Ok(renewed) => request.set_bearer(Some(renewed)),
            Err(e) => {
                tracing::warn!(path = %request.path, error = %e, "Token renewal failed, sending without credentials");
                self.clear_credentials();
                request.set_bearer(None);
            }
        }

        request
    }

    /// React to the outcome of a credentialed request.
    ///
    /// A 401 from a protected endpoint is answered once with a renewal and a
    /// re-issue of the same request. If renewal fails, or the re-issued
    /// request is rejected again, the session is torn down and the client is
    /// sent to the login route.
    pub async fn handle_response(
        &self,
        mut request: ApiRequest,
        outcome: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response, SessionError> {
        let response = outcome?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if request.is_auth_endpoint() {
            return Err(SessionError::Unauthorized { path: request.path });
        }

        if request.is_retried() {
            tracing::warn!(path = %request.path, "Request rejected after retry");
            return Err(self.tear_down(request.path));
        }

        request.mark_retried();

        match self.renew_access_token().await {
            Ok(renewed) => {
                tracing::debug!(path = %request.path, "Retrying request with renewed token");
                request.set_bearer(Some(renewed));
                let retried = self.api.send(&request).await?;

                if retried.status() == StatusCode::UNAUTHORIZED {
                    tracing::warn!(path = %request.path, "Renewed token rejected");
                    return Err(self.tear_down(request.path));
                }
                Ok(retried)
            }
            Err(e) => {
                tracing::warn!(path = %request.path, error = %e, "Token renewal failed after 401");
                Err(self.tear_down(request.path))
            }
        }
    }

    /// Send a protected request with credentials and 401 recovery.
    pub async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, SessionError> {
        let request = self.attach_credentials(request).await;
        let outcome = self.api.send(&request).await;
        self.handle_response(request, outcome).await
    }

    fn adopt_pair(&self, pair: &TokenPair) -> Result<Claims, SessionError> {
        let claims = claims::decode_claims(&pair.access)?;
        self.store.store_pair(&pair.access, &pair.refresh)?;
        self.become_authenticated(claims.clone());
        Ok(claims)
    }

    /// Drop the session and send the client to the login route.
    fn tear_down(&self, path: String) -> SessionError {
        self.clear_credentials();
        self.navigator.navigate(&self.login_route);
        SessionError::Unauthorized { path }
    }

    fn clear_credentials(&self) -> SessionState {
        self.store.clear();
        self.become_anonymous()
    }

    fn become_authenticated(&self, claims: Claims) -> SessionState {
        let state = SessionState::Authenticated(claims);
        self.state.send_replace(state.clone());
        state
    }

    fn become_anonymous(&self) -> SessionState {
        self.state.send_replace(SessionState::Anonymous);
        SessionState::Anonymous
    }
}

fn failure_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string())
}
