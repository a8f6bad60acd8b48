use crate::services::endpoints::{AUTH_ENDPOINTS, TOKEN_REFRESH};
use reqwest::Method;
use serde_json::Value;

/// Outbound request description, relative to the configured API base URL.
///
/// The session manager fills in `bearer` and flips `retried` after it has
/// re-issued the request once following a 401.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    bearer: Option<String>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        Self {
            method,
            path: path.as_ref().trim_start_matches('/').to_string(),
            query: Vec::new(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl AsRef<str>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl AsRef<str>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl AsRef<str>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// The refresh call itself must never be credentialed or renewed.
    pub fn is_refresh_endpoint(&self) -> bool {
        self.targets(TOKEN_REFRESH)
    }

    /// Endpoints whose 401 means "bad credentials", not "stale token".
    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_ENDPOINTS.iter().any(|endpoint| self.targets(endpoint))
    }

    /// Compare paths ignoring the trailing slash.
    fn targets(&self, endpoint: &str) -> bool {
        self.path.trim_end_matches('/') == endpoint.trim_end_matches('/')
    }

    pub(crate) fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}
