use crate::config::ApiSettings;
use crate::error::SessionError;
use crate::models::ApiRequest;
use pos_core::observability::TracedClientExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// HTTP transport to the POS backend.
///
/// Knows nothing about sessions: it sends what it is given, attaching the
/// bearer token already recorded on the request.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                SessionError::TransportFailure(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: format!("{}/", settings.base_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send an unauthenticated JSON POST, used for the token endpoints.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = self.url_for(path);
        let request_id = Uuid::new_v4().to_string();

        self.client
            .traced_post(&url)
            .json(body)
            .send_with_request_id(&request_id)
            .await
            .inspect_err(|e| {
                tracing::error!(request_id = %request_id, "Failed to send POST request to {}: {}", url, e);
            })
    }

    /// Send a request built by the session manager.
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, reqwest::Error> {
        let url = self.url_for(&request.path);
        let request_id = Uuid::new_v4().to_string();

        let mut builder = self.client.traced_request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = request.bearer() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send_with_request_id(&request_id).await;

        match &response {
            Ok(res) => tracing::debug!(
                request_id = %request_id,
                method = %request.method,
                path = %request.path,
                status = res.status().as_u16(),
                "Backend responded"
            ),
            Err(e) => tracing::error!(
                request_id = %request_id,
                method = %request.method,
                "Failed to send request to {}: {}",
                url,
                e
            ),
        }

        response
    }
}
