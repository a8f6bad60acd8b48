//! Typed access to the protected backend namespaces.
//!
//! Every call goes through [`SessionManager::execute`], so views never deal
//! with tokens. Rejections other than a recovered 401 are returned to the
//! caller as [`ApiError::Rejected`].

use crate::error::ApiError;
use crate::models::ApiRequest;
use crate::services::endpoints::{PRODUCTS, REPORTS, SALES, SETTINGS, SUPPLIERS, USERS};
use crate::session::SessionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Clone)]
pub struct PosApi {
    session: Arc<SessionManager>,
}

impl PosApi {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn products(&self) -> Resource<'_> {
        Resource::new(self, PRODUCTS)
    }

    pub fn suppliers(&self) -> Resource<'_> {
        Resource::new(self, SUPPLIERS)
    }

    pub fn sales(&self) -> Resource<'_> {
        Resource::new(self, SALES)
    }

    pub fn users(&self) -> Resource<'_> {
        Resource::new(self, USERS)
    }

    /// Fetch a named report, e.g. `sales` with a date range.
    pub async fn report<T: DeserializeOwned>(
        &self,
        name: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::get(format!("{}{}/", REPORTS, name.trim_matches('/')));
        for (key, value) in params {
            request = request.with_query(key, value);
        }
        self.fetch(request).await
    }

    pub async fn settings<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.fetch(ApiRequest::get(SETTINGS)).await
    }

    pub async fn update_settings<T, B>(&self, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::put(SETTINGS, to_json(body)?)).await
    }

    /// Run any protected request and decode its JSON body.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))
    }

    /// Run a protected request, returning the raw body of a 2xx response.
    pub async fn send(&self, request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        let path = request.path.clone();
        let response = self.session.execute(request).await?;
        let status = response.status();

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidBody(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(path = %path, status = status.as_u16(), "Backend rejected request");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }
}

/// CRUD over one collection endpoint such as `inventory/products/`.
pub struct Resource<'a> {
    api: &'a PosApi,
    base: &'static str,
}

impl<'a> Resource<'a> {
    fn new(api: &'a PosApi, base: &'static str) -> Self {
        Self { api, base }
    }

    fn item_path(&self, id: impl Display) -> String {
        format!("{}{}/", self.base, id)
    }

    pub async fn list<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.api.fetch(ApiRequest::get(self.base)).await
    }

    pub async fn list_with<T: DeserializeOwned>(
        &self,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::get(self.base);
        for (key, value) in params {
            request = request.with_query(key, value);
        }
        self.api.fetch(request).await
    }

    pub async fn get<T: DeserializeOwned>(&self, id: impl Display) -> Result<T, ApiError> {
        self.api.fetch(ApiRequest::get(self.item_path(id))).await
    }

    pub async fn create<T, B>(&self, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.api
            .fetch(ApiRequest::post(self.base, to_json(body)?))
            .await
    }

    pub async fn update<T, B>(&self, id: impl Display, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.api
            .fetch(ApiRequest::put(self.item_path(id), to_json(body)?))
            .await
    }

    pub async fn partial_update<T, B>(&self, id: impl Display, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.api
            .fetch(ApiRequest::patch(self.item_path(id), to_json(body)?))
            .await
    }

    pub async fn delete(&self, id: impl Display) -> Result<(), ApiError> {
        self.api.send(ApiRequest::delete(self.item_path(id))).await?;
        Ok(())
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}
