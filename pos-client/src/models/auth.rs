use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize, Serializer};

fn expose<S: Serializer>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Body of `POST token/`.
#[derive(Serialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: Secret<String>,
}

/// Token pair issued on login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST token/refresh/`.
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Body of `POST auth/registro/`.
#[derive(Serialize)]
pub struct RegistrationRequest {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: Secret<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Registration may or may not log the new user in directly.
#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl RegistrationResponse {
    pub(crate) fn into_pair(self) -> Option<TokenPair> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair { access, refresh }),
            _ => None,
        }
    }
}
