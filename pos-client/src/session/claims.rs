use crate::error::SessionError;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default window before `exp` in which an access token is renewed.
pub const SAFETY_MARGIN_SECS: i64 = 30;

/// Backend user identifier; numeric for database-backed users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{}", id),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// Claims view of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Decode JWT claims without validation.
///
/// The client never holds the signing key; the backend validates the
/// signature on every request. Only the payload is read here.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(SessionError::DecodeFailure("invalid JWT format".to_string()));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| SessionError::DecodeFailure(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| SessionError::DecodeFailure(format!("invalid claims: {}", e)))
}

/// True when the token is expired or expires within `margin` of `now`.
pub fn is_expiring(claims: &Claims, now: DateTime<Utc>, margin: Duration) -> bool {
    claims.exp <= (now + margin).timestamp()
}

/// Expiry check on a raw token; an undecodable token counts as expiring.
pub fn needs_renewal(token: &str, now: DateTime<Utc>, margin: Duration) -> bool {
    match decode_claims(token) {
        Ok(claims) => is_expiring(&claims, now, margin),
        Err(e) => {
            tracing::debug!(error = %e, "Stored access token could not be decoded");
            true
        }
    }
}
