use thiserror::Error;

/// Failures produced by the session manager.
///
/// `Clone` so a single renewal outcome can be handed to every caller that
/// joined the same in-flight refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No refresh token stored")]
    NoRefreshToken,

    #[error("Malformed access token: {0}")]
    DecodeFailure(String),

    #[error("Token renewal failed: {0}")]
    RenewalFailure(String),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Unauthorized request to {path}")]
    Unauthorized { path: String },

    #[error("Token storage error: {0}")]
    StorageFailure(String),
}

impl SessionError {
    /// Localized text for display next to a login or registration form.
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::AuthFailure(_) => "Usuario o contraseña incorrectos",
            SessionError::Unauthorized { .. }
            | SessionError::NoRefreshToken
            | SessionError::RenewalFailure(_) => {
                "Tu sesión ha expirado. Inicia sesión nuevamente"
            }
            SessionError::DecodeFailure(_) => "Credenciales inválidas recibidas del servidor",
            SessionError::TransportFailure(_) => "No se pudo conectar con el servidor",
            SessionError::StorageFailure(_) => "No se pudo guardar la sesión",
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SessionError::AuthFailure(_))
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::TransportFailure(err.to_string())
    }
}

/// Failures surfaced to views by the resource API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to parse response body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Session(SessionError::Unauthorized { .. }) => Some(401),
            _ => None,
        }
    }
}
