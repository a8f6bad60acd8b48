use crate::session::claims::Claims;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Before `bootstrap_session` has settled.
    #[default]
    Unknown,
    Authenticated(Claims),
    Anonymous,
}

impl SessionState {
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            SessionState::Authenticated(claims) => Some(claims),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}
