pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod startup;

use services::resources::PosApi;
use session::SessionManager;
use std::sync::Arc;

/// Shared client state handed to every view.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub api: PosApi,
}

impl AppState {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            api: PosApi::new(Arc::clone(&session)),
            session,
        }
    }
}
