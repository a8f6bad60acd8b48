use crate::AppState;
use crate::config::Settings;
use crate::error::SessionError;
use crate::services::api_client::ApiClient;
use crate::session::{FileTokenStore, Navigator, SessionManager, SystemClock, TokenStore};
use std::sync::Arc;

/// Wire the session manager with durable token storage and the system clock.
pub fn build_state(
    settings: &Settings,
    navigator: Arc<dyn Navigator>,
) -> Result<AppState, SessionError> {
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&settings.session.token_file));
    build_state_with_store(settings, store, navigator)
}

pub fn build_state_with_store(
    settings: &Settings,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
) -> Result<AppState, SessionError> {
    let api = Arc::new(ApiClient::new(&settings.api)?);

    tracing::debug!(base_url = %api.base_url(), "Session manager configured");

    let session = Arc::new(SessionManager::new(
        api,
        store,
        Arc::new(SystemClock),
        navigator,
        &settings.session,
    ));

    Ok(AppState::new(session))
}
