//! Shared server state

use crate::auth::AuthManager;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionManager;
use idshare_core::config::AuthConfig;
use idshare_core::core_disclosure::DisclosureManager;
use std::sync::Arc;

/// Server state shared across requests
#[derive(Clone)]
pub struct AppState {
    pub manager: DisclosureManager,
    pub auth: Arc<AuthManager>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(manager: DisclosureManager, config: &AuthConfig) -> Self {
        Self {
            auth: Arc::new(AuthManager::new(manager.clone(), config.min_password_length)),
            sessions: Arc::new(SessionManager::new(config.session_ttl)),
            manager,
        }
    }

    /// Run store or hashing work off the async executor
    pub async fn blocking<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(AppState) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(state))
            .await
            .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
    }
}
