//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::jwt::JwtConfig;
use crate::auth::repository::UserRepository;
use crate::auth::service::{AuthService, UserService};
use saywrite_core::config::AppConfig;
use saywrite_core::{RewriteProvider, SttProvider};
use std::sync::Arc;

/// Application state shared across handlers
///
/// Everything here is built once at startup and never swapped.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Login, token, and refresh flows
    pub auth: AuthService,
    /// Speech-to-text backend
    pub stt: Arc<dyn SttProvider>,
    /// Rewrite backend
    pub llm: Arc<dyn RewriteProvider>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        stt: Arc<dyn SttProvider>,
        llm: Arc<dyn RewriteProvider>,
    ) -> Self {
        let jwt_config = JwtConfig::from_auth_config(&config.auth);
        Self {
            auth: AuthService::new(UserService::new(users), jwt_config),
            config,
            stt,
            llm,
        }
    }
}
