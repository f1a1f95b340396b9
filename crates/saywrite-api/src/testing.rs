//! Test harness: in-memory state and stub providers
//!
//! Only compiled for tests and with the `test-utils` feature.

use crate::auth::password::PasswordConfig;
use crate::auth::repository::{InMemoryUserRepository, UserRepository};
use crate::state::AppState;
use async_trait::async_trait;
use saywrite_core::{
    AppConfig, Profile, ProviderError, Rewrite, RewriteOptions, RewriteProvider, SttProvider,
    Transcription,
};
use std::path::Path;
use std::sync::Arc;

/// Transcriber that reports the uploaded file's size
pub struct StubStt;

#[async_trait]
impl SttProvider for StubStt {
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Transcription, ProviderError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| ProviderError::Audio(e.to_string()))?;
        Ok(Transcription {
            text: format!(
                "heard {} bytes in {}",
                bytes.len(),
                language.unwrap_or("auto")
            ),
            elapsed_ms: 1,
        })
    }

    fn name(&self) -> &str {
        "stub-stt"
    }
}

/// Rewriter that tags the transcript with the profile's tone
pub struct StubRewriter;

#[async_trait]
impl RewriteProvider for StubRewriter {
    async fn rewrite(
        &self,
        transcript: &str,
        profile: &Profile,
        _options: &RewriteOptions,
    ) -> Result<Rewrite, ProviderError> {
        Ok(Rewrite {
            text: format!("[{}] {}", profile.tone, transcript.trim()),
            elapsed_ms: 2,
        })
    }

    fn name(&self) -> &str {
        "stub-rewriter"
    }
}

/// Configuration with distinct test secrets
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.secret_key = "test-access-secret".to_string();
    config.auth.refresh_secret_key = "test-refresh-secret".to_string();
    config
}

/// In-memory repository with cheap hashing
pub fn test_repository() -> Arc<InMemoryUserRepository> {
    Arc::new(InMemoryUserRepository::new().with_password_config(PasswordConfig::fast()))
}

/// State over the given repository and providers
pub fn state_with(
    users: Arc<dyn UserRepository>,
    stt: Arc<dyn SttProvider>,
    llm: Arc<dyn RewriteProvider>,
) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), users, stt, llm))
}

/// State with a fresh in-memory repository and stub providers
pub fn test_state() -> Arc<AppState> {
    state_with(test_repository(), Arc::new(StubStt), Arc::new(StubRewriter))
}
