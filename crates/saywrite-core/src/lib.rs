//! SayWrite Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout SayWrite:
//! - Rewrite profiles and options supplied by callers
//! - Common error types (service taxonomy and provider failures)
//! - Provider traits for speech-to-text and rewriting backends
//! - Configuration management
//!
//! Author: hephaex@gmail.com

pub mod config;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LlmConfig, LoggingConfig, ServerConfig,
    SttConfig,
};

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Failures raised by STT and LLM providers
///
/// Configuration problems (a missing key, an unusable model) are kept apart
/// from runtime failures of the upstream service so callers can report them
/// differently.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} is not set")]
    MissingApiKey(String),

    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("Request to provider failed: {0}")]
    Request(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Inference error: {0}")]
    Inference(String),
}

impl ProviderError {
    /// True when the failure comes from local configuration rather than the provider
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::MissingApiKey(_) | ProviderError::Config(_))
    }
}

/// Service-level error taxonomy
#[derive(Error, Debug)]
pub enum SayWriteError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SayWriteError>;

// ============================================================================
// Rewrite Models
// ============================================================================

fn default_max_words() -> Option<u32> {
    Some(350)
}

/// Caller-supplied rewrite configuration
///
/// Profiles are request-scoped and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub tone: String,
    pub constraints: Vec<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// Term to definition mapping, kept in the order the caller sent it
    #[serde(default)]
    pub glossary: Option<IndexMap<String, String>>,
    #[serde(default = "default_max_words")]
    pub max_words: Option<u32>,
}

impl Profile {
    /// Create a profile with only the required fields set
    pub fn new(id: impl Into<String>, name: impl Into<String>, tone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tone: tone.into(),
            constraints: Vec::new(),
            format: None,
            audience: None,
            glossary: None,
            max_words: None,
        }
    }
}

/// Provider preference carried in rewrite options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderHint {
    OpenAI,
    Local,
}

fn default_temperature() -> f32 {
    0.5
}

/// Per-request rewrite options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RewriteOptions {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub provider_hint: Option<ProviderHint>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            provider_hint: None,
        }
    }
}

/// Result of a transcription call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub text: String,
    /// Wall-clock time spent by the provider
    pub elapsed_ms: u64,
}

/// Result of a rewrite call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub elapsed_ms: u64,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for speech-to-text providers
#[async_trait::async_trait]
pub trait SttProvider: Send + Sync {
    /// Transcribe the audio file at `audio` with an optional language hint
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> std::result::Result<Transcription, ProviderError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Trait for tone-controlled rewrite providers
#[async_trait::async_trait]
pub trait RewriteProvider: Send + Sync {
    /// Rewrite `transcript` according to `profile`
    async fn rewrite(
        &self,
        transcript: &str,
        profile: &Profile,
        options: &RewriteOptions,
    ) -> std::result::Result<Rewrite, ProviderError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
