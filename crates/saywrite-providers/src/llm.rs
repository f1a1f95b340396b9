//! Rewrite provider implementations
//!
//! Provides the OpenAI chat-completion rewriter and the system prompt
//! builder that turns a [`Profile`] into instructions.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use reqwest::Client;
use saywrite_core::{LlmConfig, Profile, ProviderError, Rewrite, RewriteOptions, RewriteProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

// ============================================================================
// Prompt construction
// ============================================================================

/// Build the system instruction for a profile
///
/// Lines appear in a fixed order: persona, tone, constraints, format,
/// audience, glossary, word limit. Optional sections are skipped when unset
/// or empty.
pub fn build_system_prompt(profile: &Profile) -> String {
    let mut lines = vec![
        format!(
            "You are an expert writer who rewrites text in the tone of {}.",
            profile.name
        ),
        format!("Tone: {}", profile.tone),
    ];

    if !profile.constraints.is_empty() {
        lines.push("Constraints:".to_string());
        lines.extend(profile.constraints.iter().map(|c| format!("- {c}")));
    }

    if let Some(format) = profile.format.as_deref().filter(|f| !f.is_empty()) {
        lines.push(format!("Format: {format}"));
    }

    if let Some(audience) = profile.audience.as_deref().filter(|a| !a.is_empty()) {
        lines.push(format!("Target audience: {audience}"));
    }

    if let Some(glossary) = profile.glossary.as_ref().filter(|g| !g.is_empty()) {
        lines.push("Glossary terms to include:".to_string());
        lines.extend(
            glossary
                .iter()
                .map(|(term, definition)| format!("- {term}: {definition}")),
        );
    }

    if let Some(max_words) = profile.max_words.filter(|n| *n > 0) {
        lines.push(format!("Keep the response under {max_words} words."));
    }

    lines.join("\n")
}

/// Build the user message wrapping the transcript
pub fn build_user_prompt(transcript: &str) -> String {
    format!(
        "Please rewrite the following transcript in the specified tone and style:\n\n{transcript}"
    )
}

// ============================================================================
// OpenAI Rewriter
// ============================================================================

/// OpenAI chat-completion rewriter
///
/// The HTTP client is built on first use; a missing API key is reported then,
/// not at construction, so the server can start without one.
pub struct OpenAiRewriter {
    client: OnceCell<Client>,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extract a readable message from an OpenAI-style error body
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl OpenAiRewriter {
    /// Create a new rewriter
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: OnceCell::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: OnceCell::new(),
            api_key: config.openai_api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model used for completions
    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingApiKey("OPENAI_API_KEY".to_string()))
    }

    async fn client(&self) -> Result<&Client, ProviderError> {
        self.api_key()?;
        self.client
            .get_or_try_init(|| async {
                let client = crate::http_client(self.timeout_secs)?;
                tracing::info!(model = %self.model, "OpenAI client initialized");
                Ok(client)
            })
            .await
    }
}

#[async_trait]
impl RewriteProvider for OpenAiRewriter {
    async fn rewrite(
        &self,
        transcript: &str,
        profile: &Profile,
        options: &RewriteOptions,
    ) -> Result<Rewrite, ProviderError> {
        let start = Instant::now();
        let client = self.client().await?;
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(profile),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(transcript),
                },
            ],
            temperature: options.temperature,
            max_tokens: self.max_tokens,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        tracing::info!(
            model = %self.model,
            temperature = options.temperature,
            profile_id = %profile.id,
            profile_name = %profile.name,
            "Sending rewrite request to OpenAI"
        );

        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(&body);
            tracing::error!(status = status.as_u16(), error = %message, "OpenAI API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| ProviderError::InvalidResponse("No response generated".to_string()))?;

        let elapsed_ms = crate::elapsed_ms(start);
        tracing::info!(
            processing_time_ms = elapsed_ms,
            model = %self.model,
            tokens_used = ?result.usage.map(|u| u.total_tokens),
            "Rewrite completed"
        );

        Ok(Rewrite { text, elapsed_ms })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create the rewrite provider from config
pub fn create_rewrite_provider(config: &LlmConfig) -> Arc<dyn RewriteProvider> {
    tracing::info!(model = %config.model, "Using OpenAI LLM provider");
    Arc::new(OpenAiRewriter::from_config(config))
}

// ============================================================================
// Tests
// ============================================================================
