//! Hosted Whisper API transcription

use async_trait::async_trait;
use reqwest::{multipart, Client};
use saywrite_core::{ProviderError, SttConfig, SttProvider, Transcription};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Speech-to-text through the OpenAI Whisper API
pub struct WhisperApiStt {
    client: OnceCell<Client>,
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperApiStt {
    /// Create a new client with an explicit key
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: OnceCell::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            timeout_secs: 60,
        }
    }

    /// Create from config
    ///
    /// The dedicated Whisper key wins; the OpenAI key is used otherwise.
    pub fn from_config(config: &SttConfig, openai_api_key: Option<String>) -> Self {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or(openai_api_key.filter(|k| !k.is_empty()));

        Self {
            client: OnceCell::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::MissingApiKey("Neither WHISPER_API_KEY nor OPENAI_API_KEY".to_string())
        })
    }

    async fn client(&self) -> Result<&Client, ProviderError> {
        self.api_key()?;
        self.client
            .get_or_try_init(|| async {
                let client = crate::http_client(self.timeout_secs)?;
                tracing::info!(model = %self.model, "Whisper API client initialized");
                Ok(client)
            })
            .await
    }
}

fn upload_file_name(audio: &Path) -> String {
    audio
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.wav")
        .to_string()
}

#[async_trait]
impl SttProvider for WhisperApiStt {
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Transcription, ProviderError> {
        let start = Instant::now();
        let client = self.client().await?;
        let api_key = self.api_key()?;

        tracing::info!(
            file = %audio.display(),
            language = ?language,
            "Transcribing audio file with Whisper API"
        );

        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| ProviderError::Audio(format!("Failed to read {}: {e}", audio.display())))?;

        let part = multipart::Part::bytes(bytes).file_name(upload_file_name(audio));
        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            form = form.text("language", language.to_string());
        }

        let response = client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = crate::llm::api_error_message(&body);
            tracing::error!(status = status.as_u16(), error = %message, "Whisper API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let elapsed_ms = crate::elapsed_ms(start);
        tracing::info!(processing_time_ms = elapsed_ms, "Transcription completed");

        Ok(Transcription {
            text: result.text,
            elapsed_ms,
        })
    }

    fn name(&self) -> &str {
        "whisper-api"
    }
}
