//! SayWrite Providers - STT and LLM backends
//!
//! Implements the provider traits from `saywrite-core`:
//! - Hosted Whisper API transcription
//! - Local model transcription with voice-activity filtering
//! - OpenAI chat-completion rewriting
//!
//! Provider selection is a pure function of configuration; see
//! [`create_stt_provider`] and [`create_rewrite_provider`].
//!
//! Author: hephaex@gmail.com

pub mod llm;
pub mod stt;

pub use llm::{build_system_prompt, build_user_prompt, create_rewrite_provider, OpenAiRewriter};
pub use stt::{create_stt_provider, LocalWhisperStt, WhisperApiStt};

use std::time::Instant;

/// Milliseconds elapsed since `start`
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Build the shared HTTP client with a bounded timeout
pub(crate) fn http_client(
    timeout_secs: u64,
) -> Result<reqwest::Client, saywrite_core::ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| saywrite_core::ProviderError::Config(format!("HTTP client: {e}")))
}
