//! Speech-to-text providers
//!
//! Two variants implement [`SttProvider`]:
//! - [`WhisperApiStt`]: uploads audio to the hosted Whisper API
//! - [`LocalWhisperStt`]: runs a local model with voice-activity filtering
//!
//! Author: hephaex@gmail.com

pub mod audio;
pub mod local;
pub mod openai;
#[cfg(feature = "whisper")]
pub mod whisper_cpp;

pub use audio::{load_wav, speech_regions, VadOptions, TARGET_SAMPLE_RATE};
pub use local::{LocalWhisperStt, ModelLoader, SpeechModel};
pub use openai::WhisperApiStt;

use saywrite_core::{AppConfig, SttProvider};
use std::sync::Arc;

/// Create the STT provider selected by configuration
///
/// `provider = "local"` selects on-device inference; any other value selects
/// the hosted API.
pub fn create_stt_provider(config: &AppConfig) -> Arc<dyn SttProvider> {
    if config.stt.is_local() {
        tracing::info!(
            model = %config.stt.model,
            compute_type = %config.stt.compute_type,
            "Using local whisper STT provider"
        );
        Arc::new(LocalWhisperStt::new(
            default_loader(&config.stt),
            config.stt.model.clone(),
        ))
    } else {
        tracing::info!(model = %config.stt.model, "Using Whisper API STT provider");
        Arc::new(WhisperApiStt::from_config(
            &config.stt,
            config.llm.openai_api_key.clone(),
        ))
    }
}

#[cfg(feature = "whisper")]
fn default_loader(config: &saywrite_core::SttConfig) -> Arc<dyn ModelLoader> {
    Arc::new(whisper_cpp::WhisperCppLoader::from_config(config))
}

#[cfg(not(feature = "whisper"))]
fn default_loader(_config: &saywrite_core::SttConfig) -> Arc<dyn ModelLoader> {
    Arc::new(local::UnavailableLoader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_remote_by_default() {
        let config = AppConfig::default();
        let provider = create_stt_provider(&config);
        assert_eq!(provider.name(), "whisper-api");
    }

    #[test]
    fn test_factory_selects_local() {
        let mut config = AppConfig::default();
        config.stt.provider = "local".to_string();
        let provider = create_stt_provider(&config);
        assert_eq!(provider.name(), "local-whisper");
    }

    #[test]
    fn test_factory_unknown_provider_falls_back_to_remote() {
        let mut config = AppConfig::default();
        config.stt.provider = "deepgram".to_string();
        let provider = create_stt_provider(&config);
        assert_eq!(provider.name(), "whisper-api");
    }
}
