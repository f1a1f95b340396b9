//! whisper.cpp backend for local transcription

use super::local::{ModelLoader, SpeechModel};
use saywrite_core::{ProviderError, SttConfig};
use std::path::PathBuf;
use std::sync::Arc;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Resolve a model setting to a ggml model file
///
/// Bare size names ("base", "small", ...) map to `models/ggml-<name>.bin`;
/// anything containing a path separator or ending in `.bin` is used as is.
pub fn resolve_model_path(model: &str) -> PathBuf {
    if model.ends_with(".bin") || model.contains('/') || model.contains('\\') {
        PathBuf::from(model)
    } else {
        PathBuf::from(format!("models/ggml-{model}.bin"))
    }
}

/// Loads a whisper.cpp model from disk
pub struct WhisperCppLoader {
    model_path: PathBuf,
    compute_type: String,
}

impl WhisperCppLoader {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            model_path: resolve_model_path(&config.model),
            compute_type: config.compute_type.clone(),
        }
    }
}

impl ModelLoader for WhisperCppLoader {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, ProviderError> {
        let path = self
            .model_path
            .to_str()
            .ok_or_else(|| ProviderError::Config("Model path is not valid UTF-8".to_string()))?;

        // Precision is baked into ggml files; the setting is only reported.
        tracing::info!(path, compute_type = %self.compute_type, "Opening whisper.cpp model");

        let mut params = WhisperContextParameters::default();
        params.use_gpu = false;
        let context = WhisperContext::new_with_params(path, params)
            .map_err(|e| ProviderError::Config(format!("Failed to load {path}: {e}")))?;

        Ok(Arc::new(WhisperCppModel { context }))
    }
}

/// A loaded whisper.cpp context
pub struct WhisperCppModel {
    context: WhisperContext,
}

impl SpeechModel for WhisperCppModel {
    fn transcribe(
        &self,
        samples: &[f32],
        language: Option<&str>,
    ) -> Result<Vec<String>, ProviderError> {
        let mut state = self
            .context
            .create_state()
            .map_err(|e| ProviderError::Inference(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: 5,
            patience: -1.0,
        });
        params.set_language(language);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);

        state
            .full(params, samples)
            .map_err(|e| ProviderError::Inference(e.to_string()))?;

        let count = state
            .full_n_segments()
            .map_err(|e| ProviderError::Inference(e.to_string()))?;

        (0..count)
            .map(|i| {
                state
                    .full_get_segment_text(i)
                    .map_err(|e| ProviderError::Inference(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_path() {
        assert_eq!(
            resolve_model_path("base"),
            PathBuf::from("models/ggml-base.bin")
        );
        assert_eq!(
            resolve_model_path("/opt/models/custom.bin"),
            PathBuf::from("/opt/models/custom.bin")
        );
    }
}
