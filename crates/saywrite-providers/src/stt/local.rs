//! Local-inference transcription
//!
//! The model is loaded once, on first use, through a [`ModelLoader`]. Audio is
//! decoded, filtered with voice-activity detection, and each voiced region is
//! transcribed on the blocking thread pool.

use super::audio::{load_wav, speech_regions, VadOptions, TARGET_SAMPLE_RATE};
use async_trait::async_trait;
use saywrite_core::{ProviderError, SttProvider, Transcription};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// A loaded speech model
///
/// Implementations are CPU-bound and are only called from blocking threads.
pub trait SpeechModel: Send + Sync {
    /// Transcribe 16 kHz mono samples into text segments
    fn transcribe(&self, samples: &[f32], language: Option<&str>)
        -> Result<Vec<String>, ProviderError>;
}

/// Loads a [`SpeechModel`]
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, ProviderError>;
}

/// Loader used when no local inference backend is compiled in
pub struct UnavailableLoader;

impl ModelLoader for UnavailableLoader {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, ProviderError> {
        Err(ProviderError::Config(
            "local transcription requires building with the `whisper` feature".to_string(),
        ))
    }
}

/// Join segment texts with single spaces, dropping empty segments
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run VAD over `samples` and transcribe each voiced region
pub fn transcribe_samples(
    model: &dyn SpeechModel,
    samples: &[f32],
    language: Option<&str>,
    vad: &VadOptions,
) -> Result<String, ProviderError> {
    let regions = speech_regions(samples, TARGET_SAMPLE_RATE, vad);
    tracing::debug!(regions = regions.len(), "Voice activity detection done");

    let mut segments = Vec::new();
    for region in regions {
        segments.extend(model.transcribe(&samples[region], language)?);
    }
    Ok(join_segments(&segments))
}

/// Speech-to-text with a locally loaded model
pub struct LocalWhisperStt {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn SpeechModel>>,
    model_name: String,
    vad: VadOptions,
}

impl LocalWhisperStt {
    /// Create a provider that loads its model through `loader` on first use
    pub fn new(loader: Arc<dyn ModelLoader>, model_name: impl Into<String>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            model_name: model_name.into(),
            vad: VadOptions::default(),
        }
    }

    /// Override voice-activity detection settings
    pub fn with_vad(mut self, vad: VadOptions) -> Self {
        self.vad = vad;
        self
    }

    async fn model(&self) -> Result<Arc<dyn SpeechModel>, ProviderError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                tracing::info!(model = %self.model_name, "Loading local whisper model");
                let loader = self.loader.clone();
                let model = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| ProviderError::Inference(format!("Model loader panicked: {e}")))??;
                tracing::info!(model = %self.model_name, "Model loaded successfully");
                Ok::<_, ProviderError>(model)
            })
            .await?;
        Ok(model.clone())
    }
}

#[async_trait]
impl SttProvider for LocalWhisperStt {
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Transcription, ProviderError> {
        let start = Instant::now();
        let model = self.model().await?;

        tracing::info!(file = %audio.display(), language = ?language, "Transcribing audio file");

        let path = audio.to_path_buf();
        let language = language.filter(|l| !l.is_empty()).map(str::to_string);
        let vad = self.vad;
        let text = tokio::task::spawn_blocking(move || {
            let samples = load_wav(&path)?;
            transcribe_samples(model.as_ref(), &samples, language.as_deref(), &vad)
        })
        .await
        .map_err(|e| ProviderError::Inference(format!("Transcription task failed: {e}")))??;

        let elapsed_ms = crate::elapsed_ms(start);
        tracing::info!(processing_time_ms = elapsed_ms, "Transcription completed");

        Ok(Transcription { text, elapsed_ms })
    }

    fn name(&self) -> &str {
        "local-whisper"
    }
}
