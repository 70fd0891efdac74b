use thiserror::Error;
use tracing::{debug, warn};

use super::audio::condition;
use super::tags::parse_emotion_tags;
use super::transcriber::LazyModel;
use crate::config::SpeechConfig;
use crate::emotion::{Classification, EmotionClassifier, EmotionResult, Modality};

/// Errors that can occur during speech emotion detection
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    #[error("Failed to resample audio: {0}")]
    ResampleError(String),

    #[error("Failed to encode audio: {0}")]
    EncodeError(String),

    #[error("Audio too short: {duration_secs:.2}s (min: {min_secs:.2}s)")]
    TooShort { duration_secs: f32, min_secs: f32 },

    #[error("Audio is silent: rms {rms:.4} (min: {min_rms:.4})")]
    Silence { rms: f32, min_rms: f32 },

    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Model returned no transcription")]
    EmptyResult,
}

/// Speech emotion classifier over the four-label speech set
pub struct SpeechClassifier {
    model: LazyModel,
    concerning_threshold: f32,
    sample_rate: u32,
    min_duration_secs: f32,
    silence_rms: f32,
    backend: String,
}

impl SpeechClassifier {
    pub fn new(model: LazyModel, config: &SpeechConfig) -> Self {
        Self {
            model,
            concerning_threshold: config.concerning_threshold,
            sample_rate: config.sample_rate,
            min_duration_secs: config.min_duration_secs,
            silence_rms: config.silence_rms,
            backend: config.backend.clone(),
        }
    }

    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    /// Condition, gate, transcribe and score. Errors here become a degraded classification.
    pub fn analyze(&self, audio_bytes: &[u8]) -> Result<EmotionResult, SpeechError> {
        let audio = condition(audio_bytes, self.sample_rate)?;

        let duration_secs = audio.duration_secs();
        if duration_secs < self.min_duration_secs {
            return Err(SpeechError::TooShort {
                duration_secs,
                min_secs: self.min_duration_secs,
            });
        }

        let rms = audio.rms();
        if rms < self.silence_rms {
            return Err(SpeechError::Silence {
                rms,
                min_rms: self.silence_rms,
            });
        }

        let model = self.model.get()?;
        let transcripts = model.transcribe(&audio.samples, audio.sample_rate)?;
        let text = transcripts.first().ok_or(SpeechError::EmptyResult)?;

        debug!("Transcript ({:.2}s): {:?}", duration_secs, text);

        Ok(self.result_from_transcript(text))
    }

    /// Parse emotion tags and apply the concerning rule
    pub fn result_from_transcript(&self, text: &str) -> EmotionResult {
        let emotions = parse_emotion_tags(text);
        let dominant = emotions.argmax().to_string();
        let is_concerning = emotions.get("angry") > self.concerning_threshold;

        EmotionResult {
            emotions,
            dominant,
            is_concerning,
        }
    }
}

impl EmotionClassifier for SpeechClassifier {
    fn classify(&self, bytes: &[u8]) -> Classification {
        match self.analyze(bytes) {
            Ok(result) => {
                debug!(
                    "Speech emotion: {} (angry {:.2}, concerning: {})",
                    result.dominant,
                    result.angry(),
                    result.is_concerning
                );
                Classification::Detected(result)
            }
            Err(e) => {
                warn!("Speech analysis degraded to neutral: {}", e);
                Classification::degraded(Modality::Speech, e.to_string())
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }
}
