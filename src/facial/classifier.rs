use thiserror::Error;
use tracing::{debug, warn};

use super::backend::{FaceBackend, FaceScores};
use crate::emotion::{
    Classification, EmotionClassifier, EmotionDistribution, EmotionResult, Modality, NEUTRAL,
};

/// Errors that can occur during facial emotion detection
#[derive(Debug, Error)]
pub enum FacialError {
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Backend returned no emotion scores")]
    EmptyScores,

    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),
}

/// Facial emotion classifier over the seven-label facial set
pub struct FacialClassifier {
    backend: Box<dyn FaceBackend>,
    concerning_threshold: f32,
}

impl FacialClassifier {
    pub fn new(backend: Box<dyn FaceBackend>, concerning_threshold: f32) -> Self {
        Self {
            backend,
            concerning_threshold,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Decode, detect and score. Errors here become a degraded classification.
    pub fn analyze(&self, image_bytes: &[u8]) -> Result<EmotionResult, FacialError> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| FacialError::DecodeError(e.to_string()))?;

        debug!(
            "Decoded frame {}x{} ({} bytes)",
            image.width(),
            image.height(),
            image_bytes.len()
        );

        let scores = self
            .backend
            .analyze(&image)?
            .ok_or(FacialError::NoFaceDetected)?;

        if scores.emotions.is_empty() {
            return Err(FacialError::EmptyScores);
        }

        Ok(self.result_from_scores(&scores))
    }

    /// Rescale percentage scores to [0, 1] and apply the concerning rule
    pub fn result_from_scores(&self, scores: &FaceScores) -> EmotionResult {
        let emotions = EmotionDistribution::from_pairs(
            Modality::Facial,
            scores
                .emotions
                .iter()
                .map(|(label, pct)| (label.as_str(), pct / 100.0)),
        );

        let is_concerning =
            emotions.get("angry") + emotions.get("disgust") > self.concerning_threshold;

        EmotionResult {
            emotions,
            dominant: scores.dominant.clone().unwrap_or_else(|| NEUTRAL.to_string()),
            is_concerning,
        }
    }
}

impl EmotionClassifier for FacialClassifier {
    fn classify(&self, bytes: &[u8]) -> Classification {
        match self.analyze(bytes) {
            Ok(result) => {
                debug!(
                    "Facial emotion: {} (angry {:.2}, concerning: {})",
                    result.dominant,
                    result.angry(),
                    result.is_concerning
                );
                Classification::Detected(result)
            }
            Err(e) => {
                warn!("Facial analysis degraded to neutral: {}", e);
                Classification::degraded(Modality::Facial, e.to_string())
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.backend.is_ready()
    }
}
