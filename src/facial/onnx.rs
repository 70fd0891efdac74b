//! FER+ style facial emotion model on ONNX Runtime.
//!
//! The model takes a 64x64 grayscale face crop and outputs eight logits in
//! FER+ order. The whole frame is treated as the face region.

use image::{imageops::FilterType, DynamicImage};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::backend::{FaceBackend, FaceScores};
use super::classifier::FacialError;

const INPUT_SIZE: u32 = 64;

/// FER+ output order mapped onto the facial label set.
/// Contempt has no facial label of its own and is folded into disgust.
const FERPLUS_LABELS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "disgust",
];

/// Frames smaller than this cannot contain a usable face
const MIN_FRAME_SIDE: u32 = 16;

pub struct OnnxFaceBackend {
    session: Mutex<Session>,
    model_path: PathBuf,
}

impl OnnxFaceBackend {
    pub fn new(model_path: &Path) -> Result<Self, FacialError> {
        if !model_path.exists() {
            return Err(FacialError::ModelLoadError(format!(
                "Model not found at {:?}",
                model_path
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| FacialError::ModelLoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| FacialError::ModelLoadError(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e: ort::Error| FacialError::ModelLoadError(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| FacialError::ModelLoadError(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl FaceBackend for OnnxFaceBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn analyze(&self, image: &DynamicImage) -> Result<Option<FaceScores>, FacialError> {
        if image.width() < MIN_FRAME_SIDE || image.height() < MIN_FRAME_SIDE {
            debug!("Frame {}x{} too small for face analysis", image.width(), image.height());
            return Ok(None);
        }

        let gray = image
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
            .to_luma8();
        let pixels: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32).collect();

        // FER+ expects input shape [batch, channel, height, width]
        let input_shape = [1_usize, 1, INPUT_SIZE as usize, INPUT_SIZE as usize];
        let input_tensor = Value::from_array((input_shape, pixels))
            .map_err(|e: ort::Error| FacialError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| FacialError::InferenceError("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e: ort::Error| FacialError::InferenceError(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| FacialError::InferenceError("No output from model".to_string()))?;

        let output_tensor = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| FacialError::InferenceError(e.to_string()))?;

        let logits: Vec<f32> = output_tensor.1.iter().copied().collect();
        if logits.len() < FERPLUS_LABELS.len() {
            warn!("Unexpected output shape from facial model: {}", logits.len());
            return Err(FacialError::InferenceError(format!(
                "Expected {} logits, got {}",
                FERPLUS_LABELS.len(),
                logits.len()
            )));
        }

        Ok(Some(scores_from_logits(&logits[..FERPLUS_LABELS.len()])))
    }
}

/// Softmax the logits and fold them into percentage scores
fn scores_from_logits(logits: &[f32]) -> FaceScores {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();

    let mut folded: Vec<(String, f32)> = Vec::new();
    for (label, e) in FERPLUS_LABELS.iter().zip(exps.iter()) {
        let pct = e / total * 100.0;
        match folded.iter_mut().find(|(l, _)| l == label) {
            Some((_, score)) => *score += pct,
            None => folded.push((label.to_string(), pct)),
        }
    }

    let dominant = folded
        .iter()
        .fold(None::<&(String, f32)>, |best, entry| match best {
            Some(b) if b.1 >= entry.1 => Some(b),
            _ => Some(entry),
        })
        .map(|(label, _)| label.clone());

    FaceScores {
        emotions: folded,
        dominant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_from_logits_sum_to_100() {
        let scores = scores_from_logits(&[0.1, 0.2, 0.0, -1.0, 3.0, 0.5, 0.0, 0.5]);
        let total: f32 = scores.emotions.iter().map(|(_, s)| s).sum();
        assert!((total - 100.0).abs() < 1e-3);
        assert_eq!(scores.dominant.as_deref(), Some("angry"));
    }

    #[test]
    fn test_contempt_folds_into_disgust() {
        let scores = scores_from_logits(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0]);
        assert_eq!(scores.emotions.len(), 7);
        assert_eq!(scores.dominant.as_deref(), Some("disgust"));
    }

    #[test]
    fn test_missing_model_fails() {
        let result = OnnxFaceBackend::new(Path::new("/nonexistent/model.onnx"));
        assert!(matches!(result, Err(FacialError::ModelLoadError(_))));
    }
}
