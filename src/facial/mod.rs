//! Facial emotion recognition.
//!
//! A [`FacialClassifier`] decodes a JPEG frame, hands it to a [`FaceBackend`]
//! and normalizes the backend's percentage scores into the seven-label
//! facial distribution. Any failure degrades to the neutral fallback.

mod backend;
mod classifier;
#[cfg(feature = "onnx")]
mod onnx;

pub use backend::{FaceBackend, FaceScores, StubFaceBackend};
pub use classifier::{FacialClassifier, FacialError};
#[cfg(feature = "onnx")]
pub use onnx::OnnxFaceBackend;

use tracing::{error, info, warn};

use crate::config::FacialConfig;

/// Build the backend named by `config.backend`.
///
/// Unknown names and backends that fail to load fall back to the stub.
pub fn backend_from_config(config: &FacialConfig) -> Box<dyn FaceBackend> {
    match config.backend.to_lowercase().as_str() {
        "stub" => Box::new(StubFaceBackend),
        "onnx" => load_onnx_backend(config),
        other => {
            warn!(
                "Facial backend '{}' is not available in this build, using stub backend",
                other
            );
            Box::new(StubFaceBackend)
        }
    }
}

#[cfg(feature = "onnx")]
fn load_onnx_backend(config: &FacialConfig) -> Box<dyn FaceBackend> {
    match OnnxFaceBackend::new(&config.model_path) {
        Ok(backend) => {
            info!("Facial ONNX backend loaded from {:?}", config.model_path);
            Box::new(backend)
        }
        Err(e) => {
            error!("Failed to load facial ONNX backend: {}. Using stub backend", e);
            Box::new(StubFaceBackend)
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn load_onnx_backend(config: &FacialConfig) -> Box<dyn FaceBackend> {
    error!(
        "Facial backend 'onnx' requested for {:?} but the onnx feature is not enabled. Using stub backend",
        config.model_path
    );
    info!("Rebuild with `--features onnx` to enable ONNX facial inference");
    Box::new(StubFaceBackend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_backend_selected() {
        let config = FacialConfig {
            backend: "stub".to_string(),
            ..FacialConfig::default()
        };
        assert_eq!(backend_from_config(&config).name(), "stub");
    }

    #[test]
    fn test_unknown_backend_falls_back_to_stub() {
        let config = FacialConfig::default();
        assert_eq!(config.backend, "tensorflow");
        assert_eq!(backend_from_config(&config).name(), "stub");
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_without_feature_falls_back_to_stub() {
        let config = FacialConfig {
            backend: "onnx".to_string(),
            ..FacialConfig::default()
        };
        assert_eq!(backend_from_config(&config).name(), "stub");
    }
}
