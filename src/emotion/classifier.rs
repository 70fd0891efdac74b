use super::result::{EmotionResult, Modality};

/// Outcome of one classifier call.
///
/// A classifier always yields a result. `Degraded` carries the canonical
/// neutral fallback together with the reason the real analysis was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Detected(EmotionResult),
    Degraded { result: EmotionResult, reason: String },
}

impl Classification {
    /// Neutral fallback for `modality`, tagged with `reason`
    pub fn degraded(modality: Modality, reason: impl Into<String>) -> Self {
        Self::Degraded {
            result: EmotionResult::neutral(modality),
            reason: reason.into(),
        }
    }

    pub fn result(&self) -> &EmotionResult {
        match self {
            Self::Detected(result) => result,
            Self::Degraded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> EmotionResult {
        match self {
            Self::Detected(result) => result,
            Self::Degraded { result, .. } => result,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Detected(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// A single-modality emotion classifier.
///
/// `classify` never fails: any decoding, detection or model problem is
/// reported as [`Classification::Degraded`].
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, bytes: &[u8]) -> Classification;

    /// Whether the underlying model is currently loaded
    fn is_loaded(&self) -> bool {
        true
    }
}
