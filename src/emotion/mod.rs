//! Shared emotion data contract.
//!
//! Both classifiers produce an [`EmotionResult`] over a fixed per-modality
//! label set. The fusion engine consumes one result per modality.

mod classifier;
mod result;

pub use classifier::{Classification, EmotionClassifier};
pub use result::{
    round_to, EmotionDistribution, EmotionResult, Modality, FACIAL_LABELS, NEUTRAL, SPEECH_LABELS,
};
