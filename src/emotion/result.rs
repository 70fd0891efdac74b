use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Labels produced by the facial classifier, in reporting order.
pub const FACIAL_LABELS: &[&str] = &["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];

/// Labels produced by the speech classifier, in reporting order.
///
/// This order is also the tie-break order for the speech dominant label.
pub const SPEECH_LABELS: &[&str] = &["angry", "happy", "sad", "neutral"];

/// Label that every neutral fallback reports as dominant.
pub const NEUTRAL: &str = "neutral";

/// Input channel of an emotion result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Facial,
    Speech,
}

impl Modality {
    /// Fixed label set for this modality
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Self::Facial => FACIAL_LABELS,
            Self::Speech => SPEECH_LABELS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Facial => "facial",
            Self::Speech => "speech",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label → confidence mapping over a modality's full label set.
///
/// Every label of the set is always present; labels the producer did not
/// report hold 0.0. Scores are not required to sum to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionDistribution {
    modality: Modality,
    scores: Vec<f32>,
}

impl EmotionDistribution {
    /// All-zero distribution
    pub fn zeros(modality: Modality) -> Self {
        Self {
            modality,
            scores: vec![0.0; modality.labels().len()],
        }
    }

    /// Build from (label, score) pairs.
    ///
    /// Labels outside the modality's set are ignored, missing labels default
    /// to 0.0 and scores are clamped into [0, 1]. A later pair for the same
    /// label overwrites an earlier one.
    pub fn from_pairs<'a, I>(modality: Modality, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut dist = Self::zeros(modality);
        for (label, score) in pairs {
            dist.set(label, score);
        }
        dist
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Score for `label`, 0.0 when the label is not part of the set
    pub fn get(&self, label: &str) -> f32 {
        self.index_of(label).map(|i| self.scores[i]).unwrap_or(0.0)
    }

    /// Set the score for a known label. Returns false for unknown labels.
    pub fn set(&mut self, label: &str, score: f32) -> bool {
        match self.index_of(label) {
            Some(i) => {
                self.scores[i] = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
                true
            }
            None => false,
        }
    }

    /// Label with the highest score; the first label in set order wins ties.
    pub fn argmax(&self) -> &'static str {
        let labels = self.modality.labels();
        let mut best = 0;
        for (i, score) in self.scores.iter().enumerate() {
            if *score > self.scores[best] {
                best = i;
            }
        }
        labels[best]
    }

    pub fn sum(&self) -> f32 {
        self.scores.iter().sum()
    }

    /// Iterate (label, score) pairs in set order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.modality
            .labels()
            .iter()
            .copied()
            .zip(self.scores.iter().copied())
    }

    /// Copy with every score rounded to `places` decimal places
    pub fn rounded(&self, places: u32) -> Self {
        Self {
            modality: self.modality,
            scores: self.scores.iter().map(|s| round_to(*s, places)).collect(),
        }
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.modality.labels().iter().position(|l| *l == label)
    }
}

impl Serialize for EmotionDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.scores.len()))?;
        for (label, score) in self.iter() {
            map.serialize_entry(label, &score)?;
        }
        map.end()
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f32, places: u32) -> f32 {
    let factor = 10f64.powi(places as i32);
    ((value as f64 * factor).round() / factor) as f32
}

/// Normalized output of a single-modality classifier
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionResult {
    pub emotions: EmotionDistribution,
    /// Label chosen by the upstream classifier
    pub dominant: String,
    /// Modality-local concerning flag, independent of `dominant`
    pub is_concerning: bool,
}

impl EmotionResult {
    /// Canonical neutral fallback: all zeros, dominant "neutral", not concerning.
    pub fn neutral(modality: Modality) -> Self {
        Self {
            emotions: EmotionDistribution::zeros(modality),
            dominant: NEUTRAL.to_string(),
            is_concerning: false,
        }
    }

    pub fn modality(&self) -> Modality {
        self.emotions.modality()
    }

    /// Anger confidence, the only label fusion reads
    pub fn angry(&self) -> f32 {
        self.emotions.get("angry")
    }

    /// True when this is exactly the canonical neutral fallback
    pub fn is_neutral_fallback(&self) -> bool {
        *self == Self::neutral(self.modality())
    }
}
