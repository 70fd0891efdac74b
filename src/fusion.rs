//! Score fusion and verdict engine.
//!
//! Combines one facial and one speech [`EmotionResult`] into a three-level
//! [`Verdict`]. Pure: no I/O, no shared state, deterministic for a given
//! [`FusionConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::FusionConfig;
use crate::emotion::EmotionResult;

/// Traffic-light verdict, ordered GREEN < YELLOW < RED
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Green,
    Yellow,
    Red,
}

impl Verdict {
    /// One level up, saturating at RED
    pub fn escalate(self) -> Self {
        match self {
            Self::Green => Self::Yellow,
            Self::Yellow | Self::Red => Self::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GREEN" => Ok(Self::Green),
            "YELLOW" => Ok(Self::Yellow),
            "RED" => Ok(Self::Red),
            _ => Err(format!("Unknown verdict: {}", s)),
        }
    }
}

/// Full fusion trace for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOutcome {
    pub verdict: Verdict,
    /// Verdict from the thresholds alone, before escalation
    pub base_verdict: Verdict,
    pub fused_score: f32,
    pub escalated: bool,
}

/// Fusion engine bound to one set of weights and thresholds
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Weighted anger score. Only the `angry` label contributes.
    pub fn fused_score(&self, facial: &EmotionResult, speech: &EmotionResult) -> f32 {
        facial.angry() * self.config.facial_weight + speech.angry() * self.config.speech_weight
    }

    /// Threshold verdict: `[.., green)` GREEN, `[green, red)` YELLOW, `[red, ..]` RED
    pub fn base_verdict(&self, fused_score: f32) -> Verdict {
        if fused_score < self.config.green_threshold {
            Verdict::Green
        } else if fused_score < self.config.red_threshold {
            Verdict::Yellow
        } else {
            Verdict::Red
        }
    }

    pub fn evaluate(&self, facial: &EmotionResult, speech: &EmotionResult) -> FusionOutcome {
        let fused_score = self.fused_score(facial, speech);
        let base_verdict = self.base_verdict(fused_score);

        // Either modality concerning escalates once; both count as one.
        let escalated = facial.is_concerning || speech.is_concerning;
        let verdict = if escalated {
            base_verdict.escalate()
        } else {
            base_verdict
        };

        FusionOutcome {
            verdict,
            base_verdict,
            fused_score,
            escalated,
        }
    }

    pub fn compute_verdict(&self, facial: &EmotionResult, speech: &EmotionResult) -> Verdict {
        self.evaluate(facial, speech).verdict
    }
}
