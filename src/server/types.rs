//! Request validation errors and response bodies for the analysis API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::emotion::{round_to, Classification, EmotionDistribution};
use crate::fusion::{FusionOutcome, Verdict};

/// Decimal places used for every score in the diagnostic payload
const DIAGNOSTIC_PLACES: u32 = 3;

/// Errors returned by `POST /analyze`
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Missing required part: {0}")]
    MissingPart(&'static str),

    #[error("Invalid content type for {part}: {content_type}. Expected {expected}.")]
    InvalidContentType {
        part: &'static str,
        content_type: String,
        expected: &'static str,
    },

    #[error("Frame file is empty.")]
    EmptyFrame,

    #[error("Audio file is empty.")]
    EmptyAudio,

    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Facial emotion analysis failed")]
    FacialFailed,

    #[error("Speech emotion analysis failed")]
    SpeechFailed,

    #[error("Score fusion failed")]
    FusionFailed,
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::FacialFailed | Self::SpeechFailed | Self::FusionFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Analysis request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Per-modality section of the diagnostic payload
#[derive(Debug, Clone, Serialize)]
pub struct ModalityReport {
    pub emotions: EmotionDistribution,
    pub dominant: String,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&Classification> for ModalityReport {
    fn from(classification: &Classification) -> Self {
        let result = classification.result();
        Self {
            emotions: result.emotions.rounded(DIAGNOSTIC_PLACES),
            dominant: result.dominant.clone(),
            degraded: classification.is_degraded(),
            reason: classification.reason().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticPayload {
    pub facial: ModalityReport,
    pub speech: ModalityReport,
    pub fused_score: f32,
    pub escalated: bool,
}

impl DiagnosticPayload {
    pub fn new(facial: &Classification, speech: &Classification, outcome: &FusionOutcome) -> Self {
        Self {
            facial: facial.into(),
            speech: speech.into(),
            fused_score: round_to(outcome.fused_score, DIAGNOSTIC_PLACES),
            escalated: outcome.escalated,
        }
    }
}

/// Body of a successful `POST /analyze`
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DiagnosticPayload>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models_loaded: bool,
    pub facial_backend: String,
    pub speech_backend: String,
    pub speech_model_loaded: bool,
    pub uptime_seconds: u64,
    pub timestamp: String,
}
