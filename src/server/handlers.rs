//! Route handlers for `/analyze` and `/health`.

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use super::app::AppState;
use super::types::{AnalyzeError, AnalyzeResponse, DiagnosticPayload, HealthResponse};

const FRAME_PART: &str = "frame";
const AUDIO_PART: &str = "audio";

const FRAME_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg"];
const AUDIO_CONTENT_TYPES: &[&str] = &["audio/wav", "audio/x-wav", "audio/wave"];

/// One uploaded file part
#[derive(Debug, Clone)]
struct UploadedPart {
    content_type: Option<String>,
    data: Bytes,
}

/// Media type without parameters, lower-cased
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn check_content_type(
    part: &'static str,
    uploaded: &UploadedPart,
    allowed: &[&str],
    expected: &'static str,
) -> Result<(), AnalyzeError> {
    let declared = uploaded.content_type.as_deref();
    let accepted = declared
        .map(|ct| allowed.contains(&media_type(ct).as_str()))
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(AnalyzeError::InvalidContentType {
            part,
            content_type: declared.unwrap_or("none").to_string(),
            expected,
        })
    }
}

fn multipart_error(e: MultipartError) -> AnalyzeError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AnalyzeError::PayloadTooLarge
    } else {
        AnalyzeError::MalformedMultipart(e.body_text())
    }
}

/// Read the `frame` and `audio` parts; other parts are skipped
async fn read_parts(
    mut multipart: Multipart,
) -> Result<(Option<UploadedPart>, Option<UploadedPart>), AnalyzeError> {
    let mut frame = None;
    let mut audio = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            FRAME_PART if frame.is_none() => &mut frame,
            AUDIO_PART if audio.is_none() => &mut audio,
            _ => {
                debug!("Ignoring multipart field '{}'", name);
                continue;
            }
        };

        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        *slot = Some(UploadedPart { content_type, data });
    }

    Ok((frame, audio))
}

/// Validate both parts: frame type, audio type, frame empty, audio empty
fn validate_parts(
    frame: Option<UploadedPart>,
    audio: Option<UploadedPart>,
) -> Result<(Bytes, Bytes), AnalyzeError> {
    let frame = frame.ok_or(AnalyzeError::MissingPart(FRAME_PART))?;
    let audio = audio.ok_or(AnalyzeError::MissingPart(AUDIO_PART))?;

    check_content_type(FRAME_PART, &frame, FRAME_CONTENT_TYPES, "image/jpeg")?;
    check_content_type(AUDIO_PART, &audio, AUDIO_CONTENT_TYPES, "audio/wav")?;

    if frame.data.is_empty() {
        return Err(AnalyzeError::EmptyFrame);
    }
    if audio.data.is_empty() {
        return Err(AnalyzeError::EmptyAudio);
    }

    Ok((frame.data, audio.data))
}

/// `POST /analyze`: classify one frame and one audio clip, return the verdict
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AnalyzeError> {
    let multipart = multipart.map_err(|e| AnalyzeError::MalformedMultipart(e.body_text()))?;
    let (frame, audio) = read_parts(multipart).await?;
    let (frame, audio) = validate_parts(frame, audio)?;

    debug!(
        "Analyzing frame ({} bytes) and audio ({} bytes)",
        frame.len(),
        audio.len()
    );

    let facial = state.facial.clone();
    let speech = state.speech.clone();
    let (facial, speech) = tokio::join!(
        tokio::task::spawn_blocking(move || facial.classify(&frame)),
        tokio::task::spawn_blocking(move || speech.classify(&audio)),
    );
    let facial = facial.map_err(|_| AnalyzeError::FacialFailed)?;
    let speech = speech.map_err(|_| AnalyzeError::SpeechFailed)?;

    let fusion = state.fusion.clone();
    let (facial_result, speech_result) = (facial.result().clone(), speech.result().clone());
    let outcome = tokio::task::spawn_blocking(move || fusion.evaluate(&facial_result, &speech_result))
        .await
        .map_err(|_| AnalyzeError::FusionFailed)?;

    info!(
        "Verdict {} (fused {:.3}, facial {}, speech {}{})",
        outcome.verdict,
        outcome.fused_score,
        facial.result().dominant,
        speech.result().dominant,
        if outcome.escalated { ", escalated" } else { "" }
    );

    let debug = state
        .diagnostics
        .then(|| DiagnosticPayload::new(&facial, &speech, &outcome));

    Ok(Json(AnalyzeResponse {
        verdict: outcome.verdict,
        debug,
    }))
}

/// `GET /health`: process status and model availability
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        models_loaded: state.facial.is_loaded(),
        facial_backend: state.facial_backend.clone(),
        speech_backend: state.speech_backend.clone(),
        speech_model_loaded: state.speech.is_loaded(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
