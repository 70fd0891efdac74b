//! HTTP surface of the inference server.
//!
//! ## Endpoints
//!
//! - `POST /analyze` - multipart upload with a `frame` (JPEG) and an `audio`
//!   (WAV) part. Returns `{"verdict": "GREEN" | "YELLOW" | "RED"}`, plus a
//!   `debug` object when diagnostics are enabled.
//! - `GET /health` - process status and model availability.
//!
//! Validation failures answer 422 with `{"detail": ...}`. A classifier or
//! fusion task that panics answers 500 naming the failed stage.

mod app;
mod handlers;
mod types;

pub use app::{build_router, serve, AppState, MAX_BODY_BYTES};
pub use types::{AnalyzeError, AnalyzeResponse, DiagnosticPayload, HealthResponse, ModalityReport};
