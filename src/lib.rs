//! Meeting emotion inference server.
//!
//! Classifies one webcam frame and one audio clip, fuses the two anger
//! scores and answers with a GREEN / YELLOW / RED verdict.

pub mod config;
pub mod emotion;
pub mod facial;
pub mod fusion;
pub mod server;
pub mod speech;

pub use config::Config;
pub use emotion::{Classification, EmotionClassifier, EmotionDistribution, EmotionResult, Modality};
pub use fusion::{FusionEngine, FusionOutcome, Verdict};
pub use server::{build_router, serve, AppState};
