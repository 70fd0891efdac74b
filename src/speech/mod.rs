//! Speech emotion recognition.
//!
//! A [`SpeechClassifier`] conditions a WAV clip to 16 kHz mono, skips clips
//! that are too short or silent, then reads the emotion tags out of a
//! SenseVoice-style transcript. The transcriber is loaded on first use.

mod audio;
mod classifier;
mod sensevoice;
mod tags;
mod transcriber;

pub use audio::{condition, decode_wav, downmix, encode_wav, resample, rms, ConditionedAudio};
pub use classifier::{SpeechClassifier, SpeechError};
pub use sensevoice::SenseVoiceClient;
pub use tags::{emotion_tags, parse_emotion_tags};
pub use transcriber::{LazyModel, StubTranscriber, Transcriber, TranscriberLoader};

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SpeechConfig;

/// Build the loader for the transcriber named by `config.backend`.
///
/// Nothing is loaded until the returned loader is first called.
pub fn transcriber_loader(config: &SpeechConfig) -> TranscriberLoader {
    match config.backend.to_lowercase().as_str() {
        "stub" => Box::new(|| Ok(Arc::new(StubTranscriber) as Arc<dyn Transcriber>)),
        "sensevoice-http" | "sensevoice" => {
            let server_url = config.server_url.clone();
            let model = config.model_path.to_string_lossy().into_owned();
            Box::new(move || {
                info!("Connecting to SenseVoice server at {}", server_url);
                let client = SenseVoiceClient::connect(&server_url, &model)?;
                Ok(Arc::new(client) as Arc<dyn Transcriber>)
            })
        }
        other => {
            warn!(
                "Speech backend '{}' is not available in this build, using stub transcriber",
                other
            );
            Box::new(|| Ok(Arc::new(StubTranscriber) as Arc<dyn Transcriber>))
        }
    }
}

/// Speech classifier for `config` with a lazily loaded transcriber
pub fn classifier_from_config(config: &SpeechConfig) -> SpeechClassifier {
    SpeechClassifier::new(LazyModel::new(transcriber_loader(config)), config)
}
