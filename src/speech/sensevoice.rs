//! SenseVoice model server client.
//!
//! Posts conditioned audio to an OpenAI-compatible transcription endpoint
//! backed by SenseVoice and returns the raw, tag-bearing transcript. The
//! configured `model_path` is forwarded as the `model` field.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::audio::encode_wav;
use super::classifier::SpeechError;
use super::transcriber::Transcriber;

/// Timeout for one transcription request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the health probe made while loading
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
struct TranscriptEntry {
    #[serde(default)]
    text: String,
}

/// The server may answer with a single object or a list of entries
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TranscriptionResponse {
    Many(Vec<TranscriptEntry>),
    Single(TranscriptEntry),
}

impl TranscriptionResponse {
    fn into_texts(self) -> Vec<String> {
        match self {
            Self::Many(entries) => entries.into_iter().map(|e| e.text).collect(),
            Self::Single(entry) => vec![entry.text],
        }
    }
}

/// Blocking HTTP client for a SenseVoice server
#[derive(Debug)]
pub struct SenseVoiceClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl SenseVoiceClient {
    /// Create a client with URL validation
    pub fn new(base_url: &str, model: &str) -> Result<Self, SpeechError> {
        let cleaned_url = base_url.trim_end_matches('/');

        let parsed = reqwest::Url::parse(cleaned_url).map_err(|e| {
            SpeechError::ModelLoadError(format!("Invalid SenseVoice URL '{}': {}", cleaned_url, e))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SpeechError::ModelLoadError(format!(
                "SenseVoice URL must use http or https scheme, got: {}",
                parsed.scheme()
            )));
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(SpeechError::ModelLoadError(
                "SenseVoice URL must not contain credentials".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SpeechError::ModelLoadError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: cleaned_url.to_string(),
            model: model.to_string(),
        })
    }

    /// Create a client and verify the server answers its health probe
    pub fn connect(base_url: &str, model: &str) -> Result<Self, SpeechError> {
        let client = Self::new(base_url, model)?;
        client.check_health()?;
        info!(
            "SenseVoice server at {} is healthy (model {})",
            client.base_url, client.model
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn check_health(&self) -> Result<(), SpeechError> {
        let url = format!("{}/health", self.base_url);
        debug!("Checking SenseVoice health at {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .map_err(|e| SpeechError::ModelLoadError(format!("Failed to connect to SenseVoice server: {}", e)))?;

        if !response.status().is_success() {
            return Err(SpeechError::ModelLoadError(format!(
                "SenseVoice health check failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn transcriptions_url(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }
}

impl Transcriber for SenseVoiceClient {
    fn name(&self) -> &str {
        "sensevoice-http"
    }

    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<String>, SpeechError> {
        let wav_bytes = encode_wav(samples, sample_rate)?;
        let url = self.transcriptions_url();

        debug!(
            "Transcribing {} samples ({:.2}s) via {}",
            samples.len(),
            samples.len() as f32 / sample_rate as f32,
            url
        );

        let file_part = reqwest::blocking::multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SpeechError::InferenceError(format!("Failed to create file part: {}", e)))?;

        let form = reqwest::blocking::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", "auto")
            .text("response_format", "json");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| SpeechError::InferenceError(format!("Failed to send transcription request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(SpeechError::InferenceError(format!(
                "SenseVoice server returned error: {} - {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .map_err(|e| SpeechError::InferenceError(format!("Failed to parse transcription response: {}", e)))?;

        let texts = parsed.into_texts();
        debug!("Transcription returned {} entries", texts.len());
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let client = SenseVoiceClient::new("http://localhost:8001/", "./models/sensevoice-small").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8001");
        assert_eq!(
            client.transcriptions_url(),
            "http://localhost:8001/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_client_rejects_bad_urls() {
        assert!(SenseVoiceClient::new("not-a-valid-url", "m").is_err());
        assert!(SenseVoiceClient::new("ftp://host/models", "m").is_err());
        assert!(SenseVoiceClient::new("http://user:pw@host", "m").is_err());
    }

    #[test]
    fn test_response_single_object() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text": "<|en|><|ANGRY|>stop"}"#).unwrap();
        assert_eq!(parsed.into_texts(), vec!["<|en|><|ANGRY|>stop".to_string()]);
    }

    #[test]
    fn test_response_list() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"[{"text": "<|HAPPY|>hi"}, {"text": "again"}]"#).unwrap();
        assert_eq!(parsed.into_texts().len(), 2);

        let parsed: TranscriptionResponse = serde_json::from_str("[]").unwrap();
        assert!(parsed.into_texts().is_empty());
    }

    #[test]
    fn test_connect_unreachable_server_fails() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let result = SenseVoiceClient::connect("http://127.0.0.1:9", "m");
        assert!(matches!(result, Err(SpeechError::ModelLoadError(_))));
    }
}
