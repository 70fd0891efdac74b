use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Facial classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacialConfig {
    /// `angry + disgust` above this marks the face as concerning
    pub concerning_threshold: f32,
    /// Face backend name: "stub" or "onnx"
    pub backend: String,
    /// ONNX model used by the "onnx" backend
    pub model_path: PathBuf,
}

impl Default for FacialConfig {
    fn default() -> Self {
        Self {
            concerning_threshold: 0.40,
            backend: "tensorflow".to_string(),
            model_path: PathBuf::from("./models/emotion-ferplus.onnx"),
        }
    }
}

/// Speech classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// `angry` above this marks the speech as concerning
    pub concerning_threshold: f32,
    /// Transcriber backend: "stub" or "sensevoice-http"
    pub backend: String,
    pub model_path: PathBuf,
    /// SenseVoice server for the "sensevoice-http" backend
    pub server_url: String,
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count after downmixing
    pub channels: u16,
    /// Clips shorter than this (after conditioning) are treated as neutral
    pub min_duration_secs: f32,
    /// Clips with RMS below this are treated as silence
    pub silence_rms: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            concerning_threshold: 0.45,
            backend: "stub".to_string(),
            model_path: PathBuf::from("./models/sensevoice-small"),
            server_url: "http://127.0.0.1:8001".to_string(),
            sample_rate: 16000,
            channels: 1,
            min_duration_secs: 1.0,
            silence_rms: 0.005,
        }
    }
}

/// Score fusion weights and verdict boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub facial_weight: f32,
    pub speech_weight: f32,
    /// Fused scores below this are GREEN
    pub green_threshold: f32,
    /// Fused scores at or above this are RED
    pub red_threshold: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            facial_weight: 0.60,
            speech_weight: 0.40,
            green_threshold: 0.25,
            red_threshold: 0.50,
        }
    }
}

/// Process-wide configuration, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_port: u16,
    pub log_level: String,
    /// Include per-modality diagnostics in /analyze responses
    pub diagnostics: bool,
    pub facial: FacialConfig,
    pub speech: SpeechConfig,
    pub fusion: FusionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            log_level: "INFO".to_string(),
            diagnostics: false,
            facial: FacialConfig::default(),
            speech: SpeechConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl Config {
    /// Default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load config from file, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {:?}", path))
        } else {
            debug!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Load config from file or fall back to defaults, handing back the load
    /// error so the caller can report it once logging is up.
    pub fn load_with_fallback(path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Filter directive for tracing, derived from `log_level`
    pub fn log_filter(&self) -> String {
        match self.log_level.to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    }

    /// Sanity checks on values the verdict logic assumes.
    ///
    /// Returns human-readable warnings; an empty list means the config is sane.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let fusion = &self.fusion;

        if fusion.facial_weight < 0.0 {
            warnings.push(format!("fusion.facial_weight is negative: {}", fusion.facial_weight));
        }
        if fusion.speech_weight < 0.0 {
            warnings.push(format!("fusion.speech_weight is negative: {}", fusion.speech_weight));
        }
        if fusion.green_threshold > fusion.red_threshold {
            warnings.push(format!(
                "fusion.green_threshold ({}) is above fusion.red_threshold ({}); YELLOW is unreachable",
                fusion.green_threshold, fusion.red_threshold
            ));
        }

        let unit = [
            ("facial.concerning_threshold", self.facial.concerning_threshold),
            ("speech.concerning_threshold", self.speech.concerning_threshold),
            ("fusion.green_threshold", fusion.green_threshold),
            ("fusion.red_threshold", fusion.red_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                warnings.push(format!("{} is outside [0, 1]: {}", name, value));
            }
        }

        if self.speech.sample_rate == 0 {
            warnings.push("speech.sample_rate must be positive".to_string());
        }
        if self.speech.channels != 1 {
            warnings.push(format!(
                "speech.channels is {}; audio is always downmixed to mono",
                self.speech.channels
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.log_level, "INFO");
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.facial.concerning_threshold, 0.40);
        assert_eq!(config.facial.backend, "tensorflow");
        assert_eq!(config.speech.concerning_threshold, 0.45);
        assert_eq!(config.speech.model_path, PathBuf::from("./models/sensevoice-small"));
        assert_eq!(config.speech.sample_rate, 16000);
        assert_eq!(config.speech.channels, 1);
        assert_eq!(config.speech.min_duration_secs, 1.0);
        assert_eq!(config.speech.silence_rms, 0.005);
        assert_eq!(config.fusion.facial_weight, 0.60);
        assert_eq!(config.fusion.speech_weight, 0.40);
        assert_eq!(config.fusion.green_threshold, 0.25);
        assert_eq!(config.fusion.red_threshold, 0.50);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = r#"{"server_port": 3000, "facial": {"concerning_threshold": 0.8}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.facial.concerning_threshold, 0.8);
        assert_eq!(config.facial.backend, "tensorflow");
        assert_eq!(config.speech.concerning_threshold, 0.45);
        assert_eq!(config.fusion, FusionConfig::default());
    }

    #[test]
    fn test_override_nested_facial_config() {
        let json = r#"{"facial": {"concerning_threshold": 0.55, "backend": "pytorch"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.facial.concerning_threshold, 0.55);
        assert_eq!(config.facial.backend, "pytorch");
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"log_level": "DEBUG", "fusion": {{"green_threshold": 0.3, "red_threshold": 0.6}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.log_level, "DEBUG");
        assert_eq!(config.fusion.green_threshold, 0.3);
        assert_eq!(config.fusion.red_threshold, 0.6);
        assert_eq!(config.fusion.facial_weight, 0.60);
    }

    #[test]
    fn test_load_invalid_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load(file.path()).is_err());
        assert_eq!(Config::load_with_fallback(file.path()).0, Config::default());
    }

    #[test]
    fn test_fallback_keeps_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server_port": "eighty"}}"#).unwrap();

        let (config, error) = Config::load_with_fallback(file.path());
        assert_eq!(config, Config::default());
        let message = format!("{:#}", error.expect("invalid file must report an error"));
        assert!(message.contains("Failed to parse config file"), "{}", message);
    }

    #[test]
    fn test_fallback_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (config, error) = Config::load_with_fallback(&dir.path().join("absent.json"));
        assert_eq!(config, Config::default());
        assert!(error.is_none());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.server_port = 9000;
        config.speech.backend = "sensevoice-http".to_string();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_log_filter() {
        let mut config = Config::default();
        assert_eq!(config.log_filter(), "info");
        config.log_level = "WARNING".to_string();
        assert_eq!(config.log_filter(), "warn");
        config.log_level = "debug".to_string();
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_inverted_thresholds() {
        let mut config = Config::default();
        config.fusion.green_threshold = 0.6;
        config.fusion.red_threshold = 0.4;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unreachable"));
    }

    #[test]
    fn test_validate_flags_negative_weight_and_channels() {
        let mut config = Config::default();
        config.fusion.speech_weight = -0.1;
        config.speech.channels = 2;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("speech_weight")));
        assert!(warnings.iter().any(|w| w.contains("channels")));
    }
}
