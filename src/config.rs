//! Application configuration
//!
//! Provides centralized configuration for the chat backend, the speech
//! platform, the training wizard and the UI. Loaded from TOML; every field
//! has a default so a missing or partial file still yields a usable config.

use crate::{Result, VoxError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable overriding `backend.base_url`
pub const BACKEND_URL_ENV: &str = "VOXCHAT_BACKEND_URL";

/// Complete application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub speech: SpeechConfig,
    pub training: TrainingConfig,
    pub ui: UiConfig,
}

/// Where and how to reach the chat backend
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin of the backend process
    pub base_url: String,
    /// Reserved path prefix under which the backend's routes live
    pub path_prefix: String,
    /// Upper bound for one request, including the whole streamed reply
    pub request_timeout_secs: u64,
    /// Maximum number of earlier messages sent along as context
    pub history_limit: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            path_prefix: "/api".to_string(),
            request_timeout_secs: 60,
            history_limit: 50,
        }
    }
}

impl BackendConfig {
    /// Full URL of the chat endpoint
    pub fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/chat", base)
        } else {
            format!("{}/{}/chat", base, prefix)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A synthetic voice backed by a VITS model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Display name
    pub name: String,
    /// BCP-47 language tag, e.g. "en-US"
    pub lang: String,
    /// Path to the ONNX model file
    pub model: String,
    /// Path to the tokens file
    pub tokens: String,
    /// Optional espeak-ng data directory
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Speaker id for multi-speaker models
    #[serde(default)]
    pub speaker_id: i32,
    /// Whether this is the platform default voice
    #[serde(default)]
    pub default: bool,
}

impl VoiceConfig {
    /// Stable identifier used as the voice URI
    pub fn voice_uri(&self) -> String {
        format!("vits:{}#{}", self.name, self.speaker_id)
    }
}

/// Speech recognition and synthesis settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Path to the Whisper model file
    pub whisper_model: PathBuf,
    /// Language to transcribe (None for auto-detection)
    pub language: Option<String>,
    /// Number of threads for transcription
    pub n_threads: i32,
    /// Speech probability threshold for the voice activity detector
    pub vad_threshold: f32,
    /// Trailing silence that finalizes an utterance
    pub silence_ms: u64,
    /// Utterances longer than this are finalized early
    pub max_utterance_secs: f32,
    /// Utterances shorter than this are discarded as noise
    pub min_utterance_ms: u64,
    /// Available synthetic voices
    pub voices: Vec<VoiceConfig>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            whisper_model: PathBuf::from("models/ggml-base.en.bin"),
            language: Some("en".to_string()),
            n_threads: 4,
            vad_threshold: 0.5,
            silence_ms: 800,
            max_utterance_secs: 30.0,
            min_utterance_ms: 300,
            voices: Vec::new(),
        }
    }
}

/// Voice-training wizard settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Phrases the user reads aloud, in order
    pub prompts: Vec<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            prompts: vec![
                "The quick brown fox jumps over the lazy dog.".to_string(),
                "Please tell me what the weather looks like tomorrow.".to_string(),
                "I would like to start a conversation with you.".to_string(),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: ThemeChoice,
    /// Start directly in the chat phase
    pub skip_training: bool,
}

impl AppConfig {
    /// Default location: `<config dir>/voxchat/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voxchat").join("config.toml"))
    }

    /// Load from an explicit path, or from the default path when present.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Backend URL overridden by {}", BACKEND_URL_ENV);
                config.backend.base_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            VoxError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)
            .map_err(|e| VoxError::ConfigError(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VoxError::ConfigError(e.to_string()))
    }

    /// Set the backend base URL
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.backend.request_timeout_secs = secs;
        self
    }

    /// Start in the chat phase
    pub fn with_skip_training(mut self, skip: bool) -> Self {
        self.ui.skip_training = skip;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(VoxError::ConfigError(format!(
                "backend.base_url must be an http(s) URL, got {:?}",
                self.backend.base_url
            )));
        }

        if self.backend.request_timeout_secs == 0 {
            return Err(VoxError::ConfigError(
                "backend.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.speech.vad_threshold) {
            return Err(VoxError::ConfigError(format!(
                "speech.vad_threshold must be within 0.0..=1.0, got {}",
                self.speech.vad_threshold
            )));
        }

        if !(self.speech.max_utterance_secs.is_finite() && self.speech.max_utterance_secs > 0.0) {
            return Err(VoxError::ConfigError(format!(
                "speech.max_utterance_secs must be positive, got {}",
                self.speech.max_utterance_secs
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for voice in &self.speech.voices {
            if !seen.insert(voice.voice_uri()) {
                return Err(VoxError::ConfigError(format!(
                    "Duplicate voice {:?} (speaker {})",
                    voice.name, voice.speaker_id
                )));
            }
        }

        Ok(())
    }
}
