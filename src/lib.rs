pub mod audio;
pub mod chat;
pub mod config;
pub mod controller;
pub mod messages;
pub mod speech;
pub mod ui;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VoxError {
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Model load error: {0}")]
    ModelLoadError(String),

    #[error("Speech recognition error: {0}")]
    RecognitionError(String),

    #[error("Speech synthesis error: {0}")]
    SynthesisError(String),

    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Chat backend error: {0}")]
    BackendError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for VoxError {
    fn from(e: std::io::Error) -> Self {
        VoxError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for VoxError {
    fn from(e: reqwest::Error) -> Self {
        VoxError::BackendError(e.to_string())
    }
}

impl VoxError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Hardware/device errors may require user intervention
            VoxError::AudioDeviceError(_) => false,
            VoxError::ModelLoadError(_) => false,
            VoxError::PermissionDenied(_) => false,
            VoxError::Unsupported(_) => false,
            // These are typically transient errors
            VoxError::RecognitionError(_) => true,
            VoxError::SynthesisError(_) => true,
            VoxError::BackendError(_) => true,
            VoxError::Timeout(_) => true,
            VoxError::AudioProcessingError(_) => true,
            VoxError::IOError(_) => false,
            VoxError::ConfigError(_) => false,
            VoxError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoxError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            VoxError::ModelLoadError(_) => {
                "Failed to load a speech model. Please verify model files are present.".to_string()
            }
            VoxError::RecognitionError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            VoxError::SynthesisError(_) => {
                "Text-to-speech failed. The reply is still shown as text.".to_string()
            }
            VoxError::PermissionDenied(_) => {
                "Microphone access was denied. Allow microphone access and try again.".to_string()
            }
            VoxError::Unsupported(_) => {
                "Speech is not supported on this system.".to_string()
            }
            VoxError::BackendError(_) => {
                "The chat service could not be reached. Please try again.".to_string()
            }
            VoxError::Timeout(_) => {
                "The chat service took too long to answer. Please try again.".to_string()
            }
            VoxError::IOError(_) => "File system error occurred.".to_string(),
            VoxError::AudioProcessingError(_) => {
                "Audio processing failed. Please try again.".to_string()
            }
            VoxError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            VoxError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, VoxError>;

/// An error as shown to the user: a plain summary plus the technical detail
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub summary: String,
    pub detail: String,
}

impl From<&VoxError> for ErrorReport {
    fn from(error: &VoxError) -> Self {
        Self {
            summary: error.user_message(),
            detail: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_duration() {
        let err = VoxError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "Request timed out after 60s");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unsupported_is_not_recoverable() {
        let err = VoxError::Unsupported("no recognizer".into());
        assert!(!err.is_recoverable());
        assert!(err.user_message().contains("not supported"));
    }

    #[test]
    fn test_report_pairs_summary_with_detail() {
        let report = ErrorReport::from(&VoxError::BackendError("502 Bad Gateway".into()));
        assert_eq!(report.summary, "The chat service could not be reached. Please try again.");
        assert_eq!(report.detail, "Chat backend error: 502 Bad Gateway");
    }
}
