//! Speech capabilities
//!
//! This module provides:
//! - The `SpeechPlatform` boundary and its implementations
//! - `SpeechAdapter`, which owns listening/speaking state for the UI
//! - Voice auto-selection and reply cleanup for synthesis

pub mod adapter;
pub mod mock;
#[cfg(feature = "native-speech")]
pub mod native;
pub mod platform;
pub mod text;
pub mod unsupported;
pub mod voices;

// Re-export commonly used types
pub use adapter::{SpeechAdapter, SpeechErrorKind};
pub use mock::{MockSpeech, MockSpeechHandle};
pub use platform::{PlatformEvent, SpeechPlatform, Utterance, UtteranceId, VoiceDescriptor};
pub use text::prepare_for_speech;
pub use unsupported::UnsupportedSpeech;
pub use voices::select_preferred_voice;

use crate::config::SpeechConfig;

/// Open the best available platform, falling back to `UnsupportedSpeech`
pub fn open_platform(config: &SpeechConfig) -> Box<dyn SpeechPlatform> {
    #[cfg(feature = "native-speech")]
    {
        match native::NativeSpeech::open(config) {
            Ok(platform) => Box::new(platform),
            Err(e) => {
                tracing::warn!("Native speech unavailable: {}", e);
                Box::new(UnsupportedSpeech::new(e.to_string()))
            }
        }
    }

    #[cfg(not(feature = "native-speech"))]
    {
        let _ = config;
        Box::new(UnsupportedSpeech::new("built without the native-speech feature"))
    }
}
