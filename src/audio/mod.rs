//! Audio plumbing
//!
//! The analyser is always available; device I/O, resampling and voice
//! activity detection are only built with the `native-speech` feature.

pub mod analyser;
#[cfg(feature = "native-speech")]
pub mod input;
#[cfg(feature = "native-speech")]
pub mod output;
#[cfg(feature = "native-speech")]
pub mod resampler;
pub mod segmenter;
#[cfg(feature = "native-speech")]
pub mod vad;

pub use analyser::AudioAnalyser;
#[cfg(feature = "native-speech")]
pub use input::AudioInput;
#[cfg(feature = "native-speech")]
pub use output::{AudioOutput, PlaybackQueue};
#[cfg(feature = "native-speech")]
pub use resampler::AudioResampler;
pub use segmenter::{SegmenterConfig, UtteranceSegmenter};
#[cfg(feature = "native-speech")]
pub use vad::VoiceActivityDetector;

/// Sample rate expected by the recognizer and the voice activity detector
pub const RECOGNIZER_SAMPLE_RATE: u32 = 16000;
