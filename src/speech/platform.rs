//! The boundary to whatever recognizes and synthesizes speech

use crate::audio::AudioAnalyser;
use crate::{Result, VoxError};
use crossbeam_channel::Receiver;

/// Identifies one synthesized utterance
pub type UtteranceId = u64;

/// A voice offered by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceDescriptor {
    /// Unique, stable identifier
    pub voice_uri: String,
    pub name: String,
    /// BCP-47 language tag, e.g. "en-US"
    pub lang: String,
    /// Platform default voice
    pub default: bool,
}

impl VoiceDescriptor {
    pub fn new(
        voice_uri: impl Into<String>,
        name: impl Into<String>,
        lang: impl Into<String>,
        default: bool,
    ) -> Self {
        Self {
            voice_uri: voice_uri.into(),
            name: name.into(),
            lang: lang.into(),
            default,
        }
    }

    /// "Name (lang)" label for pickers
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.lang)
    }
}

/// Text to speak with a given voice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// `None` uses the platform default voice
    pub voice_uri: Option<String>,
}

/// Notifications from the platform, drained on the UI thread
#[derive(Clone, Debug)]
pub enum PlatformEvent {
    /// Recognized text. `segment` numbers increase over the platform's
    /// lifetime; a final result closes its segment.
    Transcript {
        segment: u64,
        text: String,
        is_final: bool,
    },
    /// Capture stopped without being asked to
    CaptureEnded,
    /// Capture failed; capture is no longer running
    CaptureFailed(VoxError),
    /// One utterance could not be recognized; capture keeps running
    RecognitionFailed(VoxError),
    UtteranceStarted(UtteranceId),
    /// Playback of the utterance finished
    UtteranceEnded(UtteranceId),
    /// Synthesis or playback of the utterance failed
    UtteranceFailed { id: UtteranceId, error: VoxError },
    /// The voice list changed; call `voices()` again
    VoicesChanged,
}

/// Speech-to-text, text-to-speech, voice enumeration and an amplitude feed.
///
/// Calls happen on the UI thread; results arrive asynchronously through
/// `events()`.
pub trait SpeechPlatform {
    fn voices(&self) -> Vec<VoiceDescriptor>;

    /// Begin continuous recognition
    fn start_capture(&mut self) -> Result<()>;

    /// Stop recognition. Must not emit `CaptureEnded`.
    fn stop_capture(&mut self);

    /// Begin speaking; completion is reported with `UtteranceEnded`
    fn speak(&mut self, utterance: Utterance) -> Result<()>;

    /// Silence the current utterance, if any
    fn cancel_speech(&mut self);

    fn analyser(&self) -> AudioAnalyser;

    fn events(&self) -> Receiver<PlatformEvent>;
}
