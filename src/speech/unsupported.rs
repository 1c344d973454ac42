//! Fallback when no speech platform could be opened

use super::platform::{PlatformEvent, SpeechPlatform, Utterance, VoiceDescriptor};
use crate::audio::AudioAnalyser;
use crate::{Result, VoxError};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Every capture or synthesis call fails with `VoxError::Unsupported`, so
/// the app keeps working as a text chat.
pub struct UnsupportedSpeech {
    reason: String,
    analyser: AudioAnalyser,
    // Held so the receiver never reports a disconnect
    _events_tx: Sender<PlatformEvent>,
    events_rx: Receiver<PlatformEvent>,
}

impl UnsupportedSpeech {
    pub fn new(reason: impl Into<String>) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            reason: reason.into(),
            analyser: AudioAnalyser::default(),
            _events_tx: events_tx,
            events_rx,
        }
    }
}

impl SpeechPlatform for UnsupportedSpeech {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        Vec::new()
    }

    fn start_capture(&mut self) -> Result<()> {
        Err(VoxError::Unsupported(format!(
            "speech recognition is unavailable ({})",
            self.reason
        )))
    }

    fn stop_capture(&mut self) {}

    fn speak(&mut self, _utterance: Utterance) -> Result<()> {
        Err(VoxError::Unsupported(format!(
            "speech synthesis is unavailable ({})",
            self.reason
        )))
    }

    fn cancel_speech(&mut self) {}

    fn analyser(&self) -> AudioAnalyser {
        self.analyser.clone()
    }

    fn events(&self) -> Receiver<PlatformEvent> {
        self.events_rx.clone()
    }
}
