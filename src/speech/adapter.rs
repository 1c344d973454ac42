//! Speech state owner
//!
//! `SpeechAdapter` wraps a `SpeechPlatform` and turns its asynchronous
//! events into plain state the UI can read each frame: listening/speaking
//! flags, the interim transcript, the voice list and one error string.
//! Finalized utterances leave through a dedicated channel, once each.

use super::platform::{PlatformEvent, SpeechPlatform, Utterance, UtteranceId, VoiceDescriptor};
use super::text::prepare_for_speech;
use crate::audio::AudioAnalyser;
use crate::{ErrorReport, VoxError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

/// Which kind of operation an error belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechErrorKind {
    Capture,
    Synthesis,
}

#[derive(Clone, Debug)]
struct SpeechError {
    kind: SpeechErrorKind,
    report: ErrorReport,
}

pub struct SpeechAdapter {
    platform: Box<dyn SpeechPlatform>,
    events: Receiver<PlatformEvent>,
    voices: Vec<VoiceDescriptor>,
    is_listening: bool,
    is_speaking: bool,
    current_utterance: Option<UtteranceId>,
    next_utterance_id: UtteranceId,
    interim: String,
    /// Highest segment whose final result was delivered
    last_final_segment: Option<u64>,
    error: Option<SpeechError>,
    speech_end_tx: Sender<String>,
    speech_end_rx: Receiver<String>,
}

impl SpeechAdapter {
    pub fn new(platform: Box<dyn SpeechPlatform>) -> Self {
        let events = platform.events();
        let voices = platform.voices();
        let (speech_end_tx, speech_end_rx) = unbounded();

        info!("Speech adapter ready with {} voices", voices.len());

        Self {
            platform,
            events,
            voices,
            is_listening: false,
            is_speaking: false,
            current_utterance: None,
            next_utterance_id: 1,
            interim: String::new(),
            last_final_segment: None,
            error: None,
            speech_end_tx,
            speech_end_rx,
        }
    }

    /// Start continuous recognition. No-op while already listening.
    pub fn start_listening(&mut self) {
        if self.is_listening {
            return;
        }

        match self.platform.start_capture() {
            Ok(()) => {
                debug!("Listening");
                self.is_listening = true;
                self.interim.clear();
                self.clear_error(SpeechErrorKind::Capture);
            }
            Err(e) => self.set_error(SpeechErrorKind::Capture, e),
        }
    }

    /// Stop recognition. No-op while not listening.
    ///
    /// Finals the platform already queued are still delivered.
    pub fn stop_listening(&mut self) {
        if !self.is_listening {
            return;
        }

        self.poll();
        self.platform.stop_capture();
        self.is_listening = false;
        self.interim.clear();
        debug!("Stopped listening");
    }

    /// Speak `text`, interrupting any current utterance.
    ///
    /// `voice_uri` of `None` uses the platform default voice.
    pub fn speak(&mut self, text: &str, voice_uri: Option<&str>) {
        let text = prepare_for_speech(text);
        if text.is_empty() {
            return;
        }

        if self.current_utterance.is_some() {
            self.cancel_speaking();
        }

        let id = self.next_utterance_id;
        self.next_utterance_id += 1;

        let utterance = Utterance {
            id,
            text,
            voice_uri: voice_uri.map(str::to_string),
        };

        match self.platform.speak(utterance) {
            Ok(()) => {
                debug!("Speaking utterance {}", id);
                self.current_utterance = Some(id);
                self.is_speaking = true;
                self.clear_error(SpeechErrorKind::Synthesis);
            }
            Err(e) => self.set_error(SpeechErrorKind::Synthesis, e),
        }
    }

    /// Silence output. No-op while not speaking.
    pub fn cancel_speaking(&mut self) {
        if let Some(id) = self.current_utterance.take() {
            self.platform.cancel_speech();
            debug!("Cancelled utterance {}", id);
        }
        self.is_speaking = false;
    }

    /// Preview a voice
    pub fn test_speak(&mut self, text: &str, voice_uri: Option<&str>) {
        self.speak(text, voice_uri);
    }

    /// Apply pending platform events. Returns `true` if state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            changed |= self.handle_event(event);
        }
        changed
    }

    fn handle_event(&mut self, event: PlatformEvent) -> bool {
        match event {
            PlatformEvent::Transcript {
                segment,
                text,
                is_final,
            } => {
                if !self.is_listening {
                    debug!("Dropping transcript received while not listening");
                    return false;
                }

                if !is_final {
                    self.interim = text;
                    return true;
                }

                if self.last_final_segment.is_some_and(|last| segment <= last) {
                    debug!("Dropping repeated final for segment {}", segment);
                    return false;
                }
                self.last_final_segment = Some(segment);
                self.interim.clear();

                let text = text.trim();
                if !text.is_empty() {
                    debug!("Final transcript: {}", text);
                    self.clear_error(SpeechErrorKind::Capture);
                    let _ = self.speech_end_tx.send(text.to_string());
                }
                true
            }
            PlatformEvent::CaptureEnded => {
                let was_listening = self.is_listening;
                self.is_listening = false;
                self.interim.clear();
                was_listening
            }
            PlatformEvent::CaptureFailed(error) => {
                self.is_listening = false;
                self.interim.clear();
                self.set_error(SpeechErrorKind::Capture, error);
                true
            }
            PlatformEvent::RecognitionFailed(error) => {
                self.interim.clear();
                self.set_error(SpeechErrorKind::Capture, error);
                true
            }
            PlatformEvent::UtteranceStarted(id) => {
                debug!("Utterance {} audible", id);
                false
            }
            PlatformEvent::UtteranceEnded(id) => {
                if self.current_utterance != Some(id) {
                    debug!("Ignoring end of stale utterance {}", id);
                    return false;
                }
                self.current_utterance = None;
                self.is_speaking = false;
                true
            }
            PlatformEvent::UtteranceFailed { id, error } => {
                if self.current_utterance != Some(id) {
                    debug!("Ignoring failure of stale utterance {}: {}", id, error);
                    return false;
                }
                self.current_utterance = None;
                self.is_speaking = false;
                self.set_error(SpeechErrorKind::Synthesis, error);
                true
            }
            PlatformEvent::VoicesChanged => {
                self.voices = self.platform.voices();
                info!("Voice list changed: {} voices", self.voices.len());
                true
            }
        }
    }

    fn set_error(&mut self, kind: SpeechErrorKind, error: VoxError) {
        warn!("Speech {:?} error: {}", kind, error);
        self.error = Some(SpeechError {
            kind,
            report: ErrorReport::from(&error),
        });
    }

    fn clear_error(&mut self, kind: SpeechErrorKind) {
        if self.error.as_ref().is_some_and(|e| e.kind == kind) {
            self.error = None;
        }
    }

    /// Receiver for finalized utterances
    pub fn speech_end(&self) -> Receiver<String> {
        self.speech_end_rx.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.voices
    }

    pub fn voice(&self, voice_uri: &str) -> Option<&VoiceDescriptor> {
        self.voices.iter().find(|v| v.voice_uri == voice_uri)
    }

    pub fn analyser(&self) -> AudioAnalyser {
        self.platform.analyser()
    }

    pub fn interim_transcript(&self) -> &str {
        &self.interim
    }

    /// Technical description of the current error
    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.report.detail.as_str())
    }

    pub fn error_report(&self) -> Option<&ErrorReport> {
        self.error.as_ref().map(|e| &e.report)
    }

    /// Hide the current error until the next failure
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn error_kind(&self) -> Option<SpeechErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.current_utterance
    }
}

impl Drop for SpeechAdapter {
    fn drop(&mut self) {
        self.stop_listening();
        self.cancel_speaking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::mock::MockSpeech;

    fn adapter() -> (SpeechAdapter, crate::speech::mock::MockSpeechHandle) {
        let (platform, handle) = MockSpeech::new(vec![VoiceDescriptor::new(
            "mock:en",
            "Mock English",
            "en-US",
            true,
        )]);
        (SpeechAdapter::new(Box::new(platform)), handle)
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (mut speech, handle) = adapter();

        speech.start_listening();
        speech.start_listening();
        assert!(speech.is_listening());
        assert_eq!(handle.capture_starts(), 1);

        speech.stop_listening();
        speech.stop_listening();
        assert!(!speech.is_listening());
        assert_eq!(handle.capture_stops(), 1);
    }

    #[test]
    fn test_final_delivered_once() {
        let (mut speech, handle) = adapter();
        let finals = speech.speech_end();

        speech.start_listening();
        handle.interim("hello");
        speech.poll();
        assert_eq!(speech.interim_transcript(), "hello");

        handle.final_transcript(1, "hello world");
        handle.final_transcript(1, "hello world");
        speech.poll();

        assert_eq!(finals.try_recv().ok().as_deref(), Some("hello world"));
        assert!(finals.try_recv().is_err());
        assert_eq!(speech.interim_transcript(), "");
    }

    #[test]
    fn test_final_queued_before_stop_is_delivered() {
        let (mut speech, handle) = adapter();
        let finals = speech.speech_end();

        speech.start_listening();
        handle.final_transcript(1, "turn the lights off");
        speech.stop_listening();

        assert_eq!(finals.try_recv().ok().as_deref(), Some("turn the lights off"));
        assert!(finals.try_recv().is_err());
        assert!(!speech.is_listening());
    }

    #[test]
    fn test_finals_after_stop_are_discarded() {
        let (mut speech, handle) = adapter();
        let finals = speech.speech_end();

        speech.start_listening();
        speech.stop_listening();
        handle.final_transcript(1, "too late");
        speech.poll();

        assert!(finals.try_recv().is_err());
    }

    #[test]
    fn test_stale_end_does_not_clear_newer_utterance() {
        let (mut speech, handle) = adapter();

        speech.speak("first", None);
        let first = speech.current_utterance().unwrap();
        speech.speak("second", None);
        let second = speech.current_utterance().unwrap();
        assert_ne!(first, second);

        // The cancelled first utterance reports its end late
        speech.poll();
        assert!(speech.is_speaking());

        handle.finish_utterance();
        speech.poll();
        assert!(!speech.is_speaking());
        assert_eq!(handle.spoken().len(), 2);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (mut speech, handle) = adapter();
        speech.cancel_speaking();
        assert_eq!(handle.cancel_count(), 0);

        speech.speak("hello", None);
        speech.cancel_speaking();
        speech.cancel_speaking();
        assert!(!speech.is_speaking());
        assert_eq!(handle.cancel_count(), 1);
    }

    #[test]
    fn test_errors_clear_on_next_success_of_same_kind() {
        let (mut speech, handle) = adapter();

        handle.fail_next_capture(VoxError::PermissionDenied("blocked".into()));
        speech.start_listening();
        assert!(!speech.is_listening());
        assert!(speech.error().unwrap().contains("permission denied"));
        assert!(speech.error_report().unwrap().summary.contains("Microphone access was denied"));

        // A successful synthesis does not clear a capture error
        speech.speak("hi", None);
        assert!(speech.error().is_some());

        speech.start_listening();
        assert!(speech.is_listening());
        assert!(speech.error().is_none());
    }

    #[test]
    fn test_empty_text_is_not_spoken() {
        let (mut speech, handle) = adapter();
        speech.speak("  **  ", None);
        assert!(!speech.is_speaking());
        assert!(handle.spoken().is_empty());
    }
}
