//! Scripted speech platform for tests and headless runs
//!
//! `MockSpeech` records every call; the paired `MockSpeechHandle` plays the
//! role of the user and the audio hardware by injecting transcripts,
//! finishing utterances and arming failures.

use super::platform::{PlatformEvent, SpeechPlatform, Utterance, UtteranceId, VoiceDescriptor};
use crate::audio::AudioAnalyser;
use crate::{Result, VoxError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct MockState {
    voices: Vec<VoiceDescriptor>,
    capturing: bool,
    capture_starts: usize,
    capture_stops: usize,
    spoken: Vec<Utterance>,
    active: Option<UtteranceId>,
    cancels: usize,
    next_segment: u64,
    fail_capture: Option<VoxError>,
    fail_speak: Option<VoxError>,
}

pub struct MockSpeech {
    state: Arc<Mutex<MockState>>,
    events_tx: Sender<PlatformEvent>,
    events_rx: Receiver<PlatformEvent>,
    analyser: AudioAnalyser,
}

/// Test-side controls for a `MockSpeech`
#[derive(Clone)]
pub struct MockSpeechHandle {
    state: Arc<Mutex<MockState>>,
    events_tx: Sender<PlatformEvent>,
    analyser: AudioAnalyser,
}

impl MockSpeech {
    pub fn new(voices: Vec<VoiceDescriptor>) -> (Self, MockSpeechHandle) {
        let state = Arc::new(Mutex::new(MockState {
            voices,
            next_segment: 1,
            ..Default::default()
        }));
        let (events_tx, events_rx) = unbounded();
        let analyser = AudioAnalyser::default();

        let handle = MockSpeechHandle {
            state: state.clone(),
            events_tx: events_tx.clone(),
            analyser: analyser.clone(),
        };

        (
            Self {
                state,
                events_tx,
                events_rx,
                analyser,
            },
            handle,
        )
    }
}

impl SpeechPlatform for MockSpeech {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.state.lock().voices.clone()
    }

    fn start_capture(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_capture.take() {
            return Err(error);
        }
        state.capturing = true;
        state.capture_starts += 1;
        Ok(())
    }

    fn stop_capture(&mut self) {
        let mut state = self.state.lock();
        state.capturing = false;
        state.capture_stops += 1;
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_speak.take() {
            return Err(error);
        }
        let id = utterance.id;
        state.active = Some(id);
        state.spoken.push(utterance);
        let _ = self.events_tx.send(PlatformEvent::UtteranceStarted(id));
        Ok(())
    }

    fn cancel_speech(&mut self) {
        let mut state = self.state.lock();
        if let Some(id) = state.active.take() {
            state.cancels += 1;
            // Like real engines, the cancelled utterance still reports its end
            let _ = self.events_tx.send(PlatformEvent::UtteranceEnded(id));
        }
    }

    fn analyser(&self) -> AudioAnalyser {
        self.analyser.clone()
    }

    fn events(&self) -> Receiver<PlatformEvent> {
        self.events_rx.clone()
    }
}

impl MockSpeechHandle {
    /// Emit an interim result for the current segment
    pub fn interim(&self, text: &str) {
        let segment = self.state.lock().next_segment;
        self.emit(PlatformEvent::Transcript {
            segment,
            text: text.to_string(),
            is_final: false,
        });
    }

    /// Emit a final result for an explicit segment
    pub fn final_transcript(&self, segment: u64, text: &str) {
        {
            let mut state = self.state.lock();
            state.next_segment = state.next_segment.max(segment + 1);
        }
        self.emit(PlatformEvent::Transcript {
            segment,
            text: text.to_string(),
            is_final: true,
        });
    }

    /// The user says `text`: an interim result followed by its final
    pub fn say(&self, text: &str) {
        let segment = self.state.lock().next_segment;
        self.interim(text);
        self.final_transcript(segment, text);
    }

    /// Capture stops on its own
    pub fn end_capture(&self) {
        self.state.lock().capturing = false;
        self.emit(PlatformEvent::CaptureEnded);
    }

    /// Playback of the active utterance completes
    pub fn finish_utterance(&self) {
        if let Some(id) = self.state.lock().active.take() {
            self.emit(PlatformEvent::UtteranceEnded(id));
        }
    }

    /// Playback of the active utterance fails
    pub fn fail_utterance(&self, error: VoxError) {
        if let Some(id) = self.state.lock().active.take() {
            self.emit(PlatformEvent::UtteranceFailed { id, error });
        }
    }

    pub fn fail_next_capture(&self, error: VoxError) {
        self.state.lock().fail_capture = Some(error);
    }

    pub fn fail_next_speak(&self, error: VoxError) {
        self.state.lock().fail_speak = Some(error);
    }

    pub fn set_voices(&self, voices: Vec<VoiceDescriptor>) {
        self.state.lock().voices = voices;
        self.emit(PlatformEvent::VoicesChanged);
    }

    /// Feed the level meter
    pub fn push_audio(&self, samples: &[f32]) {
        self.analyser.push(samples);
    }

    pub fn emit(&self, event: PlatformEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn is_capturing(&self) -> bool {
        self.state.lock().capturing
    }

    pub fn capture_starts(&self) -> usize {
        self.state.lock().capture_starts
    }

    pub fn capture_stops(&self) -> usize {
        self.state.lock().capture_stops
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.state.lock().spoken.clone()
    }

    pub fn last_spoken(&self) -> Option<Utterance> {
        self.state.lock().spoken.last().cloned()
    }

    pub fn active_utterance(&self) -> Option<UtteranceId> {
        self.state.lock().active
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().cancels
    }
}
