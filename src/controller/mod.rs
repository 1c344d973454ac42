//! Application controller
//!
//! `AppController` owns the chat session and the speech adapter and
//! mediates between them:
//! - training → chat phase transition
//! - auto-speaking new replies exactly once
//! - keeping capture and synthesis mutually exclusive
//! - live-mode turn-taking
//!
//! The view layer never mutates state directly; it emits `Action`s.

pub mod live;
pub mod training;

pub use live::{LiveConversation, LiveInputs, LivePhase, LiveStep};
pub use training::{word_match_score, TrainingRecording, TrainingSession};

use crate::chat::ChatSession;
use crate::config::AppConfig;
use crate::messages::MessageId;
use crate::speech::{select_preferred_voice, SpeechAdapter, SpeechErrorKind};
use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

/// Phrase used when previewing a voice from the settings
pub const VOICE_PREVIEW_TEXT: &str = "Hello! This is how I will sound when I read replies to you.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppPhase {
    Training,
    Chat,
}

/// User intents emitted by the view layer
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SendMessage(String),
    ToggleLiveMode,
    SpeakMessage(MessageId),
    StopSpeaking,
    OpenSettings,
    CloseSettings,
    SelectVoice(String),
    TestVoice,
    StartListening,
    StopListening,
    FinishTraining,
    SkipTraining,
    RedoTrainingPrompt,
    ResumeLive,
    ClearChat,
    DismissChatError,
    DismissSpeechError,
}

pub struct AppController {
    chat: ChatSession,
    speech: SpeechAdapter,
    speech_end: Receiver<String>,
    phase: AppPhase,
    live_mode: bool,
    settings_open: bool,
    selected_voice_uri: Option<String>,
    /// Shared by auto-speak and live mode so no reply is spoken twice
    last_spoken_message_id: Option<MessageId>,
    training: TrainingSession,
    live: LiveConversation,
}

impl AppController {
    pub fn new(chat: ChatSession, speech: SpeechAdapter, config: &AppConfig) -> Self {
        let speech_end = speech.speech_end();
        let mut controller = Self {
            chat,
            speech,
            speech_end,
            phase: AppPhase::Training,
            live_mode: false,
            settings_open: false,
            selected_voice_uri: None,
            last_spoken_message_id: None,
            training: TrainingSession::new(config.training.prompts.clone()),
            live: LiveConversation::new(),
        };

        if config.ui.skip_training {
            controller.complete_training();
        }
        controller
    }

    /// Advance one frame: drain chat and speech events, route finalized
    /// utterances and run auto-speak or the live loop.
    pub fn tick(&mut self) {
        self.chat.poll();
        self.speech.poll();

        while let Ok(text) = self.speech_end.try_recv() {
            self.handle_final_transcript(text);
        }

        if self.phase != AppPhase::Chat {
            return;
        }

        if self.selected_voice_uri.is_none() && !self.speech.voices().is_empty() {
            self.auto_select_voice();
        }

        if self.live_mode {
            self.step_live();
        } else {
            self.auto_speak();
        }
    }

    fn handle_final_transcript(&mut self, text: String) {
        match self.phase {
            AppPhase::Training => {
                let peak = self.speech.analyser().peak(usize::MAX);
                if let Some(recording) = self.training.record(&text, peak) {
                    info!(
                        "Training prompt {} recorded (score {:.2})",
                        recording.prompt_index + 1,
                        recording.score
                    );
                }
                if self.training.is_complete() {
                    self.speech.stop_listening();
                }
            }
            AppPhase::Chat => {
                self.send_message(&text);
            }
        }
    }

    /// The latest model reply, if it is complete, non-empty and unspoken
    fn unspoken_reply(&self) -> Option<MessageId> {
        if self.chat.is_loading() {
            return None;
        }
        let last = self.chat.last_message()?;
        if !last.is_model() || last.text.trim().is_empty() {
            return None;
        }
        if self.last_spoken_message_id == Some(last.id) {
            return None;
        }
        Some(last.id)
    }

    fn auto_speak(&mut self) {
        if let Some(id) = self.unspoken_reply() {
            self.speak_reply(id);
        }
    }

    /// Speak a message and record it as spoken
    fn speak_reply(&mut self, id: MessageId) {
        let Some(text) = self.chat.message(id).map(|m| m.text.clone()) else {
            return;
        };

        self.speech.stop_listening();
        self.speech.speak(&text, self.selected_voice_uri.as_deref());
        self.last_spoken_message_id = Some(id);
        debug!("Spoke reply {}", id);
    }

    fn step_live(&mut self) {
        let was_speaking = self.live.phase() == LivePhase::Speaking;

        if was_speaking
            && !self.speech.is_speaking()
            && self.speech.error_kind() == Some(SpeechErrorKind::Synthesis)
        {
            let reason = self.speech.error().unwrap_or("Speech synthesis failed").to_string();
            self.live.pause(reason);
            return;
        }

        let inputs = LiveInputs {
            is_loading: self.chat.is_loading(),
            is_speaking: self.speech.is_speaking(),
            is_listening: self.speech.is_listening(),
            unspoken_reply: self.unspoken_reply(),
        };

        match self.live.step(inputs) {
            LiveStep::Idle => {}
            LiveStep::Speak(id) => self.speak_reply(id),
            LiveStep::StopListening => self.speech.stop_listening(),
            LiveStep::StartListening => {
                self.speech.start_listening();
                if !self.speech.is_listening() {
                    let reason = self.speech.error().unwrap_or("Could not start listening").to_string();
                    self.live.pause(reason);
                }
            }
        }
    }

    fn auto_select_voice(&mut self) {
        self.selected_voice_uri = select_preferred_voice(self.speech.voices()).map(|v| v.voice_uri.clone());
        if let Some(uri) = &self.selected_voice_uri {
            info!("Selected voice {}", uri);
        }
    }

    /// Cancel audible speech, then forward to the chat session.
    ///
    /// Empty text is a no-op and cancels nothing.
    pub fn send_message(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.speech.cancel_speaking();
        self.chat.send_message(text)
    }

    /// Flip live mode. Silences output and stops capture either way.
    pub fn toggle_live_mode(&mut self) {
        if self.phase != AppPhase::Chat {
            return;
        }

        self.live_mode = !self.live_mode;
        self.speech.cancel_speaking();
        self.speech.stop_listening();

        if self.live_mode {
            self.live.reset();
        }
        info!("Live mode {}", if self.live_mode { "on" } else { "off" });
    }

    pub fn resume_live(&mut self) {
        if self.live_mode {
            self.speech.dismiss_error();
            self.live.resume();
        }
    }

    /// Start capture unless synthesis is audible
    pub fn start_listening(&mut self) -> bool {
        if self.speech.is_speaking() {
            debug!("Not listening while speaking");
            return false;
        }
        self.speech.start_listening();
        self.speech.is_listening()
    }

    pub fn stop_listening(&mut self) {
        self.speech.stop_listening();
    }

    /// Read a model message aloud on request
    pub fn handle_speak(&mut self, id: MessageId) {
        let Some(text) = self.chat.message(id).filter(|m| m.is_model()).map(|m| m.text.clone()) else {
            warn!("No model message {} to speak", id);
            return;
        };

        self.speech.stop_listening();
        self.speech.speak(&text, self.selected_voice_uri.as_deref());

        // Only the latest reply participates in the auto-speak guard
        if self.chat.last_message().is_some_and(|m| m.id == id) {
            self.last_spoken_message_id = Some(id);
        }
    }

    /// Leave the training phase. Fires once; later calls are no-ops.
    pub fn complete_training(&mut self) -> bool {
        if self.phase != AppPhase::Training {
            return false;
        }

        self.speech.stop_listening();
        if self.selected_voice_uri.is_none() {
            self.auto_select_voice();
        }
        self.phase = AppPhase::Chat;
        info!("Training complete");
        true
    }

    /// Select a voice by URI. Unknown voices are rejected.
    pub fn select_voice(&mut self, voice_uri: &str) -> bool {
        if self.speech.voice(voice_uri).is_none() {
            warn!("Unknown voice {}", voice_uri);
            return false;
        }
        self.selected_voice_uri = Some(voice_uri.to_string());
        true
    }

    /// Preview the selected voice
    pub fn test_voice(&mut self, text: &str) {
        self.speech.stop_listening();
        self.speech.test_speak(text, self.selected_voice_uri.as_deref());
    }

    pub fn apply(&mut self, action: Action) {
        debug!("Action: {:?}", action);
        match action {
            Action::SendMessage(text) => {
                self.send_message(&text);
            }
            Action::ToggleLiveMode => self.toggle_live_mode(),
            Action::SpeakMessage(id) => self.handle_speak(id),
            Action::StopSpeaking => self.speech.cancel_speaking(),
            Action::OpenSettings => self.settings_open = true,
            Action::CloseSettings => self.settings_open = false,
            Action::SelectVoice(uri) => {
                self.select_voice(&uri);
            }
            Action::TestVoice => self.test_voice(VOICE_PREVIEW_TEXT),
            Action::StartListening => {
                self.start_listening();
            }
            Action::StopListening => self.stop_listening(),
            Action::FinishTraining | Action::SkipTraining => {
                self.complete_training();
            }
            Action::RedoTrainingPrompt => {
                if self.phase == AppPhase::Training {
                    self.training.redo_last();
                }
            }
            Action::ResumeLive => self.resume_live(),
            Action::ClearChat => {
                if self.chat.clear() {
                    self.speech.cancel_speaking();
                    self.last_spoken_message_id = None;
                }
            }
            Action::DismissChatError => self.chat.dismiss_error(),
            Action::DismissSpeechError => self.speech.dismiss_error(),
        }
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn speech(&self) -> &SpeechAdapter {
        &self.speech
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn is_live_mode(&self) -> bool {
        self.live_mode
    }

    pub fn live(&self) -> &LiveConversation {
        &self.live
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn selected_voice_uri(&self) -> Option<&str> {
        self.selected_voice_uri.as_deref()
    }

    pub fn last_spoken_message_id(&self) -> Option<MessageId> {
        self.last_spoken_message_id
    }

    pub fn training(&self) -> &TrainingSession {
        &self.training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ScriptedBackend;
    use crate::config::BackendConfig;
    use crate::speech::{MockSpeech, MockSpeechHandle, VoiceDescriptor};
    use crate::VoxError;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn voices() -> Vec<VoiceDescriptor> {
        vec![
            VoiceDescriptor::new("a", "Alice", "fr-FR", true),
            VoiceDescriptor::new("b", "Google US English", "en-US", false),
        ]
    }

    fn controller(skip_training: bool) -> (AppController, MockSpeechHandle, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new());
        let chat = ChatSession::new(backend.clone(), &BackendConfig::default()).unwrap();
        let (platform, handle) = MockSpeech::new(voices());
        let speech = SpeechAdapter::new(Box::new(platform));
        let config = AppConfig::default().with_skip_training(skip_training);
        (AppController::new(chat, speech, &config), handle, backend)
    }

    fn tick_until(controller: &mut AppController, done: impl Fn(&AppController) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            controller.tick();
            if done(controller) {
                return;
            }
            assert!(Instant::now() < deadline, "condition not reached");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_starts_in_training() {
        let (controller, _, _) = controller(false);
        assert_eq!(controller.phase(), AppPhase::Training);
        assert!(controller.selected_voice_uri().is_none());
    }

    #[test]
    fn test_complete_training_fires_once() {
        let (mut controller, _, _) = controller(false);
        assert!(controller.complete_training());
        assert_eq!(controller.phase(), AppPhase::Chat);
        assert_eq!(controller.selected_voice_uri(), Some("b"));

        controller.select_voice("a");
        assert!(!controller.complete_training());
        assert_eq!(controller.phase(), AppPhase::Chat);
        assert_eq!(controller.selected_voice_uri(), Some("a"));
    }

    #[test]
    fn test_training_records_finals() {
        let (mut controller, handle, backend) = controller(false);
        controller.apply(Action::StartListening);
        handle.push_audio(&[0.0, 0.5, -0.25]);
        handle.say("the quick brown fox jumps over the lazy dog");
        controller.tick();

        let recording = controller.training().last_recording().unwrap();
        assert_eq!(recording.prompt_index, 0);
        assert_eq!(recording.score, 1.0);
        assert_eq!(recording.peak_level, 0.5);
        assert_eq!(backend.request_count(), 0);
        assert!(controller.chat().messages().is_empty());
    }

    #[test]
    fn test_final_transcript_is_sent_while_chatting() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Hi there.");

        controller.apply(Action::StartListening);
        handle.say("hello");
        tick_until(&mut controller, |c| c.last_spoken_message_id().is_some());

        assert_eq!(backend.requests()[0].message, "hello");
        // auto-speak stopped capture first
        assert!(!controller.speech().is_listening());
        assert_eq!(handle.last_spoken().unwrap().text, "Hi there.");
    }

    #[test]
    fn test_reply_spoken_once() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Paris.");

        controller.send_message("Capital of France?");
        tick_until(&mut controller, |c| c.last_spoken_message_id().is_some());
        handle.finish_utterance();
        for _ in 0..5 {
            controller.tick();
        }

        assert_eq!(handle.spoken().len(), 1);
        assert_eq!(handle.spoken()[0].voice_uri.as_deref(), Some("b"));
    }

    #[test]
    fn test_manual_speak_of_older_message_keeps_guard() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("One.").reply("Two.");

        controller.send_message("first");
        tick_until(&mut controller, |c| c.last_spoken_message_id().is_some());
        let first_reply = controller.chat().messages()[1].id;

        controller.send_message("second");
        tick_until(&mut controller, |c| c.last_spoken_message_id() != Some(first_reply));
        let spoken_before = handle.spoken().len();

        controller.apply(Action::SpeakMessage(first_reply));
        controller.tick();
        controller.tick();

        assert_eq!(handle.spoken().len(), spoken_before + 1);
        assert_eq!(handle.last_spoken().unwrap().text, "One.");
    }

    #[test]
    fn test_send_cancels_speech_but_empty_does_not() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Long answer.");
        controller.send_message("question");
        tick_until(&mut controller, |c| c.speech().is_speaking());

        assert!(!controller.send_message("   "));
        assert!(controller.speech().is_speaking());
        assert_eq!(handle.cancel_count(), 0);

        controller.send_message("interrupt");
        assert!(!controller.speech().is_speaking());
        assert_eq!(handle.cancel_count(), 1);
    }

    #[test]
    fn test_no_capture_while_speaking() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Talking.");
        controller.send_message("hi");
        tick_until(&mut controller, |c| c.speech().is_speaking());

        assert!(!controller.start_listening());
        assert!(!handle.is_capturing());
    }

    #[test]
    fn test_live_loop_turns() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Sure.");

        controller.toggle_live_mode();
        controller.tick();
        assert_eq!(controller.live().phase(), LivePhase::Listening);
        assert!(handle.is_capturing());

        handle.say("tell me a joke");
        tick_until(&mut controller, |c| c.live().phase() == LivePhase::Speaking);
        assert!(!handle.is_capturing());
        assert_eq!(handle.spoken().len(), 1);

        handle.finish_utterance();
        tick_until(&mut controller, |c| c.speech().is_listening());
        assert_eq!(controller.live().phase(), LivePhase::Listening);
        assert_eq!(handle.spoken().len(), 1);
    }

    #[test]
    fn test_live_pauses_on_capture_failure() {
        let (mut controller, handle, _) = controller(true);
        handle.fail_next_capture(VoxError::PermissionDenied("blocked".to_string()));

        controller.toggle_live_mode();
        controller.tick();
        assert_eq!(controller.live().phase(), LivePhase::Paused);
        assert!(controller.live().pause_reason().is_some_and(|r| r.contains("blocked")));

        // no retry every frame
        controller.tick();
        assert_eq!(handle.capture_starts(), 0);

        controller.apply(Action::ResumeLive);
        controller.tick();
        assert!(handle.is_capturing());
    }

    #[test]
    fn test_live_pauses_on_synthesis_failure() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Hello.");
        controller.toggle_live_mode();
        controller.tick();

        handle.say("hi");
        tick_until(&mut controller, |c| c.live().phase() == LivePhase::Speaking);
        handle.fail_utterance(VoxError::SynthesisError("engine crashed".to_string()));
        tick_until(&mut controller, |c| c.live().phase() == LivePhase::Paused);
        assert!(!handle.is_capturing());
    }

    #[test]
    fn test_toggle_live_silences_and_stops_capture() {
        let (mut controller, handle, backend) = controller(true);
        backend.reply("Speaking now.");
        controller.send_message("hi");
        tick_until(&mut controller, |c| c.speech().is_speaking());

        controller.toggle_live_mode();
        assert!(controller.is_live_mode());
        assert!(!controller.speech().is_speaking());
        assert!(!controller.speech().is_listening());
        assert!(!handle.is_capturing());
    }

    #[test]
    fn test_select_voice_requires_known_uri() {
        let (mut controller, _, _) = controller(true);
        assert!(!controller.select_voice("zz"));
        assert_eq!(controller.selected_voice_uri(), Some("b"));
        assert!(controller.select_voice("a"));

        controller.test_voice("Testing");
        assert!(controller.chat().messages().is_empty());
    }

    #[test]
    fn test_settings_actions() {
        let (mut controller, _, _) = controller(true);
        controller.apply(Action::OpenSettings);
        assert!(controller.settings_open());
        controller.apply(Action::CloseSettings);
        assert!(!controller.settings_open());
    }
}
