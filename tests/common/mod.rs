//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};
use voxchat::chat::{ChatSession, ScriptedBackend};
use voxchat::config::AppConfig;
use voxchat::controller::AppController;
use voxchat::speech::{MockSpeech, MockSpeechHandle, SpeechAdapter, VoiceDescriptor};

pub struct Rig {
    pub controller: AppController,
    pub speech: MockSpeechHandle,
    pub backend: Arc<ScriptedBackend>,
}

/// A Google en-US voice plus a platform-default French one
pub fn mixed_voices() -> Vec<VoiceDescriptor> {
    vec![
        VoiceDescriptor::new("a", "Amélie", "fr-FR", true),
        VoiceDescriptor::new("b", "Google US English", "en-US", false),
        VoiceDescriptor::new("c", "Daniel", "en-GB", false),
    ]
}

pub fn rig_with(config: AppConfig, voices: Vec<VoiceDescriptor>) -> Rig {
    let backend = Arc::new(ScriptedBackend::new());
    let chat = ChatSession::new(backend.clone(), &config.backend).expect("chat session");
    let (platform, speech) = MockSpeech::new(voices);
    let adapter = SpeechAdapter::new(Box::new(platform));

    Rig {
        controller: AppController::new(chat, adapter, &config),
        speech,
        backend,
    }
}

/// Controller in the chat phase with `mixed_voices`
pub fn chat_rig() -> Rig {
    rig_with(AppConfig::default().with_skip_training(true), mixed_voices())
}

/// Tick until `done` holds, failing after a few seconds
pub fn tick_until(controller: &mut AppController, done: impl Fn(&AppController) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        controller.tick();
        if done(controller) {
            return;
        }
        assert!(Instant::now() < deadline, "condition not reached before deadline");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Tick for a while without expecting anything in particular
pub fn tick_for(controller: &mut AppController, duration: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        controller.tick();
        std::thread::sleep(Duration::from_millis(5));
    }
}
