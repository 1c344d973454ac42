//! End-to-end controller behavior with a scripted backend and mock speech

mod common;

use common::{chat_rig, mixed_voices, rig_with, tick_for, tick_until};
use std::time::Duration;
use voxchat::config::AppConfig;
use voxchat::controller::{Action, AppPhase, LivePhase};
use voxchat::messages::GroundingSource;
use voxchat::speech::VoiceDescriptor;
use voxchat::VoxError;

#[test]
fn test_empty_send_is_noop() {
    let mut rig = chat_rig();
    rig.controller.apply(Action::SendMessage("   ".to_string()));
    tick_for(&mut rig.controller, Duration::from_millis(50));

    assert!(rig.controller.chat().messages().is_empty());
    assert!(!rig.controller.chat().is_loading());
    assert_eq!(rig.backend.request_count(), 0);
}

#[test]
fn test_no_second_request_while_loading() {
    let mut rig = chat_rig();
    rig.backend.hang();

    assert!(rig.controller.send_message("first"));
    assert!(!rig.controller.send_message("second"));
    tick_for(&mut rig.controller, Duration::from_millis(100));

    assert!(rig.controller.chat().is_loading());
    assert_eq!(rig.backend.request_count(), 1);
    assert_eq!(rig.controller.chat().messages().len(), 1);
}

#[test]
fn test_reply_is_auto_spoken_exactly_once() {
    let mut rig = chat_rig();
    rig.backend.reply("The capital of France is Paris.");

    rig.controller.send_message("What is the capital of France?");
    tick_until(&mut rig.controller, |c| c.last_spoken_message_id().is_some());

    // playback finishes, then many more frames pass
    rig.speech.finish_utterance();
    tick_for(&mut rig.controller, Duration::from_millis(100));

    let spoken = rig.speech.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "The capital of France is Paris.");
    assert_eq!(spoken[0].voice_uri.as_deref(), Some("b"));
}

#[test]
fn test_reply_with_sources_keeps_links() {
    let mut rig = chat_rig();
    rig.backend.reply_with_sources(
        "See the article.",
        vec![GroundingSource::new("https://example.com/paris", "Paris")],
    );

    rig.controller.send_message("Tell me about Paris");
    tick_until(&mut rig.controller, |c| !c.chat().is_loading());

    let reply = &rig.controller.chat().messages()[1];
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].uri, "https://example.com/paris");
}

#[test]
fn test_backend_failure_keeps_only_user_message() {
    let mut rig = chat_rig();
    rig.backend
        .fail(VoxError::BackendError("503 Service Unavailable: overloaded".to_string()));

    rig.controller.send_message("hello");
    tick_until(&mut rig.controller, |c| !c.chat().is_loading());

    let chat = rig.controller.chat();
    assert_eq!(chat.messages().len(), 1);
    assert!(chat.messages()[0].is_user());
    assert!(chat.error().is_some_and(|e| !e.is_empty()));
    assert!(rig.speech.spoken().is_empty());
}

#[test]
fn test_request_timeout_surfaces_error() {
    let config = AppConfig::default()
        .with_skip_training(true)
        .with_request_timeout_secs(1);
    let mut rig = rig_with(config, mixed_voices());
    rig.backend.hang();

    rig.controller.send_message("anyone there?");
    tick_until(&mut rig.controller, |c| !c.chat().is_loading());

    let error = rig.controller.chat().error().unwrap_or_default().to_string();
    assert!(error.contains("timed out"), "unexpected error: {}", error);

    // the session recovers
    rig.backend.reply("Yes.");
    assert!(rig.controller.send_message("hello?"));
}

#[test]
fn test_entering_live_mode_silences_and_stops_capture() {
    let mut rig = chat_rig();
    rig.backend.reply("A long answer being read aloud.");
    rig.controller.send_message("question");
    tick_until(&mut rig.controller, |c| c.speech().is_speaking());

    rig.controller.apply(Action::ToggleLiveMode);

    assert!(rig.controller.is_live_mode());
    assert!(!rig.controller.speech().is_speaking());
    assert!(!rig.controller.speech().is_listening());
    assert_eq!(rig.speech.cancel_count(), 1);
}

#[test]
fn test_leaving_live_mode_stops_capture() {
    let mut rig = chat_rig();
    rig.controller.apply(Action::ToggleLiveMode);
    rig.controller.tick();
    assert!(rig.speech.is_capturing());

    rig.controller.apply(Action::ToggleLiveMode);
    assert!(!rig.controller.is_live_mode());
    assert!(!rig.speech.is_capturing());
}

#[test]
fn test_live_conversation_round_trip() {
    let mut rig = chat_rig();
    rig.backend.reply("It is sunny.");
    rig.controller.apply(Action::ToggleLiveMode);
    rig.controller.tick();
    assert_eq!(rig.controller.live().phase(), LivePhase::Listening);

    rig.speech.say("what's the weather");
    tick_until(&mut rig.controller, |c| c.live().phase() == LivePhase::Speaking);
    assert_eq!(rig.backend.requests()[0].message, "what's the weather");
    assert!(!rig.speech.is_capturing());

    rig.speech.finish_utterance();
    tick_until(&mut rig.controller, |c| c.live().phase() == LivePhase::Listening);
    assert!(rig.speech.is_capturing());
    assert_eq!(rig.speech.spoken().len(), 1);
}

#[test]
fn test_voice_selection_prefers_google_us_english() {
    let mut rig = rig_with(AppConfig::default(), mixed_voices());
    rig.controller.apply(Action::SkipTraining);
    assert_eq!(rig.controller.selected_voice_uri(), Some("b"));
}

#[test]
fn test_voice_selection_falls_back_to_first_voice() {
    let voices = vec![VoiceDescriptor::new("a", "Amélie", "fr-FR", true)];
    let mut rig = rig_with(AppConfig::default(), voices);
    rig.controller.apply(Action::SkipTraining);
    assert_eq!(rig.controller.selected_voice_uri(), Some("a"));
}

#[test]
fn test_voice_selected_once_voices_arrive() {
    let mut rig = rig_with(AppConfig::default().with_skip_training(true), Vec::new());
    assert!(rig.controller.selected_voice_uri().is_none());

    rig.speech.set_voices(mixed_voices());
    rig.controller.tick();
    assert_eq!(rig.controller.selected_voice_uri(), Some("b"));
}

#[test]
fn test_training_to_chat_exactly_once() {
    let mut rig = rig_with(AppConfig::default(), mixed_voices());
    assert_eq!(rig.controller.phase(), AppPhase::Training);

    rig.controller.apply(Action::StartListening);
    let prompts = rig.controller.training().prompts().to_vec();
    for prompt in &prompts {
        rig.speech.say(prompt);
        rig.controller.tick();
    }
    assert!(rig.controller.training().is_complete());
    assert!(!rig.speech.is_capturing());
    assert_eq!(rig.backend.request_count(), 0);

    rig.controller.apply(Action::FinishTraining);
    assert_eq!(rig.controller.phase(), AppPhase::Chat);

    rig.controller.apply(Action::SelectVoice("c".to_string()));
    rig.controller.apply(Action::FinishTraining);
    rig.controller.apply(Action::SkipTraining);
    rig.controller.tick();

    assert_eq!(rig.controller.phase(), AppPhase::Chat);
    assert_eq!(rig.controller.selected_voice_uri(), Some("c"));
}

#[test]
fn test_capture_not_started_while_speaking() {
    let mut rig = chat_rig();
    rig.backend.reply("Still talking.");
    rig.controller.send_message("hi");
    tick_until(&mut rig.controller, |c| c.speech().is_speaking());

    rig.controller.apply(Action::StartListening);
    assert!(!rig.speech.is_capturing());
    assert_eq!(rig.speech.capture_starts(), 0);
}

#[test]
fn test_dictated_message_is_sent() {
    let mut rig = chat_rig();
    rig.backend.reply("Noted.");
    rig.controller.apply(Action::StartListening);

    rig.speech.say("remind me to buy milk");
    tick_until(&mut rig.controller, |c| !c.chat().messages().is_empty());

    assert_eq!(rig.controller.chat().messages()[0].text, "remind me to buy milk");
}

#[test]
fn test_test_voice_does_not_touch_chat() {
    let mut rig = chat_rig();
    rig.controller.apply(Action::OpenSettings);
    rig.controller.apply(Action::SelectVoice("c".to_string()));
    rig.controller.apply(Action::TestVoice);
    rig.controller.tick();

    assert!(rig.controller.chat().messages().is_empty());
    assert_eq!(rig.speech.last_spoken().unwrap().voice_uri.as_deref(), Some("c"));
    assert_eq!(rig.backend.request_count(), 0);
}

#[test]
fn test_clear_chat_allows_speaking_new_replies() {
    let mut rig = chat_rig();
    rig.backend.reply("First.").reply("Second.");

    rig.controller.send_message("one");
    tick_until(&mut rig.controller, |c| c.last_spoken_message_id().is_some());

    rig.controller.apply(Action::ClearChat);
    assert!(rig.controller.chat().messages().is_empty());
    assert!(rig.controller.last_spoken_message_id().is_none());

    rig.controller.send_message("two");
    tick_until(&mut rig.controller, |c| c.last_spoken_message_id().is_some());
    assert_eq!(rig.speech.last_spoken().unwrap().text, "Second.");
}

#[test]
fn test_final_arriving_as_user_stops_dictation_is_sent() {
    let mut rig = chat_rig();
    rig.backend.reply("Done.");
    rig.controller.apply(Action::StartListening);

    // Recognition returns in the same frame the mic button is clicked
    rig.speech.final_transcript(1, "turn the lights off");
    rig.controller.apply(Action::StopListening);
    assert!(!rig.speech.is_capturing());

    tick_until(&mut rig.controller, |c| !c.chat().messages().is_empty());
    assert_eq!(rig.controller.chat().messages()[0].text, "turn the lights off");
    assert_eq!(rig.backend.request_count(), 1);
}
