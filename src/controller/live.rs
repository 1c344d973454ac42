//! Hands-free turn-taking
//!
//! `LiveConversation` decides, once per frame, what the live loop should do
//! next given the current chat and speech state. It never touches the
//! adapters itself; the controller carries out the returned step.

use crate::messages::MessageId;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LivePhase {
    /// Capturing the user's turn
    Listening,
    /// Waiting for the chat backend
    Thinking,
    /// Reading the reply aloud
    Speaking,
    /// Stopped after a speech error until the user resumes
    Paused,
}

impl LivePhase {
    pub fn label(&self) -> &'static str {
        match self {
            LivePhase::Listening => "Listening…",
            LivePhase::Thinking => "Thinking…",
            LivePhase::Speaking => "Speaking…",
            LivePhase::Paused => "Paused",
        }
    }
}

/// State the loop reads each frame
#[derive(Clone, Copy, Debug, Default)]
pub struct LiveInputs {
    pub is_loading: bool,
    pub is_speaking: bool,
    pub is_listening: bool,
    /// Latest model reply that has not been spoken yet
    pub unspoken_reply: Option<MessageId>,
}

/// What the controller should do this frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveStep {
    Idle,
    /// Stop capture, then speak the reply
    Speak(MessageId),
    StopListening,
    StartListening,
}

#[derive(Clone, Debug)]
pub struct LiveConversation {
    phase: LivePhase,
    pause_reason: Option<String>,
}

impl Default for LiveConversation {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveConversation {
    pub fn new() -> Self {
        Self {
            phase: LivePhase::Listening,
            pause_reason: None,
        }
    }

    pub fn phase(&self) -> LivePhase {
        self.phase
    }

    pub fn pause_reason(&self) -> Option<&str> {
        self.pause_reason.as_deref()
    }

    /// Back to the initial state, e.g. when live mode is entered
    pub fn reset(&mut self) {
        self.phase = LivePhase::Listening;
        self.pause_reason = None;
    }

    pub fn pause(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        info!("Live conversation paused: {}", reason);
        self.phase = LivePhase::Paused;
        self.pause_reason = Some(reason);
    }

    pub fn resume(&mut self) {
        if self.phase == LivePhase::Paused {
            debug!("Live conversation resumed");
            self.reset();
        }
    }

    pub fn step(&mut self, inputs: LiveInputs) -> LiveStep {
        if self.phase == LivePhase::Paused {
            return LiveStep::Idle;
        }

        if let (Some(id), false) = (inputs.unspoken_reply, inputs.is_loading) {
            self.phase = LivePhase::Speaking;
            return LiveStep::Speak(id);
        }

        if inputs.is_loading {
            self.phase = LivePhase::Thinking;
            return if inputs.is_listening {
                LiveStep::StopListening
            } else {
                LiveStep::Idle
            };
        }

        if inputs.is_speaking {
            self.phase = LivePhase::Speaking;
            return if inputs.is_listening {
                LiveStep::StopListening
            } else {
                LiveStep::Idle
            };
        }

        self.phase = LivePhase::Listening;
        if inputs.is_listening {
            LiveStep::Idle
        } else {
            LiveStep::StartListening
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_idle_loop_listens() {
        let mut live = LiveConversation::new();
        assert_eq!(live.step(LiveInputs::default()), LiveStep::StartListening);

        let listening = LiveInputs {
            is_listening: true,
            ..Default::default()
        };
        assert_eq!(live.step(listening), LiveStep::Idle);
        assert_eq!(live.phase(), LivePhase::Listening);
    }

    #[test]
    fn test_loading_stops_capture() {
        let mut live = LiveConversation::new();
        let inputs = LiveInputs {
            is_loading: true,
            is_listening: true,
            ..Default::default()
        };
        assert_eq!(live.step(inputs), LiveStep::StopListening);
        assert_eq!(live.phase(), LivePhase::Thinking);
    }

    #[test]
    fn test_reply_is_spoken_then_listening_resumes() {
        let mut live = LiveConversation::new();
        let id = Uuid::new_v4();

        let reply = LiveInputs {
            unspoken_reply: Some(id),
            ..Default::default()
        };
        assert_eq!(live.step(reply), LiveStep::Speak(id));

        let speaking = LiveInputs {
            is_speaking: true,
            ..Default::default()
        };
        assert_eq!(live.step(speaking), LiveStep::Idle);
        assert_eq!(live.phase(), LivePhase::Speaking);

        assert_eq!(live.step(LiveInputs::default()), LiveStep::StartListening);
    }

    #[test]
    fn test_paused_until_resumed() {
        let mut live = LiveConversation::new();
        live.pause("Microphone permission denied");
        assert_eq!(live.step(LiveInputs::default()), LiveStep::Idle);
        assert_eq!(live.pause_reason(), Some("Microphone permission denied"));

        live.resume();
        assert_eq!(live.phase(), LivePhase::Listening);
        assert!(live.pause_reason().is_none());
        assert_eq!(live.step(LiveInputs::default()), LiveStep::StartListening);
    }
}
