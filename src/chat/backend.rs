//! The seam between the chat session and whatever answers it

use crate::messages::{GroundingSource, Message, Role};
use crate::Result;
use futures::stream::BoxStream;
use serde::Serialize;

/// Incremental pieces of a model reply
pub type ChatStream = BoxStream<'static, Result<ChatChunk>>;

/// One earlier turn sent along as context
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            text: message.text.clone(),
        }
    }
}

/// Request body for a single chat exchange
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// The new user text
    pub message: String,
    /// Earlier conversation, oldest first, excluding `message`
    pub history: Vec<HistoryEntry>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, history: &[Message]) -> Self {
        Self {
            message: message.into(),
            history: history.iter().map(HistoryEntry::from).collect(),
        }
    }
}

/// A piece of a streamed reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatChunk {
    /// Text to append to the reply
    Text(String),
    /// Citations for the reply
    Sources(Vec<GroundingSource>),
}

/// Anything that can answer a chat request with a stream of chunks.
///
/// The stream ends when the reply is complete; an `Err` item aborts it.
pub trait ChatBackend: Send + Sync + 'static {
    fn stream_reply(&self, request: ChatRequest) -> ChatStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_history_roles() {
        let history = vec![Message::user("hi"), Message::model("hello")];
        let request = ChatRequest::new("how are you", &history);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["message"], "how are you");
        assert_eq!(json["history"][0]["role"], "user");
        assert_eq!(json["history"][1]["role"], "model");
        assert_eq!(json["history"][1]["text"], "hello");
    }
}
