//! In-process chat backend driven by a script
//!
//! Used by tests and the `--offline` demo mode: each request pops the next
//! scripted reply and is recorded for later inspection.

use super::backend::{ChatBackend, ChatChunk, ChatRequest, ChatStream};
use crate::messages::GroundingSource;
use crate::{Result, VoxError};
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;

enum ScriptedReply {
    Chunks(Vec<Result<ChatChunk>>),
    /// Never yields; the request stays in flight until it times out
    Hang,
    /// Answers with the request text
    Echo,
}

#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
    echo_when_empty: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that repeats every message back once the script runs out
    pub fn echo() -> Self {
        Self {
            echo_when_empty: true,
            ..Self::default()
        }
    }

    /// Queue a reply streamed as the given chunks
    pub fn reply_chunks(&self, chunks: Vec<Result<ChatChunk>>) -> &Self {
        self.script.lock().push_back(ScriptedReply::Chunks(chunks));
        self
    }

    /// Queue a single-chunk text reply
    pub fn reply(&self, text: &str) -> &Self {
        self.reply_chunks(vec![Ok(ChatChunk::Text(text.to_string()))])
    }

    /// Queue a text reply with grounding sources
    pub fn reply_with_sources(&self, text: &str, sources: Vec<GroundingSource>) -> &Self {
        self.reply_chunks(vec![
            Ok(ChatChunk::Text(text.to_string())),
            Ok(ChatChunk::Sources(sources)),
        ])
    }

    /// Queue a failing reply
    pub fn fail(&self, error: VoxError) -> &Self {
        self.reply_chunks(vec![Err(error)])
    }

    /// Queue a reply that never arrives
    pub fn hang(&self) -> &Self {
        self.script.lock().push_back(ScriptedReply::Hang);
        self
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl ChatBackend for ScriptedBackend {
    fn stream_reply(&self, request: ChatRequest) -> ChatStream {
        let message = request.message.clone();
        self.requests.lock().push(request);

        let next = self.script.lock().pop_front().unwrap_or(if self.echo_when_empty {
            ScriptedReply::Echo
        } else {
            ScriptedReply::Chunks(Vec::new())
        });

        match next {
            ScriptedReply::Chunks(chunks) => stream::iter(chunks).boxed(),
            ScriptedReply::Hang => stream::pending::<Result<ChatChunk>>().boxed(),
            ScriptedReply::Echo => {
                stream::iter(vec![Ok(ChatChunk::Text(format!("You said: {}", message)))]).boxed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> ChatRequest {
        ChatRequest::new(text, &[])
    }

    #[tokio::test]
    async fn test_script_is_consumed_in_order() {
        let backend = ScriptedBackend::new();
        backend.reply("first").reply("second");

        let first: Vec<_> = backend.stream_reply(request("a")).collect().await;
        assert!(matches!(&first[0], Ok(ChatChunk::Text(t)) if t == "first"));

        let second: Vec<_> = backend.stream_reply(request("b")).collect().await;
        assert!(matches!(&second[0], Ok(ChatChunk::Text(t)) if t == "second"));

        let empty: Vec<_> = backend.stream_reply(request("c")).collect().await;
        assert!(empty.is_empty());

        assert_eq!(backend.request_count(), 3);
        assert_eq!(backend.requests()[1].message, "b");
    }

    #[tokio::test]
    async fn test_echo_backend() {
        let backend = ScriptedBackend::echo();
        let reply: Vec<_> = backend.stream_reply(request("hello")).collect().await;
        assert!(matches!(&reply[0], Ok(ChatChunk::Text(t)) if t == "You said: hello"));
    }
}
