//! Chat session state
//!
//! Owns the message history and the single in-flight request. The UI thread
//! calls `poll()` once per frame to fold worker events into the history.

use super::backend::{ChatBackend, ChatRequest};
use super::http::HttpChatBackend;
use super::worker::{ChatEvent, ChatWorker, ChatWorkerHandle};
use crate::config::BackendConfig;
use crate::messages::{Message, MessageHistory, MessageId};
use crate::{ErrorReport, Result, VoxError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct ChatSession {
    history: MessageHistory,
    is_loading: bool,
    error: Option<ErrorReport>,
    /// Id of the request whose events are accepted
    pending_request: Option<u64>,
    next_request_id: u64,
    /// Model message currently receiving deltas
    streaming_message_id: Option<MessageId>,
    history_limit: usize,
    worker: ChatWorkerHandle,
}

impl ChatSession {
    /// Session talking to the HTTP backend described by `config`
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let backend = HttpChatBackend::new(config)?;
        info!("Chat backend at {}", backend.url());
        Self::new(Arc::new(backend), config)
    }

    /// Session over any backend
    pub fn new(backend: Arc<dyn ChatBackend>, config: &BackendConfig) -> Result<Self> {
        let worker = ChatWorker::new(backend, config.request_timeout()).start()?;

        Ok(Self {
            history: MessageHistory::new(),
            is_loading: false,
            error: None,
            pending_request: None,
            next_request_id: 1,
            streaming_message_id: None,
            history_limit: config.history_limit,
            worker,
        })
    }

    /// Send user text to the backend.
    ///
    /// Returns `false` without side effects when the trimmed text is empty or
    /// a request is already in flight.
    pub fn send_message(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if self.is_loading {
            warn!("Ignoring send while a request is in flight");
            return false;
        }

        let request = ChatRequest::new(text, self.history.recent(self.history_limit));
        self.history.push(Message::user(text));

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        if let Err(e) = self.worker.send(request_id, request) {
            self.error = Some(ErrorReport::from(&e));
            return false;
        }

        debug!("Dispatched request {}", request_id);
        self.pending_request = Some(request_id);
        self.is_loading = true;
        self.error = None;
        true
    }

    /// Apply pending worker events. Returns `true` if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(event) = self.worker.try_recv_event() {
            changed |= self.handle_event(event);
        }
        changed
    }

    fn handle_event(&mut self, event: ChatEvent) -> bool {
        if let ChatEvent::Shutdown = event {
            if self.pending_request.is_some() {
                self.fail(VoxError::ChannelError("Chat worker stopped".to_string()));
                return true;
            }
            return false;
        }

        if event.request_id() != self.pending_request {
            debug!("Ignoring event for stale request {:?}", event.request_id());
            return false;
        }

        match event {
            ChatEvent::Started { .. } => false,
            ChatEvent::Delta { text, .. } => {
                match self.streaming_message_id {
                    Some(id) => {
                        self.history.append_to_last(id, &text);
                    }
                    None => {
                        self.streaming_message_id = Some(self.history.push(Message::model(text)));
                    }
                }
                true
            }
            ChatEvent::Complete { text, sources, .. } => {
                let finalized = self
                    .streaming_message_id
                    .map(|id| self.history.finalize_last(id, text.clone(), sources.clone()))
                    .unwrap_or(false);
                if !finalized {
                    self.history.push(Message::model(text).with_sources(sources));
                }

                self.is_loading = false;
                self.error = None;
                self.pending_request = None;
                self.streaming_message_id = None;
                true
            }
            ChatEvent::Failed { error, .. } => {
                self.fail(error);
                true
            }
            ChatEvent::Shutdown => false,
        }
    }

    fn fail(&mut self, error: VoxError) {
        if let Some(id) = self.streaming_message_id.take() {
            self.history.remove_last_if(id);
        }
        if error.is_recoverable() {
            warn!("Chat request failed: {}", error);
        } else {
            error!("Chat request failed: {}", error);
        }
        self.error = Some(ErrorReport::from(&error));
        self.is_loading = false;
        self.pending_request = None;
    }

    /// Empty the history. Refused while a request is in flight.
    pub fn clear(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.history.clear();
        self.error = None;
        true
    }

    pub fn messages(&self) -> &[Message] {
        self.history.all()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.history.get(id)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Technical description of the last failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.detail.as_str())
    }

    pub fn error_report(&self) -> Option<&ErrorReport> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// The model message still receiving text, if any
    pub fn streaming_message_id(&self) -> Option<MessageId> {
        self.streaming_message_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::backend::{ChatChunk, ChatStream};
    use crate::messages::GroundingSource;
    use futures::{stream, StreamExt};
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    /// Replies from a script and records every request it sees
    struct ScriptedBackend {
        replies: Mutex<Vec<Vec<Result<ChatChunk>>>>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ChatBackend for ScriptedBackend {
        fn stream_reply(&self, request: ChatRequest) -> ChatStream {
            self.requests.lock().push(request);
            let mut replies = self.replies.lock();
            let reply = if replies.is_empty() {
                Vec::new()
            } else {
                replies.remove(0)
            };
            stream::iter(reply).boxed()
        }
    }

    fn session_with(
        replies: Vec<Vec<Result<ChatChunk>>>,
    ) -> (ChatSession, Arc<Mutex<Vec<ChatRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let backend = ScriptedBackend {
            replies: Mutex::new(replies),
            requests: requests.clone(),
        };
        let session = ChatSession::new(Arc::new(backend), &BackendConfig::default()).unwrap();
        (session, requests)
    }

    fn wait_idle(session: &mut ChatSession) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_loading() && Instant::now() < deadline {
            session.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!session.is_loading(), "request did not finish");
    }

    fn text(s: &str) -> Result<ChatChunk> {
        Ok(ChatChunk::Text(s.to_string()))
    }

    #[test]
    fn test_empty_send_is_noop() {
        let (mut session, requests) = session_with(Vec::new());
        assert!(!session.send_message("   \n"));
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
        assert!(requests.lock().is_empty());
    }

    #[test]
    fn test_streamed_reply_builds_one_message() {
        let (mut session, _) = session_with(vec![vec![
            text("The capital"),
            text(" is Paris."),
            Ok(ChatChunk::Sources(vec![GroundingSource::new(
                "https://en.wikipedia.org/wiki/Paris",
                "Paris",
            )])),
        ]]);

        assert!(session.send_message("  What is the capital of France?  "));
        assert!(session.is_loading());
        assert_eq!(session.messages()[0].text, "What is the capital of France?");

        wait_idle(&mut session);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_model());
        assert_eq!(messages[1].text, "The capital is Paris.");
        assert_eq!(messages[1].sources.len(), 1);
        assert!(session.error().is_none());
        assert!(session.streaming_message_id().is_none());
    }

    #[test]
    fn test_second_send_rejected_while_loading() {
        let (mut session, requests) = session_with(vec![vec![text("one")], vec![text("two")]]);

        assert!(session.send_message("first"));
        assert!(!session.send_message("second"));
        wait_idle(&mut session);

        assert_eq!(requests.lock().len(), 1);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_failure_removes_partial_reply_and_sets_error() {
        let (mut session, _) = session_with(vec![vec![
            text("Partial"),
            Err(VoxError::BackendError("500 Internal Server Error".to_string())),
        ]]);

        session.send_message("hello");
        wait_idle(&mut session);

        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].is_user());
        assert!(session.error().is_some_and(|e| !e.is_empty()));
        assert_eq!(
            session.error_report().map(|r| r.summary.as_str()),
            Some("The chat service could not be reached. Please try again.")
        );

        // still usable after a failure
        assert!(session.send_message("again"));
    }

    #[test]
    fn test_history_sent_with_next_request() {
        let (mut session, requests) = session_with(vec![vec![text("Hi!")], vec![text("Fine.")]]);

        session.send_message("hello");
        wait_idle(&mut session);
        session.send_message("how are you?");
        wait_idle(&mut session);

        let requests = requests.lock();
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[1].message, "how are you?");
        assert_eq!(requests[1].history.len(), 2);
        assert_eq!(requests[1].history[1].text, "Hi!");
    }

    #[test]
    fn test_clear_refused_while_loading() {
        let (mut session, _) = session_with(vec![vec![text("ok")]]);
        session.send_message("hi");
        assert!(!session.clear());
        wait_idle(&mut session);
        assert!(session.clear());
        assert!(session.messages().is_empty());
    }
}
