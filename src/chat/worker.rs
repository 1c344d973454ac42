//! Chat worker thread
//!
//! Runs backend requests one at a time on a dedicated thread with its own
//! tokio runtime. Commands go in and events come out over crossbeam
//! channels, so the UI thread only ever does non-blocking `try_recv`.

use super::backend::{ChatBackend, ChatChunk, ChatRequest};
use crate::messages::GroundingSource;
use crate::{Result, VoxError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use futures::StreamExt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Commands sent to the chat worker
#[derive(Clone, Debug)]
pub enum ChatCommand {
    /// Run one request; events carry `request_id` back
    Send { request_id: u64, request: ChatRequest },
    /// Shutdown the worker
    Shutdown,
}

/// Events emitted by the chat worker
#[derive(Clone, Debug)]
pub enum ChatEvent {
    /// Request accepted and in flight
    Started { request_id: u64 },
    /// Streamed text to append
    Delta { request_id: u64, text: String },
    /// Reply finished
    Complete {
        request_id: u64,
        text: String,
        sources: Vec<GroundingSource>,
    },
    /// Request failed; nothing more follows for this id
    Failed { request_id: u64, error: VoxError },
    /// Worker shut down
    Shutdown,
}

impl ChatEvent {
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ChatEvent::Started { request_id }
            | ChatEvent::Delta { request_id, .. }
            | ChatEvent::Complete { request_id, .. }
            | ChatEvent::Failed { request_id, .. } => Some(*request_id),
            ChatEvent::Shutdown => None,
        }
    }
}

/// Handle for interacting with a running chat worker
pub struct ChatWorkerHandle {
    command_tx: Sender<ChatCommand>,
    event_rx: Receiver<ChatEvent>,
    worker_handle: Option<JoinHandle<()>>,
}

impl ChatWorkerHandle {
    /// Queue a request
    pub fn send(&self, request_id: u64, request: ChatRequest) -> Result<()> {
        self.command_tx
            .send(ChatCommand::Send { request_id, request })
            .map_err(|e| VoxError::ChannelError(format!("Failed to send chat request: {}", e)))
    }

    /// Try to receive an event without blocking
    pub fn try_recv_event(&self) -> Option<ChatEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, blocking up to `timeout`
    #[cfg(test)]
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ChatEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stop the worker and wait for its thread
    #[cfg(test)]
    pub fn shutdown(mut self) -> Result<()> {
        let _ = self.command_tx.send(ChatCommand::Shutdown);
        if let Some(handle) = self.worker_handle.take() {
            handle
                .join()
                .map_err(|_| VoxError::ChannelError("Chat worker thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ChatWorkerHandle {
    fn drop(&mut self) {
        // Detach instead of joining: an in-flight request may take up to the
        // request timeout to notice.
        let _ = self.command_tx.try_send(ChatCommand::Shutdown);
        if let Some(handle) = self.worker_handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

/// Spawns the worker thread for a backend
pub struct ChatWorker {
    backend: Arc<dyn ChatBackend>,
    request_timeout: Duration,
}

impl ChatWorker {
    pub fn new(backend: Arc<dyn ChatBackend>, request_timeout: Duration) -> Self {
        Self {
            backend,
            request_timeout,
        }
    }

    /// Start the worker thread
    pub fn start(self) -> Result<ChatWorkerHandle> {
        let (command_tx, command_rx) = bounded::<ChatCommand>(16);
        // Unbounded so a stalled UI never blocks the worker inside the
        // request timeout
        let (event_tx, event_rx) = unbounded::<ChatEvent>();

        let worker_handle = std::thread::Builder::new()
            .name("chat-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        let _ = event_tx.send(ChatEvent::Shutdown);
                        return;
                    }
                };

                runtime.block_on(worker_loop(
                    self.backend,
                    self.request_timeout,
                    command_rx,
                    event_tx,
                ));
            })
            .map_err(|e| VoxError::ChannelError(format!("Failed to spawn chat worker: {}", e)))?;

        Ok(ChatWorkerHandle {
            command_tx,
            event_rx,
            worker_handle: Some(worker_handle),
        })
    }
}

enum Outcome {
    Done {
        text: String,
        sources: Vec<GroundingSource>,
    },
    Failed(VoxError),
    ShutdownRequested,
}

async fn worker_loop(
    backend: Arc<dyn ChatBackend>,
    request_timeout: Duration,
    command_rx: Receiver<ChatCommand>,
    event_tx: Sender<ChatEvent>,
) {
    info!("Chat worker started (timeout {:?})", request_timeout);

    loop {
        let command = match command_rx.recv() {
            Ok(cmd) => cmd,
            Err(_) => {
                info!("Command channel closed, shutting down");
                break;
            }
        };

        let (request_id, request) = match command {
            ChatCommand::Send { request_id, request } => (request_id, request),
            ChatCommand::Shutdown => break,
        };

        debug!("Request {} started", request_id);
        if event_tx.send(ChatEvent::Started { request_id }).is_err() {
            error!("Event channel closed");
            break;
        }

        let outcome = match tokio::time::timeout(
            request_timeout,
            run_request(backend.as_ref(), request_id, request, &command_rx, &event_tx),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Request {} timed out after {:?}", request_id, request_timeout);
                Outcome::Failed(VoxError::Timeout(request_timeout))
            }
        };

        let event = match outcome {
            Outcome::Done { text, .. } if text.trim().is_empty() => ChatEvent::Failed {
                request_id,
                error: VoxError::BackendError("Empty response from chat backend".to_string()),
            },
            Outcome::Done { text, sources } => {
                debug!("Request {} complete ({} chars)", request_id, text.len());
                ChatEvent::Complete {
                    request_id,
                    text,
                    sources,
                }
            }
            Outcome::Failed(error) => {
                warn!("Request {} failed: {}", request_id, error);
                ChatEvent::Failed { request_id, error }
            }
            Outcome::ShutdownRequested => break,
        };

        if event_tx.send(event).is_err() {
            error!("Event channel closed");
            break;
        }
    }

    let _ = event_tx.send(ChatEvent::Shutdown);
    info!("Chat worker stopped");
}

async fn run_request(
    backend: &dyn ChatBackend,
    request_id: u64,
    request: ChatRequest,
    command_rx: &Receiver<ChatCommand>,
    event_tx: &Sender<ChatEvent>,
) -> Outcome {
    let mut stream = backend.stream_reply(request);
    let mut text = String::new();
    let mut sources = Vec::new();

    while let Some(item) = stream.next().await {
        // The session never queues a second request while one is in flight,
        // so anything waiting here is a shutdown or a closed channel.
        match command_rx.try_recv() {
            Ok(ChatCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                return Outcome::ShutdownRequested;
            }
            Ok(ChatCommand::Send { request_id: queued, .. }) => {
                warn!("Dropping request {} queued behind {}", queued, request_id);
            }
            Err(TryRecvError::Empty) => {}
        }

        match item {
            Ok(ChatChunk::Text(delta)) => {
                if delta.is_empty() {
                    continue;
                }
                text.push_str(&delta);
                if event_tx
                    .send(ChatEvent::Delta {
                        request_id,
                        text: delta,
                    })
                    .is_err()
                {
                    return Outcome::ShutdownRequested;
                }
            }
            Ok(ChatChunk::Sources(mut more)) => sources.append(&mut more),
            Err(error) => return Outcome::Failed(error),
        }
    }

    Outcome::Done { text, sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::backend::ChatStream;
    use futures::stream;

    struct FixedBackend(Vec<Result<ChatChunk>>);

    impl ChatBackend for FixedBackend {
        fn stream_reply(&self, _request: ChatRequest) -> ChatStream {
            stream::iter(self.0.clone()).boxed()
        }
    }

    struct PendingBackend;

    impl ChatBackend for PendingBackend {
        fn stream_reply(&self, _request: ChatRequest) -> ChatStream {
            stream::pending::<Result<ChatChunk>>().boxed()
        }
    }

    fn collect_until_terminal(handle: &ChatWorkerHandle) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.recv_event_timeout(Duration::from_secs(5)) {
            let terminal = matches!(
                event,
                ChatEvent::Complete { .. } | ChatEvent::Failed { .. } | ChatEvent::Shutdown
            );
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[test]
    fn test_worker_streams_deltas_then_completes() {
        let backend = FixedBackend(vec![
            Ok(ChatChunk::Text("Hello".to_string())),
            Ok(ChatChunk::Text(", world".to_string())),
            Ok(ChatChunk::Sources(vec![GroundingSource::new("https://a.example", "A")])),
        ]);
        let handle = ChatWorker::new(Arc::new(backend), Duration::from_secs(5))
            .start()
            .unwrap();

        handle.send(7, ChatRequest::new("hi", &[])).unwrap();
        let events = collect_until_terminal(&handle);

        assert!(matches!(events[0], ChatEvent::Started { request_id: 7 }));
        assert!(matches!(&events[1], ChatEvent::Delta { text, .. } if text == "Hello"));
        match events.last().unwrap() {
            ChatEvent::Complete { request_id, text, sources } => {
                assert_eq!(*request_id, 7);
                assert_eq!(text, "Hello, world");
                assert_eq!(sources.len(), 1);
            }
            other => panic!("expected completion, got {:?}", other),
        }

        handle.shutdown().unwrap();
    }

    #[test]
    fn test_empty_reply_is_an_error() {
        let handle = ChatWorker::new(Arc::new(FixedBackend(Vec::new())), Duration::from_secs(5))
            .start()
            .unwrap();

        handle.send(1, ChatRequest::new("hi", &[])).unwrap();
        let events = collect_until_terminal(&handle);
        assert!(matches!(
            events.last(),
            Some(ChatEvent::Failed { error: VoxError::BackendError(_), .. })
        ));
    }

    #[test]
    fn test_long_reply_completes_while_nobody_drains() {
        let mut chunks: Vec<Result<ChatChunk>> = (0..2000)
            .map(|i| Ok(ChatChunk::Text(format!("{} ", i))))
            .collect();
        chunks.push(Ok(ChatChunk::Text("done".to_string())));
        let handle = ChatWorker::new(Arc::new(FixedBackend(chunks)), Duration::from_secs(5))
            .start()
            .unwrap();

        handle.send(1, ChatRequest::new("count", &[])).unwrap();
        std::thread::sleep(Duration::from_millis(500));

        let mut events = Vec::new();
        while let Some(event) = handle.try_recv_event() {
            events.push(event);
        }
        assert_eq!(events.len(), 2003);
        assert!(matches!(events.last(), Some(ChatEvent::Complete { text, .. }) if text.ends_with("1999 done")));
    }

    #[test]
    fn test_drop_does_not_wait_for_inflight_request() {
        let handle = ChatWorker::new(Arc::new(PendingBackend), Duration::from_secs(60))
            .start()
            .unwrap();
        handle.send(1, ChatRequest::new("hi", &[])).unwrap();

        let started = std::time::Instant::now();
        drop(handle);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_request_times_out() {
        let handle = ChatWorker::new(Arc::new(PendingBackend), Duration::from_millis(50))
            .start()
            .unwrap();

        handle.send(3, ChatRequest::new("hi", &[])).unwrap();
        let events = collect_until_terminal(&handle);
        assert!(matches!(
            events.last(),
            Some(ChatEvent::Failed { request_id: 3, error: VoxError::Timeout(_) })
        ));
    }
}
