//! Chat session management
//!
//! This module provides:
//! - The `ChatBackend` seam and its HTTP implementation
//! - A worker thread that runs one backend request at a time
//! - `ChatSession`, the owner of the conversation history
//! - `ScriptedBackend` for tests and offline runs

pub mod backend;
pub mod http;
pub mod ndjson;
pub mod scripted;
pub mod session;
pub mod worker;

// Re-export commonly used types
pub use backend::{ChatBackend, ChatChunk, ChatRequest, ChatStream, HistoryEntry};
pub use http::HttpChatBackend;
pub use scripted::ScriptedBackend;
pub use session::ChatSession;
pub use worker::{ChatCommand, ChatEvent, ChatWorker, ChatWorkerHandle};
