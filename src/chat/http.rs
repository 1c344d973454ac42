//! HTTP chat backend using reqwest
//!
//! Sends `POST {base_url}{path_prefix}/chat` and accepts either a complete
//! JSON reply or an NDJSON stream of deltas.

use super::backend::{ChatBackend, ChatChunk, ChatRequest, ChatStream};
use super::ndjson::{parse_line, FullReply, NdjsonDecoder};
use crate::config::BackendConfig;
use crate::{Result, VoxError};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::debug;

/// Chat backend reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpChatBackend {
    client: Client,
    url: String,
}

impl HttpChatBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("voxchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VoxError::BackendError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.chat_url(),
        })
    }

    /// Endpoint this backend posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChatBackend for HttpChatBackend {
    fn stream_reply(&self, request: ChatRequest) -> ChatStream {
        reply_stream(self.client.clone(), self.url.clone(), request).boxed()
    }
}

fn reply_stream(
    client: Client,
    url: String,
    request: ChatRequest,
) -> impl Stream<Item = Result<ChatChunk>> + Send {
    try_stream! {
        debug!("POST {} ({} history entries)", url, request.history.len());

        let response = client
            .post(&url)
            .header(ACCEPT, "application/x-ndjson, application/json")
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        if is_ndjson(&response) {
            let mut decoder = NdjsonDecoder::new();
            let mut body = response.bytes_stream();

            while let Some(bytes) = body.next().await {
                let bytes = bytes?;
                for line in decoder.push(&bytes) {
                    for chunk in parse_line(&line)? {
                        yield chunk;
                    }
                }
            }

            if let Some(line) = decoder.finish() {
                for chunk in parse_line(&line)? {
                    yield chunk;
                }
            }
        } else {
            let reply: FullReply = response
                .json()
                .await
                .map_err(|e| VoxError::BackendError(format!("Malformed reply: {}", e)))?;
            for chunk in reply.into_chunks() {
                yield chunk;
            }
        }
    }
}

fn is_ndjson(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("ndjson"))
        .unwrap_or(false)
}

/// Turn a non-success status into a backend error carrying the body's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(VoxError::BackendError(format!(
        "{}: {}",
        status,
        error_detail(&body)
    )))
}

/// Prefer an `{"error": "..."}` field, fall back to the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
