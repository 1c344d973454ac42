//! Newline-delimited JSON reply decoding

use super::backend::ChatChunk;
use crate::messages::GroundingSource;
use crate::{Result, VoxError};
use serde::Deserialize;

/// Complete (non-streamed) reply body
#[derive(Debug, Deserialize)]
pub struct FullReply {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
}

impl FullReply {
    pub fn into_chunks(self) -> Vec<ChatChunk> {
        let mut chunks = vec![ChatChunk::Text(self.text)];
        if !self.sources.is_empty() {
            chunks.push(ChatChunk::Sources(self.sources));
        }
        chunks
    }
}

/// One line of a streamed reply
#[derive(Debug, Default, Deserialize)]
struct ReplyLine {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sources: Option<Vec<GroundingSource>>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one NDJSON line into chunks. Blank lines yield nothing.
pub fn parse_line(line: &str) -> Result<Vec<ChatChunk>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let parsed: ReplyLine = serde_json::from_str(line)
        .map_err(|e| VoxError::BackendError(format!("Malformed reply line: {}", e)))?;

    if let Some(error) = parsed.error {
        return Err(VoxError::BackendError(error));
    }

    let mut chunks = Vec::new();
    if let Some(text) = parsed.text {
        if !text.is_empty() {
            chunks.push(ChatChunk::Text(text));
        }
    }
    if let Some(sources) = parsed.sources {
        if !sources.is_empty() {
            chunks.push(ChatChunk::Sources(sources));
        }
    }
    Ok(chunks)
}

/// Splits a byte stream into complete lines.
///
/// Network chunks may end in the middle of a line or of a UTF-8 sequence;
/// bytes are buffered until a newline arrives.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
        }
        lines
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_handles_split_lines() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(b"{\"text\":\"Hel").is_empty());
        let lines = decoder.push(b"lo\"}\n{\"text\":\" world\"}\n{\"sour");
        assert_eq!(lines, vec!["{\"text\":\"Hello\"}", "{\"text\":\" world\"}"]);
        assert_eq!(decoder.finish().as_deref(), Some("{\"sour"));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_keeps_multibyte_chars_across_chunks() {
        let mut decoder = NdjsonDecoder::new();
        let bytes = "{\"text\":\"caf\u{e9}\"}\n".as_bytes();
        let (a, b) = bytes.split_at(13);
        assert!(decoder.push(a).is_empty());
        let lines = decoder.push(b);
        assert_eq!(lines[0], "{\"text\":\"caf\u{e9}\"}");
    }

    #[test]
    fn test_parse_line_text_and_sources() {
        let chunks = parse_line(
            r#"{"text":"Paris","sources":[{"uri":"https://en.wikipedia.org/wiki/Paris","title":"Paris"}]}"#,
        )
        .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], ChatChunk::Text("Paris".to_string()));
        match &chunks[1] {
            ChatChunk::Sources(sources) => assert_eq!(sources[0].title, "Paris"),
            other => panic!("unexpected chunk {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_error_and_garbage() {
        assert!(parse_line("   ").unwrap().is_empty());
        assert!(matches!(
            parse_line(r#"{"error":"quota exceeded"}"#),
            Err(VoxError::BackendError(msg)) if msg == "quota exceeded"
        ));
        assert!(parse_line("not json").is_err());
    }

    #[test]
    fn test_full_reply_chunks() {
        let reply: FullReply = serde_json::from_str(r#"{"text":"Hi there"}"#).unwrap();
        assert_eq!(reply.into_chunks(), vec![ChatChunk::Text("Hi there".to_string())]);
    }
}
