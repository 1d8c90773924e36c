// src/llm/sse.rs
// Chat-completions SSE parsing: bytes -> lines -> frames -> deltas

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace};

use super::DeltaStream;
use crate::error::Result;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One parsed line of the upstream event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Non-empty assistant text
    Delta(String),
    /// `data: [DONE]`
    Done,
    /// Anything else: comments, `event:` lines, keep-alives, empty deltas
    Ignored,
    /// A data line whose payload is not a chunk object; skipped
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Classify a single line (without its newline)
pub fn parse_frame(line: &str) -> Frame {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    let chunk: ChatChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => return Frame::Malformed(e.to_string()),
    };

    let Some(first) = chunk.choices.into_iter().next() else {
        return Frame::Ignored;
    };

    match first.delta.and_then(|d| d.content) {
        Some(content) if !content.is_empty() => Frame::Delta(content),
        _ => Frame::Ignored,
    }
}

/// Splits a byte stream into lines. Works on raw bytes so a multi-byte
/// character split across network chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes; returns every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Final unterminated line at end of input, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Turn the raw response body into the lazy sequence of text deltas.
///
/// Ends cleanly on the sentinel or when the body closes. Malformed frames are
/// skipped. A read error is yielded once and ends the sequence.
pub fn delta_stream<S>(body: S) -> DeltaStream
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut lines = LineBuffer::new();
        let mut frame_count = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!(frames = frame_count, error = %e, "Upstream read failed");
                    yield Err(e);
                    return;
                }
            };

            for line in lines.push(&chunk) {
                frame_count += 1;
                match parse_frame(&line) {
                    Frame::Delta(text) => yield Ok(text),
                    Frame::Done => {
                        debug!(frames = frame_count, "Upstream sent [DONE]");
                        return;
                    }
                    Frame::Ignored => {}
                    Frame::Malformed(reason) => {
                        trace!(frame = frame_count, %reason, "Skipping malformed frame");
                    }
                }
            }
        }

        if let Some(line) = lines.finish() {
            if let Frame::Delta(text) = parse_frame(&line) {
                yield Ok(text);
            }
        }
        debug!(frames = frame_count, "Upstream closed the stream");
    })
}
