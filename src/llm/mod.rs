// src/llm/mod.rs
// LLM plumbing: upstream stream client, SSE parsing, word re-chunking, backends

pub mod backend;
pub mod chunker;
pub mod client;
pub mod sse;

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;

/// Lazy, forward-only sequence of raw assistant deltas
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Lazy sequence of trimmed word chunks
pub type WordStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

pub use backend::{Backend, DeltaSource, LiveBackend, MockBackend};
pub use chunker::{join_words, WordChunker, BOUNDARY_CHARS};
pub use client::{ChatMessage, CompletionRequest, HttpTransport, Transport, UpstreamClient};
