// src/chat/mod.rs
// Chat session orchestrator: backend -> re-chunker -> caller

pub mod stream_session;

pub use stream_session::{ActiveStreams, SessionState, StreamInfo, StreamSession};

use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::error::Result;
use crate::llm::{Backend, DeltaSource, WordChunker, WordStream, join_words};

/// Single entry point for chat turns. Cheap to clone; every call builds its
/// own stream and session state.
#[derive(Clone)]
pub struct ChatService {
    source: Arc<dyn DeltaSource>,
    backend_name: &'static str,
    streams: ActiveStreams,
}

impl ChatService {
    pub fn new(backend: Backend) -> Self {
        let backend_name = backend.name();
        Self::with_source(Arc::new(backend), backend_name)
    }

    /// Use any delta source, e.g. a scripted one
    pub fn with_source(source: Arc<dyn DeltaSource>, backend_name: &'static str) -> Self {
        Self {
            source,
            backend_name,
            streams: ActiveStreams::new(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn active_streams(&self) -> &ActiveStreams {
        &self.streams
    }

    /// Stream one reply as word chunks.
    ///
    /// `session_id` is recorded for diagnostics only; every call is a
    /// stand-alone single turn. Words are yielded in upstream order as soon as
    /// they complete and the tail is flushed once at a clean end. A terminal
    /// error is the last item. Dropping the stream cancels the session and
    /// closes the upstream connection.
    pub fn stream_chat(&self, role: &str, session_id: Option<&str>, user_text: &str) -> WordStream {
        let source = self.source.clone();
        let role = role.to_string();
        let user_text = user_text.to_string();
        let mut session = StreamSession::start(self.streams.clone(), &role, session_id);

        info!(
            stream_id = %session.id(),
            role = %role,
            backend = self.backend_name,
            "Starting chat stream"
        );

        Box::pin(async_stream::stream! {
            session.advance(SessionState::Connecting);
            let mut deltas = source.produce(&role, &user_text).await;
            let mut chunker = WordChunker::new();

            while let Some(delta) = deltas.next().await {
                match delta {
                    Ok(delta) => {
                        if session.state() == SessionState::Connecting {
                            session.advance(SessionState::Streaming);
                        }
                        for word in chunker.push(&delta) {
                            session.record_word();
                            yield Ok(word);
                        }
                    }
                    Err(e) => {
                        // the partial word is dropped, never flushed
                        warn!(stream_id = %session.id(), pending = chunker.pending().len(), error = %e, "Chat stream failed");
                        session.advance(SessionState::Failed);
                        yield Err(e);
                        return;
                    }
                }
            }

            if let Some(word) = chunker.flush() {
                session.record_word();
                yield Ok(word);
            }
            session.advance(SessionState::Completed);
        })
    }

    /// Run a turn to completion and return the reply as display text
    pub async fn complete_chat(
        &self,
        role: &str,
        session_id: Option<&str>,
        user_text: &str,
    ) -> Result<String> {
        let mut stream = self.stream_chat(role, session_id, user_text);
        let mut words = Vec::new();
        while let Some(word) = stream.next().await {
            words.push(word?);
        }
        Ok(join_words(&words))
    }
}
