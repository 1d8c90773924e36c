// src/error.rs
// Error types shared by the relay core and its HTTP front-end

use thiserror::Error;

/// Main error type for persona-relay
#[derive(Error, Debug)]
pub enum ChatError {
    /// Connection, DNS or mid-stream read failure talking to the LLM
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The LLM answered with a non-success status before streaming
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// Persona resource missing; always recovered by falling back to the default
    #[error("persona not found: {0}")]
    PersonaNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// TTS/ASR vendor failure
    #[error("media service error: {0}")]
    Media(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using ChatError
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Failures that end a chat stream early and come from the LLM side
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ChatError::UpstreamUnavailable(_) | ChatError::UpstreamStatus { .. }
        )
    }
}
