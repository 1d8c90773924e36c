// src/persona/default.rs
//! Built-in persona used when no persona file can be found.

/// Last-resort persona text
pub const DEFAULT_PERSONA_PROMPT: &str =
    "You are a helpful AI assistant. Answer briefly in Chinese.";

/// Role identifier used when the caller names none
pub const DEFAULT_ROLE: &str = "default";
