// src/prompt/mod.rs
// Prompt building: persona + behavioural instructions

pub mod builder;

pub use builder::{build_prompt, strip_conversation, system_prompt, CONVERSATION_MARKER};
