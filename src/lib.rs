// src/lib.rs

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod media;
pub mod persona;
pub mod prompt;
pub mod store;
pub mod web;

pub use chat::ChatService;
pub use config::AppConfig;
pub use error::{ChatError, Result};
