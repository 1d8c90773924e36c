// src/web/state.rs

use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::media::{AsrClient, TtsClient};
use crate::store::{InMemorySessionStore, SessionStore};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub sessions: Arc<dyn SessionStore>,
    pub tts: TtsClient,
    pub asr: AsrClient,
}

impl AppState {
    pub fn new(chat: ChatService, config: &AppConfig) -> Self {
        Self {
            chat,
            sessions: Arc::new(InMemorySessionStore::new(
                config.session_ttl,
                config.session_history_cap,
            )),
            tts: TtsClient::new(&config.media),
            asr: AsrClient::new(&config.media),
        }
    }
}
