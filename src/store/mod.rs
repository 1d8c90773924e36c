// src/store/mod.rs
// Conversation session store with idle expiry.
//
// Sessions map a session id to a character and an ordered message history.
// A session idle for at least the TTL is gone; expired entries are swept
// lazily whenever a new session is created.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ChatError, Result};

/// One stored chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageItem {
    pub id: String,
    pub role: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageItem {
    pub fn new(role: &str, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: role.to_string(),
            text: text.into(),
            audio_url: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the recording a spoken turn was transcribed from
    pub fn with_audio(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = Some(audio_url.into());
        self
    }
}

/// One page of history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub items: Vec<MessageItem>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// New session bound to `character_id`; returns its id
    async fn create(&self, character_id: &str) -> String;

    async fn character_of(&self, session_id: &str) -> Result<String>;

    async fn append(&self, session_id: &str, message: MessageItem) -> Result<()>;

    /// Oldest-first page starting at `cursor` (an offset)
    async fn list(&self, session_id: &str, limit: usize, cursor: Option<&str>) -> Result<MessagePage>;
}

#[derive(Debug)]
struct SessionRecord {
    character_id: String,
    messages: VecDeque<MessageItem>,
    last_active: DateTime<Utc>,
}

impl SessionRecord {
    fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_active >= ttl
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    ttl: chrono::Duration,
    history_cap: usize,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, history_cap: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            history_cap: history_cap.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired sessions; returns how many were removed
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now, self.ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
        removed
    }

    /// Live record for `session_id`, refreshing its activity time
    fn touch<'a>(
        sessions: &'a mut HashMap<String, SessionRecord>,
        session_id: &str,
        ttl: chrono::Duration,
    ) -> Result<&'a mut SessionRecord> {
        let now = Utc::now();
        let expired = match sessions.get(session_id) {
            Some(record) => record.is_expired(now, ttl),
            None => return Err(ChatError::SessionNotFound(session_id.to_string())),
        };
        if expired {
            sessions.remove(session_id);
            return Err(ChatError::SessionNotFound(session_id.to_string()));
        }
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;
        record.last_active = now;
        Ok(record)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, character_id: &str) -> String {
        self.sweep().await;

        let session_id = Uuid::new_v4().to_string();
        let record = SessionRecord {
            character_id: character_id.to_string(),
            messages: VecDeque::new(),
            last_active: Utc::now(),
        };
        self.sessions.write().await.insert(session_id.clone(), record);
        debug!(session_id = %session_id, character_id = %character_id, "Session created");
        session_id
    }

    async fn character_of(&self, session_id: &str) -> Result<String> {
        let mut sessions = self.sessions.write().await;
        let record = Self::touch(&mut sessions, session_id, self.ttl)?;
        Ok(record.character_id.clone())
    }

    async fn append(&self, session_id: &str, message: MessageItem) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let record = Self::touch(&mut sessions, session_id, self.ttl)?;
        record.messages.push_back(message);
        while record.messages.len() > self.history_cap {
            record.messages.pop_front();
        }
        Ok(())
    }

    async fn list(&self, session_id: &str, limit: usize, cursor: Option<&str>) -> Result<MessagePage> {
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| ChatError::InvalidInput(format!("bad cursor '{}'", c)))?,
            None => 0,
        };

        let mut sessions = self.sessions.write().await;
        let record = Self::touch(&mut sessions, session_id, self.ttl)?;

        let total = record.messages.len();
        let items: Vec<MessageItem> = record.messages.iter().skip(start).take(limit).cloned().collect();
        let end = start.saturating_add(items.len());
        let next_cursor = (end < total && !items.is_empty()).then(|| end.to_string());

        Ok(MessagePage { items, next_cursor })
    }
}
