// src/chat/stream_session.rs
// Per-request stream lifecycle and the shared set of live streams

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// CREATED → CONNECTING → STREAMING → COMPLETED | FAILED, with CANCELLED
/// reachable from any non-terminal state when the consumer goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Created, Connecting) | (Created, Cancelled) => true,
            // an upstream that closes without text completes from Connecting
            (Connecting, Streaming | Completed | Failed | Cancelled) => true,
            (Streaming, Completed | Failed | Cancelled) => true,
            _ => false,
        }
    }
}

/// Snapshot of one live stream
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: Uuid,
    pub role: String,
    pub session_id: Option<String>,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
}

/// Streams that have not reached a terminal state. Entries are only
/// inserted and removed; sessions never read each other's state.
#[derive(Debug, Clone, Default)]
pub struct ActiveStreams {
    inner: Arc<Mutex<HashMap<Uuid, StreamInfo>>>,
}

impl ActiveStreams {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_map<R>(&self, f: impl FnOnce(&mut HashMap<Uuid, StreamInfo>) -> R) -> R {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut map)
    }

    pub fn len(&self) -> usize {
        self.with_map(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<StreamInfo> {
        self.with_map(|map| map.values().cloned().collect())
    }

    fn insert(&self, info: StreamInfo) {
        self.with_map(|map| map.insert(info.id, info));
    }

    fn set_state(&self, id: Uuid, state: SessionState) {
        self.with_map(|map| {
            if let Some(info) = map.get_mut(&id) {
                info.state = state;
            }
        });
    }

    fn remove(&self, id: Uuid) {
        self.with_map(|map| map.remove(&id));
    }
}

/// Lifecycle guard owned by one streaming request.
///
/// Dropping it before a terminal state records CANCELLED.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    role: String,
    state: SessionState,
    words: usize,
    registry: ActiveStreams,
}

impl StreamSession {
    pub fn start(registry: ActiveStreams, role: &str, session_id: Option<&str>) -> Self {
        let id = Uuid::new_v4();
        registry.insert(StreamInfo {
            id,
            role: role.to_string(),
            session_id: session_id.map(str::to_string),
            state: SessionState::Created,
            started_at: Utc::now(),
        });
        debug!(stream_id = %id, role = %role, session_id = ?session_id, "Stream session created");

        Self {
            id,
            role: role.to_string(),
            state: SessionState::Created,
            words: 0,
            registry,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Count one forwarded word chunk
    pub fn record_word(&mut self) {
        self.words += 1;
    }

    /// Move to `next`; invalid transitions are logged and ignored
    pub fn advance(&mut self, next: SessionState) {
        if !self.state.can_advance_to(next) {
            warn!(stream_id = %self.id, from = ?self.state, to = ?next, "Ignoring invalid stream transition");
            return;
        }
        self.state = next;

        if next.is_terminal() {
            self.registry.remove(self.id);
            info!(
                stream_id = %self.id,
                role = %self.role,
                state = ?next,
                words = self.words,
                "Stream session finished"
            );
        } else {
            self.registry.set_state(self.id, next);
            debug!(stream_id = %self.id, state = ?next, "Stream session advanced");
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.advance(SessionState::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_of(registry: &ActiveStreams, id: Uuid) -> Option<SessionState> {
        registry
            .snapshot()
            .into_iter()
            .find(|info| info.id == id)
            .map(|info| info.state)
    }

    #[test]
    fn test_happy_path_transitions() {
        let registry = ActiveStreams::new();
        let mut session = StreamSession::start(registry.clone(), "harry", Some("s-1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(state_of(&registry, session.id()), Some(SessionState::Created));

        session.advance(SessionState::Connecting);
        session.advance(SessionState::Streaming);
        assert_eq!(state_of(&registry, session.id()), Some(SessionState::Streaming));

        session.advance(SessionState::Completed);
        assert_eq!(session.state(), SessionState::Completed);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_no_transition_back() {
        let registry = ActiveStreams::new();
        let mut session = StreamSession::start(registry, "harry", None);
        session.advance(SessionState::Connecting);
        session.advance(SessionState::Failed);
        session.advance(SessionState::Streaming);
        assert_eq!(session.state(), SessionState::Failed);

        let mut other = StreamSession::start(ActiveStreams::new(), "harry", None);
        other.advance(SessionState::Streaming);
        assert_eq!(other.state(), SessionState::Created);
    }

    #[test]
    fn test_drop_cancels_and_unregisters() {
        let registry = ActiveStreams::new();
        {
            let mut session = StreamSession::start(registry.clone(), "harry", None);
            session.advance(SessionState::Connecting);
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SessionState::Streaming).unwrap();
        assert_eq!(json, "\"streaming\"");

        let registry = ActiveStreams::new();
        let session = StreamSession::start(registry.clone(), "harry", Some("s-9"));
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json[0]["id"], session.id().to_string());
        assert_eq!(json[0]["sessionId"], "s-9");
        assert_eq!(json[0]["state"], "created");
        assert!(json[0]["startedAt"].is_string());
    }
}
