// src/web/chat.rs
// Chat endpoints: word-by-word SSE stream and one-shot completion

use std::convert::Infallible;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::persona::DEFAULT_ROLE;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    #[serde(default = "default_role")]
    pub role: String,
    pub session_id: Option<String>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Body of the streaming endpoint; a missing text streams nothing
#[derive(Debug, Default, Deserialize)]
pub struct StreamBody {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBody {
    #[serde(default = "default_role")]
    pub character_id: String,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct CompletionReply {
    pub text: String,
}

/// POST /api/chat/stream
///
/// One `message` event per word. A failure becomes a single `error` event
/// and ends the stream. Dropping the response cancels the upstream.
pub async fn stream_handler(
    State(state): State<AppState>,
    query: Result<Query<StreamQuery>, QueryRejection>,
    body: Result<Json<StreamBody>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Query(query) = query?;
    let Json(body) = body?;
    let words = state
        .chat
        .stream_chat(&query.role, query.session_id.as_deref(), &body.text);

    let events = words.map(|item| {
        Ok(match item {
            Ok(word) => Event::default().event("message").data(word),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// POST /v1/chat
///
/// Answers the last user turn with the character's persona.
pub async fn completion_handler(
    State(state): State<AppState>,
    body: Result<Json<CompletionBody>, JsonRejection>,
) -> ApiResult<Json<CompletionReply>> {
    let Json(body) = body?;
    let user_text = last_user_turn(&body.messages)
        .ok_or_else(|| ApiError::bad_request("messages must contain a user turn"))?;

    debug!(character_id = %body.character_id, turns = body.messages.len(), "Completion request");
    let text = state.chat.complete_chat(&body.character_id, None, user_text).await?;
    Ok(Json(CompletionReply { text }))
}

fn last_user_turn(messages: &[ChatTurn]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|turn| turn.role.eq_ignore_ascii_case("user"))
        .map(|turn| turn.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_last_user_turn() {
        let turns = vec![
            turn("user", "first"),
            turn("assistant", "reply"),
            turn("User", "second"),
            turn("assistant", "reply"),
        ];
        assert_eq!(last_user_turn(&turns), Some("second"));
        assert_eq!(last_user_turn(&[turn("assistant", "hi")]), None);
        assert_eq!(last_user_turn(&[]), None);
    }

    #[test]
    fn test_stream_query_defaults() {
        let query: StreamQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.role, "default");
        assert!(query.session_id.is_none());

        let query: StreamQuery = serde_json::from_str(r#"{"role":"harry","sessionId":"s-1"}"#).unwrap();
        assert_eq!(query.session_id.as_deref(), Some("s-1"));
    }
}
