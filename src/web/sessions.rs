// src/web/sessions.rs
// Conversation sessions: create, send a turn, page through history

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::store::{MessageItem, MessagePage};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuery {
    pub character_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendText {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVoice {
    pub audio_url: String,
    pub audio_format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReply {
    pub user_message: MessageItem,
    pub assistant_message: MessageItem,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

/// POST /api/v1/sessions?characterId=
pub async fn create_handler(
    State(state): State<AppState>,
    query: Result<Query<CreateQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<CreatedSession>)> {
    let Query(query) = query?;
    let character_id = query.character_id.trim();
    if character_id.is_empty() {
        return Err(ApiError::bad_request("characterId must not be empty"));
    }
    let session_id = state.sessions.create(character_id).await;
    Ok((StatusCode::CREATED, Json(CreatedSession { session_id })))
}

/// Store the user turn, generate the reply, store it.
///
/// The user turn is stored before the reply is generated, so a failed
/// reply still leaves it in the history.
async fn run_turn(
    state: &AppState,
    session_id: &str,
    character_id: &str,
    user_message: MessageItem,
) -> ApiResult<SendReply> {
    state.sessions.append(session_id, user_message.clone()).await?;

    let reply = state
        .chat
        .complete_chat(character_id, Some(session_id), &user_message.text)
        .await?;

    let assistant_message = MessageItem::new("assistant", reply);
    state
        .sessions
        .append(session_id, assistant_message.clone())
        .await?;

    info!(
        session_id = %session_id,
        character_id = %character_id,
        spoken = user_message.audio_url.is_some(),
        reply_chars = assistant_message.text.chars().count(),
        "Session turn completed"
    );

    Ok(SendReply {
        user_message,
        assistant_message,
    })
}

/// POST /api/v1/sessions/{id}/messages
pub async fn send_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<SendText>, JsonRejection>,
) -> ApiResult<Json<SendReply>> {
    let Json(body) = body?;
    let text = body.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    let character_id = state.sessions.character_of(&session_id).await?;

    let reply = run_turn(&state, &session_id, &character_id, MessageItem::new("user", text)).await?;
    Ok(Json(reply))
}

/// POST /api/v1/sessions/{id}/voice
///
/// Transcribes the recording and runs it as a user turn that keeps the
/// audio URL.
pub async fn voice_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<SendVoice>, JsonRejection>,
) -> ApiResult<Json<SendReply>> {
    let Json(body) = body?;
    if body.audio_url.trim().is_empty() {
        return Err(ApiError::bad_request("audioUrl is required"));
    }
    // Unknown sessions fail before the paid ASR call
    let character_id = state.sessions.character_of(&session_id).await?;

    let transcript = state
        .asr
        .transcribe(&body.audio_url, body.audio_format.as_deref())
        .await?;
    if transcript.text.is_empty() {
        return Err(ApiError::bad_request("no speech recognized in audio"));
    }

    let user_message = MessageItem::new("user", transcript.text).with_audio(transcript.audio_url);
    let reply = run_turn(&state, &session_id, &character_id, user_message).await?;
    Ok(Json(reply))
}

/// GET /api/v1/sessions/{id}/messages?limit=&cursor=
pub async fn list_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<MessagePage>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = state
        .sessions
        .list(&session_id, limit, query.cursor.as_deref())
        .await?;
    Ok(Json(page))
}
