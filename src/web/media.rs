// src/web/media.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::media::{AsrResult, TtsResult};

#[derive(Debug, Deserialize)]
pub struct TtsBody {
    pub text: String,
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsrBody {
    pub audio_url: Option<String>,
    pub audio_format: Option<String>,
}

/// POST /api/v1/media/tts
pub async fn tts_handler(
    State(state): State<AppState>,
    body: Result<Json<TtsBody>, JsonRejection>,
) -> ApiResult<Json<TtsResult>> {
    let Json(body) = body?;
    let result = state.tts.synthesize(&body.text, body.voice.as_deref()).await?;
    Ok(Json(result))
}

/// POST /api/v1/media/asr
pub async fn asr_handler(
    State(state): State<AppState>,
    body: Result<Json<AsrBody>, JsonRejection>,
) -> ApiResult<Json<AsrResult>> {
    let Json(body) = body?;
    let audio_url = body
        .audio_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("audioUrl is required"))?;
    let result = state
        .asr
        .transcribe(audio_url, body.audio_format.as_deref())
        .await?;
    Ok(Json(result))
}
