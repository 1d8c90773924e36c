// src/media/tts.rs

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{post_json, vendor_headers};
use crate::config::MediaConfig;
use crate::error::{ChatError, Result};

/// Synthesized speech, base64-encoded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResult {
    pub audio_data: String,
    pub format: String,
    pub duration_ms: Option<u64>,
}

#[derive(Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    default_voice: String,
    encoding: String,
}

impl TtsClient {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.tts_url.clone(),
            api_key: config.api_key.clone(),
            default_voice: config.tts_voice.clone(),
            encoding: config.tts_encoding.clone(),
        }
    }

    pub fn request_body(&self, text: &str, voice: Option<&str>) -> Value {
        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_voice);
        json!({
            "audio": {
                "voice_type": voice,
                "encoding": self.encoding,
                "speed_ratio": 1.0,
            },
            "request": { "text": text },
        })
    }

    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<TtsResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidInput("text must not be empty".to_string()));
        }
        let headers = vendor_headers(self.api_key.as_deref())?;

        debug!(chars = text.chars().count(), voice = ?voice, "Requesting speech synthesis");
        let reply = post_json(&self.http, &self.url, headers, &self.request_body(text, voice)).await?;
        let result = parse_response(&reply, &self.encoding)?;

        info!(
            bytes_b64 = result.audio_data.len(),
            duration_ms = ?result.duration_ms,
            "Speech synthesized"
        );
        Ok(result)
    }
}

fn parse_response(reply: &Value, format: &str) -> Result<TtsResult> {
    let audio_data = reply
        .get("data")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ChatError::Media("TTS response has no audio data".to_string()))?;

    // Vendors disagree on whether duration is a number or a numeric string
    let duration_ms = reply
        .pointer("/addition/duration")
        .and_then(|d| d.as_u64().or_else(|| d.as_str().and_then(|s| s.parse().ok())));

    Ok(TtsResult {
        audio_data: audio_data.to_string(),
        format: format.to_string(),
        duration_ms,
    })
}
