// src/media/asr.rs

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{post_json, vendor_headers};
use crate::config::MediaConfig;
use crate::error::{ChatError, Result};

/// Formats the recognizer accepts
const AUDIO_FORMATS: &[&str] = &["mp3", "wav", "ogg", "pcm", "webm", "m4a"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsrResult {
    pub text: String,
    pub audio_url: String,
}

#[derive(Clone)]
pub struct AsrClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl AsrClient {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.asr_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Transcribe audio already reachable at `audio_url`.
    ///
    /// `format` defaults to the URL's extension, then to mp3.
    pub async fn transcribe(&self, audio_url: &str, format: Option<&str>) -> Result<AsrResult> {
        let audio_url = audio_url.trim();
        if !(audio_url.starts_with("http://") || audio_url.starts_with("https://")) {
            return Err(ChatError::InvalidInput(
                "audioUrl must be an http(s) URL".to_string(),
            ));
        }
        let format = resolve_format(audio_url, format)?;
        let headers = vendor_headers(self.api_key.as_deref())?;

        debug!(audio_url = %audio_url, format = %format, "Requesting transcription");
        let reply = post_json(&self.http, &self.url, headers, &request_body(audio_url, &format)).await?;
        let text = parse_response(&reply)?;

        info!(chars = text.chars().count(), "Audio transcribed");
        Ok(AsrResult {
            text,
            audio_url: audio_url.to_string(),
        })
    }
}

fn resolve_format(audio_url: &str, format: Option<&str>) -> Result<String> {
    let explicit = format.map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty());
    let format = match explicit {
        Some(f) => f,
        None => {
            let path = audio_url.split(['?', '#']).next().unwrap_or(audio_url);
            path.rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .filter(|ext| AUDIO_FORMATS.contains(&ext.as_str()))
                .unwrap_or_else(|| "mp3".to_string())
        }
    };

    if AUDIO_FORMATS.contains(&format.as_str()) {
        Ok(format)
    } else {
        Err(ChatError::InvalidInput(format!("unsupported audio format '{}'", format)))
    }
}

fn request_body(audio_url: &str, format: &str) -> Value {
    json!({
        "model": "asr",
        "audio": { "format": format, "url": audio_url },
    })
}

fn parse_response(reply: &Value) -> Result<String> {
    reply
        .pointer("/data/result/text")
        .and_then(Value::as_str)
        .map(|t| t.trim().to_string())
        .ok_or_else(|| ChatError::Media("ASR response has no transcript".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format("https://cdn/a.wav", None).unwrap(), "wav");
        assert_eq!(resolve_format("https://cdn/a.WAV?sig=1", None).unwrap(), "wav");
        assert_eq!(resolve_format("https://cdn/blob", None).unwrap(), "mp3");
        assert_eq!(resolve_format("https://cdn/a.wav", Some("OGG")).unwrap(), "ogg");
        assert!(resolve_format("https://cdn/a.wav", Some("flac")).is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("https://cdn/a.mp3", "mp3");
        assert_eq!(body["model"], "asr");
        assert_eq!(body["audio"]["url"], "https://cdn/a.mp3");
        assert_eq!(body["audio"]["format"], "mp3");
    }

    #[test]
    fn test_parse_response() {
        let reply = json!({"data": {"result": {"text": " 你好 "}}});
        assert_eq!(parse_response(&reply).unwrap(), "你好");
        assert!(matches!(parse_response(&json!({"data": {}})), Err(ChatError::Media(_))));
    }

    #[tokio::test]
    async fn test_rejects_non_url() {
        let client = AsrClient::new(&MediaConfig {
            api_key: Some("k".into()),
            tts_url: String::new(),
            asr_url: "http://127.0.0.1:9/asr".into(),
            tts_voice: String::new(),
            tts_encoding: "mp3".into(),
        });
        let err = client.transcribe("", None).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidInput(_)));
    }
}
