// src/media/mod.rs
// Speech proxies: text-to-speech and speech recognition over a vendor HTTP API

pub mod asr;
pub mod tts;

pub use asr::{AsrClient, AsrResult};
pub use tts::{TtsClient, TtsResult};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::warn;

use crate::error::{ChatError, Result};
use crate::llm::client::sanitize_header_value;

/// Headers shared by both vendor calls; fails when no key is configured
fn vendor_headers(api_key: Option<&str>) -> Result<HeaderMap> {
    let key = api_key.ok_or_else(|| ChatError::Config("MEDIA_API_KEY is not set".to_string()))?;

    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", sanitize_header_value(key)))
        .map_err(|e| ChatError::Config(format!("MEDIA_API_KEY is not a valid header value: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// POST a JSON body and return the parsed JSON reply
async fn post_json(
    http: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let response = http
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|e| ChatError::Media(format!("request to {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        warn!(url = %url, status = %status, "Media vendor returned error");
        return Err(ChatError::Media(format!("vendor returned {}: {}", status, text)));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| ChatError::Media(format!("unreadable vendor response: {}", e)))
}
