// src/llm/client.rs
// Streaming chat-completions client for OpenAI-compatible endpoints

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::DeltaStream;
use super::sse::delta_stream;
use crate::config::UpstreamConfig;
use crate::error::{ChatError, Result};

/// Raw response body of an opened completion stream
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Message in a chat-completions request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Streaming chat-completions request body
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub stream: bool,
    pub messages: Vec<ChatMessage>,
}

/// Opens the network connection for one completion.
///
/// Dropping the returned stream must release the connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &CompletionRequest) -> Result<ByteStream>;
}

/// Keep only characters that can travel in an HTTP header value
pub fn sanitize_header_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| (' '..='~').contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// reqwest-backed transport. No request timeout: the stream lives until the
/// upstream closes it or the consumer drops it.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", sanitize_header_value(api_key)))
            .map_err(|e| ChatError::Config(format!("unusable API key: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &CompletionRequest) -> Result<ByteStream> {
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::UpstreamUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<no body>".into());
            warn!(status = status.as_u16(), "Upstream rejected completion request");
            return Err(ChatError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::UpstreamUnavailable(format!("stream read: {}", e))));
        Ok(Box::pin(body))
    }
}

/// Upstream Stream Client: one connection per call
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn Transport>,
    model: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let transport = HttpTransport::new(&config.base_url, api_key)?;
        info!(endpoint = %transport.endpoint(), model = %config.model, "Upstream client ready");
        Ok(Self::with_transport(Arc::new(transport), config.model.clone()))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, system: &str, user: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            stream: true,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        }
    }

    /// Lazy delta sequence. The connection opens on first poll; a connect or
    /// status failure is the first and only item.
    pub fn chat_stream(&self, system: &str, user: &str) -> DeltaStream {
        let transport = self.transport.clone();
        let request = self.build_request(system, user);

        Box::pin(async_stream::stream! {
            debug!(model = %request.model, "Opening upstream stream");
            let body = match transport.open(&request).await {
                Ok(body) => body,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut deltas = delta_stream(body);
            while let Some(delta) = deltas.next().await {
                yield delta;
            }
        })
    }
}
