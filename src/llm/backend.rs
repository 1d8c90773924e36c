// src/llm/backend.rs
// Delta sources behind the chat orchestrator: offline mock or live upstream

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::DeltaStream;
use super::client::UpstreamClient;
use crate::config::{AppConfig, Provider};
use crate::error::{ChatError, Result};
use crate::persona::PersonaProvider;
use crate::prompt::system_prompt;

/// Produces the raw assistant deltas for one chat turn
#[async_trait]
pub trait DeltaSource: Send + Sync {
    async fn produce(&self, role: &str, user_text: &str) -> DeltaStream;
}

/// Echoes the user text back one character at a time
#[derive(Debug, Clone)]
pub struct MockBackend {
    delay: Duration,
}

impl MockBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl DeltaSource for MockBackend {
    async fn produce(&self, role: &str, user_text: &str) -> DeltaStream {
        debug!(role = %role, chars = user_text.chars().count(), "Mock backend echoing input");
        let delay = self.delay;
        let chars: Vec<String> = user_text.chars().map(String::from).collect();

        Box::pin(async_stream::stream! {
            for ch in chars {
                yield Ok::<_, ChatError>(ch);
                tokio::time::sleep(delay).await;
            }
        })
    }
}

/// Persona-conditioned upstream completion
#[derive(Clone)]
pub struct LiveBackend {
    personas: Arc<dyn PersonaProvider>,
    client: UpstreamClient,
}

impl LiveBackend {
    pub fn new(personas: Arc<dyn PersonaProvider>, client: UpstreamClient) -> Self {
        Self { personas, client }
    }
}

#[async_trait]
impl DeltaSource for LiveBackend {
    async fn produce(&self, role: &str, user_text: &str) -> DeltaStream {
        let persona = self.personas.load(role).await;
        let system = system_prompt(&persona);
        debug!(
            role = %role,
            model = %self.client.model(),
            system_len = system.len(),
            "Live backend built system prompt"
        );
        self.client.chat_stream(&system, user_text)
    }
}

/// The two supported backends, chosen once at startup
#[derive(Clone)]
pub enum Backend {
    Mock(MockBackend),
    Live(LiveBackend),
}

impl Backend {
    pub fn from_config(config: &AppConfig, personas: Arc<dyn PersonaProvider>) -> Result<Self> {
        match config.provider {
            Provider::Mock => Ok(Backend::Mock(MockBackend::new(config.mock_char_delay))),
            Provider::OpenAi => {
                let client = UpstreamClient::new(&config.upstream)?;
                Ok(Backend::Live(LiveBackend::new(personas, client)))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Mock(_) => "mock",
            Backend::Live(_) => "openai",
        }
    }
}

#[async_trait]
impl DeltaSource for Backend {
    async fn produce(&self, role: &str, user_text: &str) -> DeltaStream {
        match self {
            Backend::Mock(mock) => mock.produce(role, user_text).await,
            Backend::Live(live) => live.produce(role, user_text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{ByteStream, CompletionRequest, Transport};
    use crate::persona::StaticPersonaProvider;
    use bytes::Bytes;
    use futures::{StreamExt, stream};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn open(&self, request: &CompletionRequest) -> Result<ByteStream> {
            self.requests.lock().unwrap().push(request.clone());
            let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Accio!\"}}]}\n\ndata: [DONE]\n\n";
            Ok(Box::pin(stream::iter(vec![Ok(Bytes::from(body))])))
        }
    }

    #[tokio::test]
    async fn test_mock_echoes_per_character() {
        let backend = MockBackend::new(Duration::ZERO);
        let deltas: Vec<String> = backend
            .produce("default", "你好 a")
            .await
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["你", "好", " ", "a"]);
    }

    #[tokio::test]
    async fn test_live_sends_persona_as_system_message() {
        let transport = Arc::new(RecordingTransport::default());
        let personas = Arc::new(StaticPersonaProvider::new().with_persona("harry", "You are Harry Potter."));
        let client = UpstreamClient::with_transport(transport.clone(), "test-model");
        let backend = Backend::Live(LiveBackend::new(personas, client));

        let deltas: Vec<String> = backend
            .produce("Harry", "Say a spell")
            .await
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["Accio!"]);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("You are Harry Potter."));
        assert!(messages[0].content.contains("Stay in character"));
        assert!(!messages[0].content.contains("# Conversation"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Say a spell");
    }

    #[test]
    fn test_backend_from_config() {
        let personas: Arc<dyn PersonaProvider> = Arc::new(StaticPersonaProvider::new());

        let mock = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(Backend::from_config(&mock, personas.clone()).unwrap().name(), "mock");

        let live = AppConfig::from_lookup(|key| match key {
            "AI_PROVIDER" => Some("openai".to_string()),
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(Backend::from_config(&live, personas).unwrap().name(), "openai");
    }
}
