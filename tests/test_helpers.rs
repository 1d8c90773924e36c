// tests/test_helpers.rs
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use persona_relay::chat::ChatService;
use persona_relay::config::AppConfig;
use persona_relay::error::{ChatError, Result};
use persona_relay::llm::client::ByteStream;
use persona_relay::llm::{Backend, CompletionRequest, LiveBackend, MockBackend, Transport, UpstreamClient};
use persona_relay::persona::StaticPersonaProvider;
use persona_relay::web::{AppState, create_router};

/// Mock backend without per-character delay, no media key
pub fn test_config() -> AppConfig {
    config_with(&[])
}

/// Test config with extra environment entries
pub fn config_with(pairs: &[(&str, &str)]) -> AppConfig {
    AppConfig::from_lookup(|key| {
        if key == "MOCK_CHAR_DELAY_MS" {
            return Some("0".to_string());
        }
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("test config")
}

pub fn mock_chat() -> ChatService {
    ChatService::new(Backend::Mock(MockBackend::new(std::time::Duration::ZERO)))
}

/// Chat service backed by a scripted upstream
pub fn live_chat(transport: Arc<dyn Transport>) -> ChatService {
    let personas = Arc::new(
        StaticPersonaProvider::new().with_persona("harry", "You are Harry Potter."),
    );
    let client = UpstreamClient::with_transport(transport, "test-model");
    ChatService::new(Backend::Live(LiveBackend::new(personas, client)))
}

pub fn app(chat: ChatService) -> axum::Router {
    app_with_config(chat, &test_config())
}

pub fn app_with_config(chat: ChatService, config: &AppConfig) -> axum::Router {
    create_router(AppState::new(chat, config), "*")
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn serve_local(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("local server");
    });
    format!("http://{}", addr)
}

/// One SSE data line carrying `content`
pub fn frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": content}}]})
    )
}

/// Sets the flag when the response body is dropped
struct CloseGuard(Arc<AtomicBool>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// What the upstream does after its scripted frames
#[derive(Clone)]
pub enum Tail {
    /// Close the body normally
    End,
    /// Fail with a read error
    Fail(&'static str),
    /// Never send anything else
    Hang,
}

/// Scripted upstream that records how often it was opened and whether the
/// body was released
pub struct FakeUpstream {
    frames: Vec<String>,
    tail: Tail,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicBool>,
}

impl FakeUpstream {
    pub fn new(frames: Vec<String>, tail: Tail) -> Arc<Self> {
        Arc::new(Self {
            frames,
            tail,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeUpstream {
    async fn open(&self, _request: &CompletionRequest) -> Result<ByteStream> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let guard = CloseGuard(self.closed.clone());
        let frames = self.frames.clone();
        let tail = self.tail.clone();

        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            for frame in frames {
                yield Ok::<_, ChatError>(Bytes::from(frame));
            }
            match tail {
                Tail::End => {}
                Tail::Fail(reason) => {
                    yield Err(ChatError::UpstreamUnavailable(reason.to_string()));
                }
                Tail::Hang => futures::future::pending::<()>().await,
            }
        }))
    }
}
