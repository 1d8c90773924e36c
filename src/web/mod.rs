// src/web/mod.rs
// HTTP/SSE front-end for the relay

pub mod chat;
pub mod error;
pub mod media;
pub mod sessions;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// `*` allows any origin; otherwise a comma-separated origin list
pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origin.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring unusable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the web server router
pub fn create_router(state: AppState, cors_origin: &str) -> Router {
    let api_v1 = Router::new()
        .route("/sessions", post(sessions::create_handler))
        .route(
            "/sessions/{id}/messages",
            get(sessions::list_handler).post(sessions::send_handler),
        )
        .route("/sessions/{id}/voice", post(sessions::voice_handler))
        .route("/media/tts", post(media::tts_handler))
        .route("/media/asr", post(media::asr_handler));

    Router::new()
        .route("/health", get(health))
        .route("/api/chat/stream", post(chat::stream_handler))
        .route("/v1/chat", post(chat::completion_handler))
        .nest("/api/v1", api_v1)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.chat.backend_name(),
        "activeStreams": state.chat.active_streams().len(),
        "streams": state.chat.active_streams().snapshot(),
    }))
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

/// Bind and serve until shutdown
pub async fn run(state: AppState, bind_address: &str, cors_origin: &str) -> anyhow::Result<()> {
    let app = create_router(state, cors_origin);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    info!(address = %bind_address, "Relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
