//! HTTP gateway for LightLocal.
//!
//! Serves the embedded chat page and a small JSON/SSE API over one shared
//! [`ChatSession`]:
//!
//! - `GET  /`: chat page
//! - `GET  /health`: liveness and version
//! - `GET  /models`: models offered in the dropdown
//! - `GET  /history`: committed exchanges
//! - `GET  /ui`: page title and subtitle
//! - `POST /chat/stream`: submit a message, receive SSE turn events
//! - `POST /clear`: forget history, returns the view reset
//! - `GET  /api`: route listing, only when `gateway.show_api`
//!
//! Built on Axum.

pub mod frontend;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lightlocal_agent::{ChatSession, ChatSettings, TurnEvent, ViewReset};
use lightlocal_config::AppConfig;
use lightlocal_core::error::ProviderError;
use lightlocal_core::message::Exchange;

/// Shared state for all handlers.
pub struct GatewayState {
    pub session: ChatSession,
    pub config: AppConfig,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(session: ChatSession, config: AppConfig) -> SharedState {
        Arc::new(Self {
            session,
            config,
            start_time: chrono::Utc::now(),
        })
    }
}

/// Build the router with every route and layer.
pub fn build_router(state: SharedState) -> Router {
    let mut api = Router::new()
        .route("/health", get(health_handler))
        .route("/models", get(models_handler))
        .route("/history", get(history_handler))
        .route("/ui", get(ui_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/clear", post(clear_handler));

    if state.config.gateway.show_api {
        api = api.route("/api", get(api_listing_handler));
    }

    api.with_state(state)
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until the process is stopped.
///
/// Fails with `Error::Provider` when the backend cannot be built and with
/// `Error::Io` when the address cannot be bound.
pub async fn start(config: AppConfig) -> lightlocal_core::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = lightlocal_providers::build_from_config(&config)?;
    let session = ChatSession::new(provider, ChatSettings::from_config(&config));
    let app = build_router(GatewayState::new(session, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Status code for an error raised before the first fragment.
fn status_for(error: &ProviderError) -> StatusCode {
    match error {
        ProviderError::ModelNotFound(_) => StatusCode::NOT_FOUND,
        ProviderError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ProviderError::ApiError { .. } | ProviderError::StreamInterrupted(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    uptime_secs: u64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.session.provider().name().to_string(),
        uptime_secs: uptime,
    })
}

#[derive(Serialize)]
struct ModelsResponse {
    default: String,
    models: Vec<String>,
}

async fn models_handler(State(state): State<SharedState>) -> Json<ModelsResponse> {
    let settings = state.session.settings();
    Json(ModelsResponse {
        default: settings.default_model.clone(),
        models: settings.models.clone(),
    })
}

#[derive(Serialize)]
struct HistoryResponse {
    conversation: Vec<Exchange>,
}

async fn history_handler(State(state): State<SharedState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        conversation: state.session.history().snapshot(),
    })
}

async fn ui_handler(State(state): State<SharedState>) -> Json<lightlocal_config::UiConfig> {
    Json(state.config.ui.clone())
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
}

/// `POST /chat/stream`: submit a message, receive cumulative text over SSE.
///
/// Failures before the first fragment come back as an HTTP error; later
/// ones as an `error` event that ends the stream.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, HandlerError> {
    info!(
        message_len = payload.message.len(),
        model = payload.model.as_deref().unwrap_or("default"),
        "Chat stream request"
    );

    let reply = state
        .session
        .submit(
            &payload.message,
            payload.model.as_deref(),
            payload.system_prompt.as_deref(),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Chat request rejected");
            (
                status_for(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })?;

    // The receiver closes only after the exchange is committed, so the
    // trailing `done` event is sent once history holds the reply.
    let turn_id = reply.turn_id().to_string();
    let events = reply
        .into_stream()
        .map(Some)
        .chain(futures::stream::once(async { None }))
        .scan((String::new(), false), move |(latest, failed), item| {
            let event = match item {
                Some(Ok(text)) => {
                    latest.clone_from(&text);
                    Some(TurnEvent::Text { content: text })
                }
                Some(Err(e)) => {
                    *failed = true;
                    Some(TurnEvent::Error {
                        message: e.to_string(),
                    })
                }
                None if *failed => None,
                None => Some(TurnEvent::Done {
                    turn_id: turn_id.clone(),
                    reply: std::mem::take(latest),
                }),
            };
            futures::future::ready(Some(event))
        })
        .filter_map(futures::future::ready);

    let stream = events.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event.event_type()).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `POST /clear`: forget every exchange.
async fn clear_handler(State(state): State<SharedState>) -> Json<ViewReset> {
    Json(state.session.clear())
}

#[derive(Serialize)]
struct RouteInfo {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

async fn api_listing_handler() -> Json<Vec<RouteInfo>> {
    let route = |method, path, description| RouteInfo {
        method,
        path,
        description,
    };
    Json(vec![
        route("GET", "/health", "Liveness, version and uptime"),
        route("GET", "/models", "Models offered by the chat page"),
        route("GET", "/history", "Committed exchanges, oldest first"),
        route("GET", "/ui", "Page title and subtitle"),
        route("POST", "/chat/stream", "Send a message; SSE of text/done/error events"),
        route("POST", "/clear", "Forget the conversation"),
    ])
}
