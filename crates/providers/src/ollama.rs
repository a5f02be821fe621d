//! Ollama provider implementation (native `/api/chat` endpoint).
//!
//! Supports:
//! - Chat completions, streamed as newline-delimited JSON or returned whole
//! - `options.num_ctx` for the context window
//! - Model listing (`/api/tags`) and health checks (`/api/version`)

use async_trait::async_trait;
use futures::StreamExt;
use lightlocal_core::error::ProviderError;
use lightlocal_core::message::{Message, Role};
use lightlocal_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::lines::LineBuffer;

/// Where Ollama listens when nothing else is configured.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// A provider backed by a local Ollama server.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the Ollama server at `base_url`.
    ///
    /// Accepts the same forms as `OLLAMA_HOST`, so a bare `host:port`
    /// gets an `http://` scheme.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = if base_url.contains("://") {
            base_url
        } else {
            format!("http://{base_url}")
        };

        // No request timeout: generation on a cold model can take minutes.
        let client = reqwest::Client::new();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a provider for the default local address.
    pub fn local() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_body(request: &ProviderRequest, stream: bool) -> ChatRequestBody<'_> {
        ChatRequestBody {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
            options: ApiOptions {
                num_ctx: request.options.num_ctx,
            },
        }
    }

    async fn post_chat(
        &self,
        request: &ProviderRequest,
        stream: bool,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            num_ctx = request.options.num_ctx,
            stream,
            "Sending chat request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&Self::chat_body(request, stream))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(classify_error(status, &error_body, &request.model));
        }

        Ok(response)
    }
}

/// Map a non-200 answer from Ollama onto our error taxonomy.
fn classify_error(status: u16, body: &str, model: &str) -> ProviderError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());

    let lowered = message.to_lowercase();
    if status == 404 || (lowered.contains("model") && lowered.contains("not found")) {
        return ProviderError::ModelNotFound(model.to_string());
    }

    ProviderError::ApiError {
        status_code: status,
        message,
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let response = self.post_chat(&request, false).await?;

        let chunk: ChatChunk = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        if let Some(error) = chunk.error {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: error,
            });
        }

        let content = chunk.message.map(|m| m.content).unwrap_or_default();

        Ok(ProviderResponse {
            message: Message {
                role: Role::Assistant,
                content,
            },
            model: chunk.model.unwrap_or(request.model),
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.post_chat(&request, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let model = request.model;

        // Spawn task to read the NDJSON byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = LineBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for line in buffer.push(&bytes) {
                    match forward_line(&line, &model, &tx).await {
                        LineOutcome::Continue => {}
                        LineOutcome::Finished => return,
                    }
                }
            }

            if let Some(tail) = buffer.finish() {
                if let LineOutcome::Finished = forward_line(&tail, &model, &tx).await {
                    return;
                }
            }

            // Body ended without a `done` object: close the stream normally
            let _ = tx
                .send(Ok(StreamChunk {
                    content: String::new(),
                    done: true,
                }))
                .await;
        });

        Ok(rx)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

enum LineOutcome {
    Continue,
    Finished,
}

/// Parse one NDJSON line and forward it to the consumer.
async fn forward_line(
    line: &str,
    model: &str,
    tx: &tokio::sync::mpsc::Sender<std::result::Result<StreamChunk, ProviderError>>,
) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Continue;
    }

    let chunk = match serde_json::from_str::<ChatChunk>(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            trace!(model = %model, data = %line, error = %e, "Ignoring unparseable NDJSON line");
            return LineOutcome::Continue;
        }
    };

    if let Some(error) = chunk.error {
        warn!(model = %model, error = %error, "Ollama reported a mid-stream error");
        let _ = tx.send(Err(ProviderError::StreamInterrupted(error))).await;
        return LineOutcome::Finished;
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    if content.is_empty() && !chunk.done {
        return LineOutcome::Continue;
    }

    let done = chunk.done;
    if tx.send(Ok(StreamChunk { content, done })).await.is_err() {
        return LineOutcome::Finished; // receiver dropped
    }

    if done {
        LineOutcome::Finished
    } else {
        LineOutcome::Continue
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    num_ctx: u32,
}

/// One object of a `/api/chat` response; a whole response when not streaming.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::{get, post}};
    use lightlocal_core::provider::GenerationOptions;

    /// Serve `app` on an ephemeral local port and return its base URL.
    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request(model: &str) -> ProviderRequest {
        ProviderRequest {
            model: model.into(),
            messages: vec![Message::system("be brief"), Message::user("Hello")],
            stream: true,
            options: GenerationOptions::default(),
        }
    }

    async fn drain(mut rx: ChunkReceiver) -> Vec<std::result::Result<StreamChunk, ProviderError>> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    async fn ndjson_chat(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
        if body["model"] != "phi3:mini" {
            return (
                StatusCode::NOT_FOUND,
                r#"{"error":"model \"missing\" not found, try pulling it first"}"#.to_string(),
            );
        }
        assert_eq!(body["options"]["num_ctx"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");

        if body["stream"] == true {
            let lines = [
                r#"{"model":"phi3:mini","message":{"role":"assistant","content":"Hi"},"done":false}"#,
                r#"{"model":"phi3:mini","message":{"role":"assistant","content":" there"},"done":false}"#,
                r#"{"model":"phi3:mini","message":{"role":"assistant","content":""},"done":true}"#,
            ];
            (StatusCode::OK, format!("{}\n", lines.join("\n")))
        } else {
            (
                StatusCode::OK,
                r#"{"model":"phi3:mini","message":{"role":"assistant","content":"Hi there"},"done":true}"#
                    .to_string(),
            )
        }
    }

    #[test]
    fn bare_host_gets_scheme() {
        let provider = OllamaProvider::new("gpu-box:11434/");
        assert_eq!(provider.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn local_constructor() {
        let provider = OllamaProvider::local();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url().contains("localhost:11434"));
    }

    #[test]
    fn request_body_shape() {
        let req = request("mistral");
        let body = serde_json::to_value(OllamaProvider::chat_body(&req, true)).unwrap();
        assert_eq!(body["model"], "mistral");
        assert_eq!(body["stream"], true);
        assert_eq!(body["options"]["num_ctx"], 4096);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn classify_404_as_model_not_found() {
        let err = classify_error(404, r#"{"error":"model 'x' not found"}"#, "x");
        assert!(matches!(err, ProviderError::ModelNotFound(m) if m == "x"));
    }

    #[test]
    fn classify_other_status_keeps_message() {
        let err = classify_error(500, r#"{"error":"out of memory"}"#, "llama3:8b");
        match err {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "out of memory");
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_chunk() {
        let chunk: ChatChunk = serde_json::from_str(r#"{"error":"llama runner exited"}"#).unwrap();
        assert_eq!(chunk.error.as_deref(), Some("llama runner exited"));
        assert!(!chunk.done);
    }

    #[tokio::test]
    async fn stream_yields_fragments_in_order() {
        let base = spawn_server(Router::new().route("/api/chat", post(ndjson_chat))).await;
        let provider = OllamaProvider::new(base);

        let items = drain(provider.stream(request("phi3:mini")).await.unwrap()).await;
        let chunks: Vec<StreamChunk> = items.into_iter().map(|i| i.unwrap()).collect();

        let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(text, "Hi there");
        assert!(chunks.last().unwrap().done);
    }

    #[tokio::test]
    async fn complete_returns_whole_message() {
        let base = spawn_server(Router::new().route("/api/chat", post(ndjson_chat))).await;
        let provider = OllamaProvider::new(base);

        let mut req = request("phi3:mini");
        req.stream = false;
        let response = provider.complete(req).await.unwrap();
        assert_eq!(response.message.role, Role::Assistant);
        assert_eq!(response.message.content, "Hi there");
        assert_eq!(response.model, "phi3:mini");
    }

    #[tokio::test]
    async fn unknown_model_fails_before_streaming() {
        let base = spawn_server(Router::new().route("/api/chat", post(ndjson_chat))).await;
        let provider = OllamaProvider::new(base);

        let err = provider.stream(request("missing")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(m) if m == "missing"));
    }

    #[tokio::test]
    async fn mid_stream_error_is_forwarded() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                concat!(
                    r#"{"message":{"content":"Par"},"done":false}"#,
                    "\n",
                    r#"{"error":"llama runner process has terminated"}"#,
                    "\n"
                )
            }),
        );
        let provider = OllamaProvider::new(spawn_server(app).await);

        let items = drain(provider.stream(request("phi3:mini")).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().content, "Par");
        assert!(matches!(
            items[1],
            Err(ProviderError::StreamInterrupted(ref m)) if m.contains("terminated")
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = OllamaProvider::new(format!("http://{addr}"));
        let err = provider.stream(request("phi3:mini")).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn list_models_reads_tags() {
        let app = Router::new().route(
            "/api/tags",
            get(|| async {
                r#"{"models":[{"name":"phi3:mini","size":1},{"name":"mistral:latest","size":2}]}"#
            }),
        );
        let provider = OllamaProvider::new(spawn_server(app).await);

        let models = provider.list_models().await.unwrap();
        assert_eq!(models, vec!["phi3:mini", "mistral:latest"]);
    }

    #[tokio::test]
    async fn health_check_hits_version() {
        let app = Router::new().route("/api/version", get(|| async { r#"{"version":"0.3.0"}"# }));
        let provider = OllamaProvider::new(spawn_server(app).await);
        assert!(provider.health_check().await.unwrap());
    }
}
