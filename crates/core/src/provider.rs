//! Provider trait: the abstraction over inference backends.
//!
//! A Provider knows how to send a conversation to a model server and get a
//! response back, either as a complete message or as a stream of fragments.
//!
//! Implementations: Ollama (native API), OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::Message;

/// Default context window requested from the inference server, in tokens.
pub const DEFAULT_NUM_CTX: u32 = 4096;

/// Generation options forwarded to the inference server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Context window size in tokens
    pub num_ctx: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            num_ctx: DEFAULT_NUM_CTX,
        }
    }
}

/// A single chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "phi3:mini", "llama3:8b")
    pub model: String,

    /// The conversation messages, in order
    pub messages: Vec<Message>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,

    /// Generation options
    #[serde(default)]
    pub options: GenerationOptions,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Which model actually responded
    pub model: String,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text fragment carried by this chunk (may be empty)
    #[serde(default)]
    pub content: String,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

/// Receiving half of a provider stream.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// The response streamer calls `complete()` or `stream()` without knowing
/// which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Errors that happen before any fragment is produced (unreachable
    /// server, unknown model) are returned directly; later failures arrive
    /// as an `Err` item on the channel.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: response.message.content,
                done: true,
            }))
            .await;
        Ok(rx)
    }

    /// List models installed on the inference server.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check: can we reach the inference server?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let last = request.messages.last().map(|m| m.content.clone());
            Ok(ProviderResponse {
                message: Message::assistant(last.unwrap_or_default()),
                model: request.model,
            })
        }
    }

    #[test]
    fn generation_options_default_context() {
        assert_eq!(GenerationOptions::default().num_ctx, 4096);
    }

    #[test]
    fn request_options_default_when_missing() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model":"mistral","messages":[]}"#).unwrap();
        assert!(!req.stream);
        assert_eq!(req.options.num_ctx, DEFAULT_NUM_CTX);
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let provider = EchoProvider;
        let mut rx = provider
            .stream(ProviderRequest {
                model: "echo".into(),
                messages: vec![Message::user("ping")],
                stream: true,
                options: GenerationOptions::default(),
            })
            .await
            .unwrap();

        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk.content, "ping");
        assert!(chunk.done);
        assert!(rx.recv().await.is_none());
    }
}
