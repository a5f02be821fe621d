//! Response streaming: one user turn from request to committed exchange.
//!
//! The streamer assembles the request, opens a stream on the provider and
//! republishes the growing reply: every value sent to the consumer is the
//! whole text received so far, so a renderer can replace its message bubble
//! on each update.
//!
//! The exchange is committed to history only when the provider stream ends
//! without error. A failure is forwarded to the consumer unchanged and
//! nothing is committed; text already delivered is not retracted. If the
//! consumer drops its receiver first, the turn is abandoned without commit.

use std::sync::Arc;

use lightlocal_core::error::ProviderError;
use lightlocal_core::message::Exchange;
use lightlocal_core::provider::{ChunkReceiver, Provider, ProviderRequest, StreamChunk};
use lightlocal_memory::HistoryStore;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::assembler::ConversationAssembler;
use crate::settings::ChatSettings;

/// Lifecycle of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Assembling,
    Streaming { fragments: usize },
    Committed,
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Assembling => f.write_str("assembling"),
            Self::Streaming { fragments } => write!(f, "streaming({fragments})"),
            Self::Committed => f.write_str("committed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Forward-only sequence of cumulative reply text for one turn.
///
/// Not restartable: once drained (or dropped) the turn is over.
#[derive(Debug)]
pub struct ReplyStream {
    turn_id: String,
    rx: mpsc::Receiver<Result<String, ProviderError>>,
}

impl ReplyStream {
    pub fn turn_id(&self) -> &str {
        &self.turn_id
    }

    /// Next cumulative value, `None` once the turn has finished.
    pub async fn next(&mut self) -> Option<Result<String, ProviderError>> {
        self.rx.recv().await
    }

    /// Drain the stream and return the final text.
    pub async fn final_text(mut self) -> Result<String, ProviderError> {
        let mut last = String::new();
        while let Some(item) = self.next().await {
            last = item?;
        }
        Ok(last)
    }

    /// Adapt into a `futures::Stream` for SSE and other stream consumers.
    pub fn into_stream(self) -> ReceiverStream<Result<String, ProviderError>> {
        ReceiverStream::new(self.rx)
    }
}

/// Drives the provider for one turn and commits the result to history.
pub struct ResponseStreamer {
    provider: Arc<dyn Provider>,
    assembler: ConversationAssembler,
    history: Arc<HistoryStore>,
    settings: ChatSettings,
}

impl ResponseStreamer {
    pub fn new(
        provider: Arc<dyn Provider>,
        history: Arc<HistoryStore>,
        settings: ChatSettings,
    ) -> Self {
        let assembler = ConversationAssembler::new(history.clone(), settings.max_history);
        Self {
            provider,
            assembler,
            history,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Start a turn.
    ///
    /// Errors raised before the first fragment (service unreachable, unknown
    /// model) are returned here; later ones arrive through the stream.
    pub async fn stream(
        &self,
        message: &str,
        model: &str,
        system_prompt: Option<&str>,
    ) -> Result<ReplyStream, ProviderError> {
        let turn_id = uuid::Uuid::new_v4().to_string();
        debug!(turn_id = %turn_id, state = %TurnState::Assembling, "Turn started");

        let messages = self.assembler.assemble(message, system_prompt);
        let request = ProviderRequest {
            model: model.to_string(),
            messages,
            stream: self.settings.streaming,
            options: self.settings.generation_options(),
        };

        let chunks = match self.open(request).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(
                    turn_id = %turn_id,
                    model = %model,
                    state = %TurnState::Failed,
                    error = %e,
                    "Inference request failed"
                );
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(accumulate(
            chunks,
            tx,
            self.history.clone(),
            message.to_string(),
            turn_id.clone(),
        ));

        Ok(ReplyStream { turn_id, rx })
    }

    /// Open the provider stream, or fetch a whole reply when streaming is off.
    async fn open(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        if request.stream {
            return self.provider.stream(request).await;
        }

        let response = self.provider.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: response.message.content,
                done: true,
            }))
            .await;
        Ok(rx)
    }
}

/// Fold provider fragments into cumulative text and commit on success.
async fn accumulate(
    mut chunks: ChunkReceiver,
    tx: mpsc::Sender<Result<String, ProviderError>>,
    history: Arc<HistoryStore>,
    message: String,
    turn_id: String,
) {
    let mut full_response = String::new();
    let mut state = TurnState::Streaming { fragments: 0 };
    let mut published = false;

    while let Some(item) = chunks.recv().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(
                    turn_id = %turn_id,
                    after = %state,
                    error = %e,
                    "Stream failed; exchange not committed"
                );
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        let has_content = !chunk.content.is_empty();
        if has_content {
            full_response.push_str(&chunk.content);
            if let TurnState::Streaming { fragments } = &mut state {
                *fragments += 1;
            }
        }

        // An empty reply still publishes one (empty) value.
        if has_content || (chunk.done && !published) {
            if tx.send(Ok(full_response.clone())).await.is_err() {
                debug!(turn_id = %turn_id, after = %state, "Consumer went away; turn abandoned");
                return;
            }
            published = true;
        }

        if chunk.done {
            break;
        }
    }

    let reply_len = full_response.len();
    history.append(Exchange::new(message, full_response));
    info!(
        turn_id = %turn_id,
        from = %state,
        state = %TurnState::Committed,
        reply_len,
        "Turn complete"
    );
}
