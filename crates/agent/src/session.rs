//! Chat session: the single entry point presentation layers talk to.

use std::sync::Arc;

use lightlocal_core::error::ProviderError;
use lightlocal_core::message::Exchange;
use lightlocal_core::provider::Provider;
use lightlocal_memory::HistoryStore;
use serde::Serialize;
use tracing::info;

use crate::settings::ChatSettings;
use crate::streamer::{ReplyStream, ResponseStreamer};

/// What the view should show after a reset: an empty conversation and
/// an empty input box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewReset {
    pub conversation: Vec<Exchange>,
    pub input: String,
}

/// Owns the process-wide history and the streamer that feeds it.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    history: Arc<HistoryStore>,
    streamer: ResponseStreamer,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>, settings: ChatSettings) -> Self {
        let history = Arc::new(HistoryStore::new());
        let streamer = ResponseStreamer::new(provider.clone(), history.clone(), settings);
        info!(
            provider = provider.name(),
            model = %streamer.settings().default_model,
            "Chat session ready"
        );
        Self {
            provider,
            history,
            streamer,
        }
    }

    /// Submit a user message. `model` falls back to the configured default.
    pub async fn submit(
        &self,
        message: &str,
        model: Option<&str>,
        system_prompt: Option<&str>,
    ) -> Result<ReplyStream, ProviderError> {
        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or(self.streamer.settings().default_model.as_str());
        self.streamer.stream(message, model, system_prompt).await
    }

    /// Forget every exchange and tell the view to reset.
    pub fn clear(&self) -> ViewReset {
        self.history.clear();
        ViewReset::default()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn settings(&self) -> &ChatSettings {
        self.streamer.settings()
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lightlocal_core::message::Message;
    use lightlocal_core::provider::{ProviderRequest, ProviderResponse};
    use std::sync::Mutex;

    /// Replies "echo: <last message>" and remembers the model asked for.
    #[derive(Default)]
    struct EchoProvider {
        models_seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.models_seen.lock().unwrap().push(request.model.clone());
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ProviderResponse {
                message: Message::assistant(format!("echo: {last}")),
                model: request.model,
            })
        }
    }

    async fn settle(session: &ChatSession, len: usize) {
        for _ in 0..100 {
            if session.history().len() == len {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("history never reached {len}");
    }

    #[tokio::test]
    async fn submit_uses_default_model_when_none_given() {
        let provider = Arc::new(EchoProvider::default());
        let session = ChatSession::new(provider.clone(), ChatSettings::default());

        let reply = session
            .submit("ping", None, None)
            .await
            .unwrap()
            .final_text()
            .await
            .unwrap();
        assert_eq!(reply, "echo: ping");

        session
            .submit("pong", Some("mistral"), None)
            .await
            .unwrap()
            .final_text()
            .await
            .unwrap();

        let seen = provider.models_seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["phi3:mini", "mistral"]);
    }

    #[tokio::test]
    async fn clear_resets_history_and_view() {
        let session = ChatSession::new(Arc::new(EchoProvider::default()), ChatSettings::default());
        session
            .submit("one", None, None)
            .await
            .unwrap()
            .final_text()
            .await
            .unwrap();
        settle(&session, 1).await;

        let reset = session.clear();
        assert!(reset.conversation.is_empty());
        assert_eq!(reset.input, "");
        assert!(session.history().is_empty());

        // Clearing twice is the same as clearing once.
        assert_eq!(session.clear(), ViewReset::default());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn turns_after_clear_see_no_old_context() {
        let session = ChatSession::new(Arc::new(EchoProvider::default()), ChatSettings::default());
        session
            .submit("before", None, None)
            .await
            .unwrap()
            .final_text()
            .await
            .unwrap();
        settle(&session, 1).await;
        session.clear();

        session
            .submit("after", None, None)
            .await
            .unwrap()
            .final_text()
            .await
            .unwrap();
        settle(&session, 1).await;
        assert_eq!(
            session.history().snapshot(),
            vec![Exchange::new("after", "echo: after")]
        );
    }

    #[test]
    fn view_reset_serializes_empty() {
        let json = serde_json::to_value(ViewReset::default()).unwrap();
        assert_eq!(json, serde_json::json!({"conversation": [], "input": ""}));
    }
}
