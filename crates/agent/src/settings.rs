//! Immutable chat settings handed to the pipeline at construction.

use lightlocal_core::provider::{DEFAULT_NUM_CTX, GenerationOptions};

/// Default number of past exchanges sent as context.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// The subset of configuration the chat pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    /// Model used when a turn does not name one
    pub default_model: String,
    /// Models the presentation layer offers
    pub models: Vec<String>,
    /// Most recent exchanges included per request
    pub max_history: usize,
    /// Ask the server for incremental delivery
    pub streaming: bool,
    /// Context window requested per generation
    pub num_ctx: u32,
}

impl ChatSettings {
    pub fn from_config(config: &lightlocal_config::AppConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            models: config.models.clone(),
            max_history: config.max_history,
            streaming: config.streaming,
            num_ctx: config.num_ctx,
        }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            num_ctx: self.num_ctx,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_model: "phi3:mini".into(),
            models: vec!["phi3:mini".into()],
            max_history: DEFAULT_MAX_HISTORY,
            streaming: true,
            num_ctx: DEFAULT_NUM_CTX,
        }
    }
}
