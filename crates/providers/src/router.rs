//! Provider selection: builds the configured inference backend.

use std::sync::Arc;

use lightlocal_core::error::ProviderError;
use lightlocal_core::provider::Provider;

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider named by `inference.backend`.
pub fn build_from_config(
    config: &lightlocal_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let backend = config.inference.backend.as_str();
    let base_url = config
        .inference
        .base_url
        .clone()
        .unwrap_or_else(|| default_base_url(backend).to_string());

    let provider: Arc<dyn Provider> = match backend {
        "ollama" => Arc::new(OllamaProvider::new(base_url)),
        "openai" => Arc::new(OpenAiCompatProvider::new(
            base_url,
            config.inference.api_key.clone(),
        )),
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown inference backend '{other}'"
            )));
        }
    };

    tracing::debug!(backend, "Inference provider ready");
    Ok(provider)
}

/// Get the default base URL for a backend.
pub fn default_base_url(backend: &str) -> &'static str {
    match backend {
        "openai" => "http://localhost:8080/v1",
        _ => crate::ollama::DEFAULT_OLLAMA_URL,
    }
}
