//! Error types for the LightLocal domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The inference boundary has its own error enum so failures can be
//! forwarded unchanged through streaming channels.

use thiserror::Error;

/// The top-level error type for LightLocal operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- I/O (listener bind, terminal) ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any displayable configuration failure.
    pub fn config(message: impl std::fmt::Display) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by an inference backend.
///
/// `Clone` because a single failure is sent over a channel to whoever
/// consumes the turn, and may also be logged by the producer.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The inference service could not be reached at all.
    #[error("Inference service unavailable: {0}")]
    Network(String),
}

impl ProviderError {
    /// True when the service itself is unreachable, as opposed to a
    /// request it rejected.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 500,
            message: "llama runner crashed".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("llama runner crashed"));
    }

    #[test]
    fn provider_and_io_errors_convert() {
        let from_provider: Error = ProviderError::Network("connection refused".into()).into();
        assert!(matches!(from_provider, Error::Provider(ref e) if e.is_unavailable()));

        let from_io: Error =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken").into();
        assert!(matches!(from_io, Error::Io(_)));
        assert!(from_io.to_string().contains("port taken"));
    }

    #[test]
    fn config_error_keeps_message() {
        let err = Error::config("max_history must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: max_history must be at least 1"
        );
    }

    #[test]
    fn model_not_found_names_the_model() {
        let err = ProviderError::ModelNotFound("phi3:mini".into());
        assert_eq!(err.to_string(), "Model not found: phi3:mini");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn network_error_is_unavailable() {
        let err = ProviderError::Network("connection refused".into());
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("unavailable"));
    }
}
