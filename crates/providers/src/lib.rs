//! Inference provider implementations for LightLocal.
//!
//! All providers implement the `lightlocal_core::Provider` trait.
//! `router::build_from_config` picks the one named in configuration.

mod lines;
pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
