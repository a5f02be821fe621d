//! Configuration loading, validation, and management for LightLocal.
//!
//! Loads configuration from `~/.lightlocal/config.toml` with environment
//! variable overrides. Validates all settings at startup. The loaded
//! `AppConfig` is immutable afterwards and is handed to the chat pipeline
//! at construction time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.lightlocal/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model preselected in the UI and used when a request names none
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Models offered for selection
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Number of most recent exchanges sent as context
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Request incremental delivery from the inference server
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Context window size requested per generation, in tokens
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    /// Inference server configuration
    #[serde(default)]
    pub inference: InferenceConfig,

    /// HTTP front-end configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Web page labels
    #[serde(default)]
    pub ui: UiConfig,
}

fn default_model() -> String {
    "phi3:mini".into()
}
fn default_models() -> Vec<String> {
    vec![
        "phi3:mini".into(),
        "deepseek-coder".into(),
        "llama3:8b".into(),
        "mistral".into(),
    ]
}
fn default_max_history() -> usize {
    10
}
fn default_num_ctx() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// Which inference API to talk to and where.
#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// "ollama" (native API) or "openai" (any OpenAI-compatible server)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL override; each backend has its own local default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Only used by OpenAI-compatible servers that require one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_backend() -> String {
    "ollama".into()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Mount the `/api` route listing
    #[serde(default)]
    pub show_api: bool,
}

fn default_port() -> u16 {
    7860
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            show_api: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_subtitle")]
    pub subtitle: String,
}

fn default_title() -> String {
    "LightLocal AI".into()
}
fn default_subtitle() -> String {
    "Ultra-Fast Offline Chat".into()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lightlocal/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `LIGHTLOCAL_MODEL`
    /// - `LIGHTLOCAL_BACKEND`
    /// - `LIGHTLOCAL_BASE_URL`, then `OLLAMA_HOST`
    /// - `LIGHTLOCAL_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        config.normalize();
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(model) = lookup("LIGHTLOCAL_MODEL") {
            self.default_model = model;
        }

        if let Some(backend) = lookup("LIGHTLOCAL_BACKEND") {
            self.inference.backend = backend;
        }

        if let Some(url) = lookup("LIGHTLOCAL_BASE_URL").or_else(|| lookup("OLLAMA_HOST")) {
            self.inference.base_url = Some(url);
        }

        if let Some(port) = lookup("LIGHTLOCAL_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("LIGHTLOCAL_PORT is not a valid port: {port}"))
            })?;
        }

        self.normalize();
        Ok(())
    }

    /// Make sure the default model is always selectable.
    fn normalize(&mut self) {
        if !self.models.iter().any(|m| m == &self.default_model) {
            self.models.insert(0, self.default_model.clone());
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lightlocal")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        if self.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "max_history must be at least 1".into(),
            ));
        }

        if self.num_ctx == 0 {
            return Err(ConfigError::ValidationError(
                "num_ctx must be greater than 0".into(),
            ));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be non-zero".into(),
            ));
        }

        if !matches!(self.inference.backend.as_str(), "ollama" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "inference.backend must be \"ollama\" or \"openai\", got \"{}\"",
                self.inference.backend
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            models: default_models(),
            max_history: default_max_history(),
            streaming: true,
            num_ctx: default_num_ctx(),
            inference: InferenceConfig::default(),
            gateway: GatewayConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
