//! Backend configuration.
//!
//! The binary builds an [`LlmBackendConfig`] from the `llm` section of
//! `rendezvous-config.yaml` plus `LLM_*` environment overrides.

use core::str::FromStr;
use std::time::Duration;

use crate::error::LlmError;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion token limit.
pub const DEFAULT_MAX_TOKENS: u32 = 600;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a single generation backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

impl LlmBackendConfig {
    /// Configuration for the offline stub backend.
    pub fn stub() -> Self {
        Self {
            backend_type: BackendType::Stub,
            api_url: String::new(),
            api_key: String::new(),
            model: "stub".to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Check that a network backend has what it needs to make calls.
    pub fn validate(&self) -> Result<(), LlmError> {
        if matches!(self.backend_type, BackendType::Stub) {
            return Ok(());
        }
        if self.api_url.trim().is_empty() {
            return Err(LlmError::Config(format!(
                "{} backend requires an api_url",
                self.backend_type
            )));
        }
        if self.model.trim().is_empty() {
            return Err(LlmError::Config(format!(
                "{} backend requires a model",
                self.backend_type
            )));
        }
        Ok(())
    }
}

/// Supported backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
    /// Deterministic canned responses, no network.
    Stub,
}

impl FromStr for BackendType {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "stub" | "offline" => Ok(Self::Stub),
            other => Err(LlmError::Config(format!("unsupported backend type: {other}"))),
        }
    }
}

impl core::fmt::Display for BackendType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Anthropic => f.write_str("anthropic"),
            Self::Stub => f.write_str("stub"),
        }
    }
}
