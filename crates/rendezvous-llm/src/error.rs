//! Error types for the generation client.
//!
//! Every failure of the external text-generation capability surfaces as an
//! [`LlmError`]. Callers treat all variants except [`LlmError::Parse`] as
//! fatal for the conversation that issued the request.

/// Errors that can occur while talking to a generation backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The backend returned an error status or was unreachable.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// The request exceeded the configured deadline.
    #[error("timeout: generation request exceeded deadline")]
    Timeout,

    /// The response text did not contain the expected structure.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify a `reqwest` failure.
    pub(crate) fn from_request(backend: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Backend(format!("{backend} request failed: {err}"))
        }
    }
}
