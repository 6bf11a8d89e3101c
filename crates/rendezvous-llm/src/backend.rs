//! Generation backends.
//!
//! Enum dispatch instead of trait objects because async methods are not
//! dyn-compatible. Two HTTP backends speak to real models; the stub backend
//! answers from a closure, which serves both offline runs and tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rendezvous_types::ThinkingLevel;
use tracing::debug;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::LlmError;
use crate::message::{ChatRole, GenerationPurpose, GenerationRequest, OutputShape};

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A backend that turns a [`GenerationRequest`] into response text.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// In-process responder.
    Stub(StubBackend),
}

impl LlmBackend {
    /// Send a request and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Backend`] or [`LlmError::Timeout`] if the call
    /// fails or the response cannot be extracted.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        debug!(
            backend = self.name(),
            purpose = %request.purpose,
            messages = request.messages.len(),
            "Generation request"
        );
        match self {
            Self::OpenAi(backend) => backend.generate(request).await,
            Self::Anthropic(backend) => backend.generate(request).await,
            Self::Stub(backend) => backend.generate(request),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Stub(_) => "stub",
        }
    }
}

/// Build a `reqwest` client with the configured deadline.
fn http_client(config: &LlmBackendConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))
}

/// Read an error body for inclusion in a [`LlmError::Backend`].
async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_owned())
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if request.shape == OutputShape::Json {
            if let Some(map) = body.as_object_mut() {
                map.insert(
                    "response_format".to_owned(),
                    serde_json::json!({"type": "json_object"}),
                );
            }
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_request("OpenAI", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = error_body(response).await;
            return Err(LlmError::Backend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            LlmError::Backend("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - System messages become a top-level `system` field
/// - Response structure differs: `content[0].text`
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.api_url);

        let mut messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();
        if messages.is_empty() {
            messages.push(serde_json::json!({"role": "user", "content": ""}));
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": request.system_prompt(),
            "messages": messages,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_request("Anthropic", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = error_body(response).await;
            return Err(LlmError::Backend(format!(
                "Anthropic returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("Anthropic response parse failed: {e}")))?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LlmError::Backend("Anthropic response missing content[0].text".to_owned()))
}

// ---------------------------------------------------------------------------
// Stub backend
// ---------------------------------------------------------------------------

/// Signature of a stub responder.
pub type Responder = dyn Fn(&GenerationRequest) -> Result<String, LlmError> + Send + Sync;

/// Answers requests from an in-process closure.
///
/// [`StubBackend::canned`] produces a plausible, never-concluding dialogue
/// so the simulation runs end to end without a network.
pub struct StubBackend {
    responder: Arc<Responder>,
    calls: AtomicUsize,
}

impl StubBackend {
    /// A stub that answers with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// A stub with fixed responses for each purpose.
    pub fn canned() -> Self {
        Self::new(|request| Ok(canned_response(request.purpose).to_owned()))
    }

    /// Number of requests answered so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        (self.responder)(request)
    }
}

/// Canned text for each request purpose.
pub const fn canned_response(purpose: GenerationPurpose) -> &'static str {
    match purpose {
        GenerationPurpose::RecruiterOpening => {
            "Hi there, thanks for stopping to chat! I'm hiring for a backend role. \
             Could you tell me a bit about what you're working on at the moment?"
        }
        GenerationPurpose::RecruiterFollowUp => {
            "That's really helpful context. Could you walk me through a recent project \
             you're proud of and the part you personally owned?"
        }
        GenerationPurpose::CandidateReply => {
            "Sure. In my current role I build and operate backend services, mostly \
             around data pipelines and APIs, and I've been leading a small team for \
             the last year while still writing a good share of the code myself."
        }
        GenerationPurpose::Analysis(ThinkingLevel::Execution) => "{}",
        GenerationPurpose::Analysis(_) => {
            r#"{"what_learned": "The candidate described relevant backend experience.", "goal_progress": {}, "confidence_delta": 5, "self_correction": null, "next_action": "Ask for a concrete example that verifies an open criterion.", "should_conclude": false, "critical_mismatch": false}"#
        }
        GenerationPurpose::FinalEvaluation => {
            r#"{"closing_remark": "Thanks so much for your time today, I'll be in touch about next steps.", "evaluation": "✓ Relevant backend experience\n✗ Remaining criteria not discussed in depth\nRating: 6/10\nDecision: GOOD FIT"}"#
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a backend from configuration.
///
/// # Errors
///
/// Returns [`LlmError::Config`] if the configuration is incomplete or the
/// HTTP client cannot be built.
pub fn create_backend(config: &LlmBackendConfig) -> Result<LlmBackend, LlmError> {
    config.validate()?;
    Ok(match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)?),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)?),
        BackendType::Stub => LlmBackend::Stub(StubBackend::canned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::extract_json;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {"content": "Hello from the model"}
            }]
        });
        let result = extract_openai_content(&json);
        assert_eq!(result.ok().as_deref(), Some("Hello from the model"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{"type": "text", "text": "Rating: 7/10"}]
        });
        let result = extract_anthropic_content(&json);
        assert_eq!(result.ok().as_deref(), Some("Rating: 7/10"));
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let mut config = LlmBackendConfig::stub();
        let backend = create_backend(&config);
        assert_eq!(backend.ok().map(|b| b.name().to_owned()).as_deref(), Some("stub"));

        config.backend_type = BackendType::OpenAi;
        config.api_url = "https://api.openai.com/v1".to_owned();
        config.model = "test-model".to_owned();
        let backend = create_backend(&config);
        assert_eq!(
            backend.ok().map(|b| b.name().to_owned()).as_deref(),
            Some("openai-compatible")
        );

        config.backend_type = BackendType::Anthropic;
        let backend = create_backend(&config);
        assert_eq!(backend.ok().map(|b| b.name().to_owned()).as_deref(), Some("anthropic"));
    }

    #[test]
    fn create_backend_rejects_incomplete_network_config() {
        let mut config = LlmBackendConfig::stub();
        config.backend_type = BackendType::Anthropic;
        assert!(matches!(create_backend(&config), Err(LlmError::Config(_))));
    }

    #[tokio::test]
    async fn stub_counts_calls_and_uses_responder() {
        let backend = LlmBackend::Stub(StubBackend::new(|request| {
            Ok(format!("echo {}", request.purpose))
        }));
        let request = GenerationRequest::new(
            GenerationPurpose::CandidateReply,
            "system",
            "user",
            OutputShape::Text,
        );
        let text = backend.generate(&request).await;
        assert_eq!(text.ok().as_deref(), Some("echo candidate_reply"));
        if let LlmBackend::Stub(stub) = &backend {
            assert_eq!(stub.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn stub_propagates_errors() {
        let backend = LlmBackend::Stub(StubBackend::new(|_| Err(LlmError::Timeout)));
        let request = GenerationRequest::new(
            GenerationPurpose::RecruiterOpening,
            "system",
            "user",
            OutputShape::Text,
        );
        assert!(matches!(backend.generate(&request).await, Err(LlmError::Timeout)));
    }

    #[test]
    fn canned_analysis_is_valid_json() {
        let raw = canned_response(GenerationPurpose::Analysis(ThinkingLevel::Tactical));
        let value: Result<serde_json::Value, _> = extract_json(raw);
        assert!(value.is_ok());
        let raw = canned_response(GenerationPurpose::FinalEvaluation);
        let value: Result<serde_json::Value, _> = extract_json(raw);
        assert!(value.is_ok());
    }
}
