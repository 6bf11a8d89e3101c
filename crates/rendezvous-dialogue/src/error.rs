//! Error types for the dialogue layer.

use rendezvous_llm::LlmError;

/// Errors that can abort a conversation.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// The generation capability failed. Fatal for the conversation.
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    /// A prompt template could not be loaded or rendered.
    #[error("template error: {0}")]
    Template(String),

    /// The participants cannot hold a conversation.
    #[error("invalid participants: {0}")]
    InvalidParticipants(String),
}
