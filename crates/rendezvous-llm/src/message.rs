//! Request types for the generation capability.
//!
//! A request is an ordered list of role-tagged messages plus a hint about
//! the shape of the expected output.

use rendezvous_types::ThinkingLevel;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the whole exchange.
    System,
    /// Input to the model.
    User,
    /// Prior model output.
    Assistant,
}

/// One message in a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// What the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// Free text.
    Text,
    /// A single JSON object.
    Json,
}

/// Why a request is being made. Used for logging and by the stub backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPurpose {
    /// The recruiter's first message.
    RecruiterOpening,
    /// A recruiter question guided by the latest analysis.
    RecruiterFollowUp,
    /// The candidate's answer.
    CandidateReply,
    /// A thinking-controller analysis at the given level.
    Analysis(ThinkingLevel),
    /// The recruiter's closing remark and evaluation.
    FinalEvaluation,
}

impl core::fmt::Display for GenerationPurpose {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RecruiterOpening => f.write_str("recruiter_opening"),
            Self::RecruiterFollowUp => f.write_str("recruiter_followup"),
            Self::CandidateReply => f.write_str("candidate_reply"),
            Self::Analysis(level) => write!(f, "analysis_{level}"),
            Self::FinalEvaluation => f.write_str("final_evaluation"),
        }
    }
}

/// A complete generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Why the request is made.
    pub purpose: GenerationPurpose,
    /// Messages in order.
    pub messages: Vec<ChatMessage>,
    /// Expected output shape.
    pub shape: OutputShape,
}

impl GenerationRequest {
    /// A request made of one system and one user message.
    pub fn new(
        purpose: GenerationPurpose,
        system: impl Into<String>,
        user: impl Into<String>,
        shape: OutputShape,
    ) -> Self {
        Self {
            purpose,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            shape,
        }
    }

    /// Concatenated system messages.
    pub fn system_prompt(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The last user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}
