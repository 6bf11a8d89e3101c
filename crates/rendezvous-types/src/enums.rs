//! Enumeration types for the Rendezvous simulation.
//!
//! Role and status values are closed enums so that every comparison is an
//! exhaustive `match` rather than a string test.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// The role an agent plays in a dialogue.
///
/// Also used as the speaker role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentType {
    /// Screens candidates against a set of selection criteria.
    Recruiter,
    /// Answers the recruiter's questions about their background.
    Candidate,
}

impl AgentType {
    /// The role on the other side of a dialogue.
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Recruiter => Self::Candidate,
            Self::Candidate => Self::Recruiter,
        }
    }

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recruiter => "recruiter",
            Self::Candidate => "candidate",
        }
    }
}

impl core::fmt::Display for AgentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Motion/dialogue status of an agent in the world.
///
/// Legal transitions are `Idle -> Walking -> Idle` and
/// `Idle | Walking -> Talking -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentStatus {
    /// Standing still, accumulating idle time.
    Idle,
    /// Moving toward a target point.
    Walking,
    /// Engaged in a conversation with `partner_id`.
    Talking,
}

// ---------------------------------------------------------------------------
// Thinking
// ---------------------------------------------------------------------------

/// Discrete tier of reasoning depth, ordered by increasing cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ThinkingLevel {
    /// Deterministic, no generation call.
    Execution,
    /// Quick read of the latest answer.
    Tactical,
    /// Deeper assessment, may decide to conclude.
    Strategic,
    /// Explicit deep reflection. Never chosen by the selection policy.
    MetaCognitive,
}

impl ThinkingLevel {
    /// All levels in ascending order of cost.
    pub const ALL: [Self; 4] = [
        Self::Execution,
        Self::Tactical,
        Self::Strategic,
        Self::MetaCognitive,
    ];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Tactical => "tactical",
            Self::Strategic => "strategic",
            Self::MetaCognitive => "meta_cognitive",
        }
    }
}

impl core::fmt::Display for ThinkingLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// Lifecycle status of a persisted conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ConversationStatus {
    /// Turns are still being produced (or the task failed mid-way).
    InProgress,
    /// A final evaluation was recorded.
    Completed,
}

/// Binary hiring decision extracted from a final evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Decision {
    /// The candidate should progress.
    GoodFit,
    /// The candidate should not progress.
    NotAFit,
}

impl core::fmt::Display for Decision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GoodFit => f.write_str("GOOD FIT"),
            Self::NotAFit => f.write_str("NOT A FIT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&AgentType::Recruiter).unwrap_or_default(),
            "\"recruiter\""
        );
        let parsed: Result<AgentType, _> = serde_json::from_str("\"candidate\"");
        assert!(matches!(parsed, Ok(AgentType::Candidate)));
        let bad: Result<AgentType, _> = serde_json::from_str("\"manager\"");
        assert!(bad.is_err());
    }

    #[test]
    fn counterpart_flips_role() {
        assert_eq!(AgentType::Recruiter.counterpart(), AgentType::Candidate);
        assert_eq!(AgentType::Candidate.counterpart(), AgentType::Recruiter);
    }

    #[test]
    fn thinking_levels_are_ordered_by_cost() {
        assert!(ThinkingLevel::Execution < ThinkingLevel::Tactical);
        assert!(ThinkingLevel::Tactical < ThinkingLevel::Strategic);
        assert!(ThinkingLevel::Strategic < ThinkingLevel::MetaCognitive);
        assert_eq!(
            serde_json::to_string(&ThinkingLevel::MetaCognitive).unwrap_or_default(),
            "\"meta_cognitive\""
        );
    }

    #[test]
    fn decision_wire_format() {
        assert_eq!(
            serde_json::to_string(&Decision::NotAFit).unwrap_or_default(),
            "\"NOT_A_FIT\""
        );
        assert_eq!(Decision::GoodFit.to_string(), "GOOD FIT");
    }
}
