//! Core entity structs for the Rendezvous simulation.
//!
//! Covers the live world state (`AgentState`, `WorldState`), the output of
//! one reasoning pass (`ThoughtSignature`), and the persisted dialogue
//! records (`ConversationTurn`, `ConversationRecord`, `MatchRecord`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentStatus, AgentType, ConversationStatus, Decision, ThinkingLevel};
use crate::ids::{AgentId, ConversationId, MatchId};

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Position and status of one agent present in the world.
///
/// `status == Talking` holds exactly when `partner_id` is set, and the
/// partner's own `partner_id` points back at this agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentState {
    /// Profile id of the agent.
    pub agent_id: AgentId,
    /// Display name copied from the profile.
    pub name: String,
    /// Recruiter or candidate.
    pub agent_type: AgentType,
    /// Horizontal position in world units.
    pub x: f64,
    /// Vertical position in world units.
    pub y: f64,
    /// Horizontal coordinate of the walk target, if walking.
    pub target_x: Option<f64>,
    /// Vertical coordinate of the walk target, if walking.
    pub target_y: Option<f64>,
    /// Current motion/dialogue status.
    pub status: AgentStatus,
    /// Conversation partner while talking.
    pub partner_id: Option<AgentId>,
    /// Seconds accumulated in the current idle period.
    pub idle_elapsed: f64,
}

impl AgentState {
    /// A freshly spawned, idle agent at `(x, y)`.
    pub const fn new_idle(
        agent_id: AgentId,
        name: String,
        agent_type: AgentType,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            agent_id,
            name,
            agent_type,
            x,
            y,
            target_x: None,
            target_y: None,
            status: AgentStatus::Idle,
            partner_id: None,
            idle_elapsed: 0.0,
        }
    }

    /// Whether the agent is currently in a conversation.
    pub const fn is_talking(&self) -> bool {
        matches!(self.status, AgentStatus::Talking)
    }

    /// Euclidean distance to another agent.
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Enter a conversation with `partner`, abandoning any walk target.
    pub const fn begin_talking(&mut self, partner: AgentId) {
        self.status = AgentStatus::Talking;
        self.partner_id = Some(partner);
        self.target_x = None;
        self.target_y = None;
        self.idle_elapsed = 0.0;
    }

    /// Return to idle with no partner and no target.
    pub const fn release(&mut self) {
        self.status = AgentStatus::Idle;
        self.partner_id = None;
        self.target_x = None;
        self.target_y = None;
        self.idle_elapsed = 0.0;
    }
}

/// A conversation currently being driven by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActiveConversation {
    /// Id of the persisted conversation record.
    pub conversation_id: ConversationId,
    /// The recruiting side.
    pub recruiter: Participant,
    /// The candidate side.
    pub candidate: Participant,
    /// When the conversation was started.
    pub started_at: DateTime<Utc>,
}

/// Point-in-time view of the whole world, broadcast every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// Every agent present in the world, ordered by id.
    pub agents: Vec<AgentState>,
    /// Conversations in flight, keyed by conversation id.
    pub active_conversations: BTreeMap<ConversationId, ActiveConversation>,
    /// World width in units.
    pub width: f64,
    /// World height in units.
    pub height: f64,
    /// Whether the tick loop is running.
    pub running: bool,
}

// ---------------------------------------------------------------------------
// Thinking
// ---------------------------------------------------------------------------

/// Outcome of one reasoning pass by the thinking controller.
///
/// The keys of `goal_progress` are always exactly the criteria the
/// conversation started with; entries are flipped, never added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ThoughtSignature {
    /// Depth of reasoning that produced this signature.
    pub thinking_level: ThinkingLevel,
    /// Short summary of what the last answer revealed.
    pub what_learned: String,
    /// Criterion text to verified flag.
    pub goal_progress: BTreeMap<String, bool>,
    /// Confidence that the candidate is a match, in `[0, 100]`.
    pub match_confidence: u8,
    /// Guidance for the recruiter's next message.
    pub next_action: String,
    /// Correction of an earlier misjudgement, if any.
    pub self_correction: Option<String>,
    /// The recruiter has enough information to wrap up.
    pub should_conclude: bool,
    /// A deal-breaker surfaced.
    pub critical_mismatch: bool,
    /// Fixed tariff charged for this level.
    #[ts(as = "String")]
    pub cost: Decimal,
}

impl ThoughtSignature {
    /// Number of criteria not yet verified.
    pub fn remaining_unverified(&self) -> usize {
        self.goal_progress.values().filter(|verified| !**verified).count()
    }

    /// Criteria verified so far, in key order.
    pub fn verified(&self) -> impl Iterator<Item = &str> {
        self.goal_progress
            .iter()
            .filter(|(_, verified)| **verified)
            .map(|(criterion, _)| criterion.as_str())
    }

    /// Criteria still unverified, in key order.
    pub fn unverified(&self) -> impl Iterator<Item = &str> {
        self.goal_progress
            .iter()
            .filter(|(_, verified)| !**verified)
            .map(|(criterion, _)| criterion.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conversation records
// ---------------------------------------------------------------------------

/// Identity of one side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Participant {
    /// Profile id.
    pub agent_id: AgentId,
    /// Display name at the time of the conversation.
    pub name: String,
}

/// One emitted message in a dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConversationTurn {
    /// Who spoke.
    pub role: AgentType,
    /// Speaker display name.
    pub speaker_name: String,
    /// Message text.
    pub content: String,
    /// When the turn was produced.
    pub timestamp: DateTime<Utc>,
    /// Whether this is the recruiter's closing turn.
    pub is_final: bool,
    /// Full evaluation text, present on the final turn only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub final_evaluation: Option<String>,
    /// Thinking level that guided a recruiter turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub thinking_level: Option<ThinkingLevel>,
    /// Recruiter confidence after the analysis that preceded this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub match_confidence: Option<u8>,
}

/// Persisted transcript and outcome of one dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConversationRecord {
    /// Conversation id.
    pub id: ConversationId,
    /// The recruiting side.
    pub recruiter: Participant,
    /// The candidate side.
    pub candidate: Participant,
    /// Turns in emission order.
    pub turns: Vec<ConversationTurn>,
    /// Lifecycle status.
    pub status: ConversationStatus,
    /// Evaluation text produced on conclusion.
    pub final_evaluation: Option<String>,
    /// Rating out of ten parsed from the evaluation.
    pub match_score: Option<u8>,
    /// Decision parsed from the evaluation.
    pub decision: Option<Decision>,
    /// Thinking cost accumulated over the conversation.
    #[ts(as = "String")]
    pub total_cost: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    /// A new, empty, in-progress record.
    pub fn start(id: ConversationId, recruiter: Participant, candidate: Participant) -> Self {
        Self {
            id,
            recruiter,
            candidate,
            turns: Vec::new(),
            status: ConversationStatus::InProgress,
            final_evaluation: None,
            match_score: None,
            decision: None,
            total_cost: Decimal::ZERO,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether `agent_id` took part in this conversation.
    pub fn involves(&self, agent_id: AgentId) -> bool {
        self.recruiter.agent_id == agent_id || self.candidate.agent_id == agent_id
    }
}

/// A conversation that produced both a score and a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MatchRecord {
    /// Match id.
    pub id: MatchId,
    /// Conversation the match was derived from.
    pub conversation_id: ConversationId,
    /// The recruiting side.
    pub recruiter: Participant,
    /// The candidate side.
    pub candidate: Participant,
    /// Rating out of ten.
    pub score: u8,
    /// Hiring decision.
    pub decision: Decision,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
