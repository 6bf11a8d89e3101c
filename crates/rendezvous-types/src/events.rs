//! Events pushed to world observers.
//!
//! Every event serializes with an internal `type` tag, e.g.
//! `{"type": "ping"}` or `{"type": "world_state", "data": {...}}`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Decision;
use crate::ids::ConversationId;
use crate::structs::{ConversationTurn, WorldState};

/// An event delivered to every subscriber of the world event hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WorldEvent {
    /// Full world snapshot, sent every tick and after every turn.
    WorldState {
        /// The snapshot.
        data: WorldState,
    },
    /// A conversation produced a turn.
    Turn {
        /// The turn and where it belongs.
        data: TurnEvent,
    },
    /// A conversation reached its final evaluation.
    Complete {
        /// The finished conversation.
        conversation_id: ConversationId,
        /// Parsed rating, if any.
        match_score: Option<u8>,
        /// Parsed decision, if any.
        decision: Option<Decision>,
    },
    /// Keepalive sent when no other event arrived within the window.
    Ping,
    /// A conversation task failed.
    Error {
        /// What went wrong.
        message: String,
        /// The failed conversation, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<ConversationId>,
    },
}

impl WorldEvent {
    /// The conversation this event belongs to, if any.
    pub const fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            Self::Turn { data } => Some(data.conversation_id),
            Self::Complete {
                conversation_id, ..
            } => Some(*conversation_id),
            Self::Error {
                conversation_id, ..
            } => *conversation_id,
            Self::WorldState { .. } | Self::Ping => None,
        }
    }
}

/// Payload of a `turn` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TurnEvent {
    /// Conversation the turn belongs to.
    pub conversation_id: ConversationId,
    /// Zero-based position of the turn in the transcript.
    pub index: u32,
    /// The turn itself.
    pub turn: ConversationTurn,
}
