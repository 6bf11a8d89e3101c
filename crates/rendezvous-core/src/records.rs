//! Read access to conversation and match records, and engine statistics.

use rendezvous_dialogue::CostSummary;
use rendezvous_types::{AgentId, ConversationId, ConversationRecord, MatchRecord};
use serde::Serialize;

use crate::engine::WorldEngine;
use crate::error::EngineError;

/// Lowest score a match can carry.
pub const MIN_MATCH_SCORE: u8 = 1;

/// Highest score a match can carry.
pub const MAX_MATCH_SCORE: u8 = 10;

/// Counters reported by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Thinking passes and cost across all conversations.
    pub costs: CostSummary,
    /// Agents currently in the world.
    pub agents_in_world: usize,
    /// Conversations currently being driven.
    pub active_conversations: usize,
    /// Whether the tick loop is running.
    pub running: bool,
}

impl WorldEngine {
    /// Fetch one conversation record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if it does not exist.
    pub async fn conversation(&self, id: ConversationId) -> Result<ConversationRecord, EngineError> {
        self.service()
            .store()
            .get_conversation(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("conversation {id}")))
    }

    /// Conversations newest first, optionally involving one agent.
    ///
    /// # Errors
    ///
    /// [`EngineError::Storage`] if the store fails.
    pub async fn list_conversations(
        &self,
        agent_id: Option<AgentId>,
    ) -> Result<Vec<ConversationRecord>, EngineError> {
        Ok(self.service().store().list_conversations(agent_id).await?)
    }

    /// Matches newest first, optionally at or above `min_score`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] if `min_score` is outside 1..=10.
    pub async fn list_matches(&self, min_score: Option<u8>) -> Result<Vec<MatchRecord>, EngineError> {
        if let Some(score) = min_score
            && !(MIN_MATCH_SCORE..=MAX_MATCH_SCORE).contains(&score)
        {
            return Err(EngineError::InvalidArgument(format!(
                "min_score must be between {MIN_MATCH_SCORE} and {MAX_MATCH_SCORE}, got {score}"
            )));
        }
        Ok(self.service().store().list_matches(min_score).await?)
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        let snapshot = self.snapshot();
        EngineStats {
            costs: self.service().costs().summary(),
            agents_in_world: snapshot.agents.len(),
            active_conversations: snapshot.active_conversations.len(),
            running: snapshot.running,
        }
    }
}
