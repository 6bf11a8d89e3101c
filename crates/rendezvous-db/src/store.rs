//! Backend-independent document store.
//!
//! [`DocumentStore`] dispatches every operation to either the in-memory
//! backend or `PostgreSQL`, so callers never care which one is configured.

use chrono::{DateTime, Utc};
use rendezvous_types::{
    AgentId, AgentProfile, AgentType, ConversationId, ConversationRecord, ConversationStatus,
    ConversationTurn, Decision, MatchRecord,
};
use rust_decimal::Decimal;

use crate::agent_store::AgentStore;
use crate::conversation_store::ConversationStore;
use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::postgres::{PostgresConfig, PostgresPool};

/// Fields set when a conversation concludes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Full evaluation text.
    pub final_evaluation: String,
    /// Parsed rating, if any.
    pub match_score: Option<u8>,
    /// Parsed decision, if any.
    pub decision: Option<Decision>,
    /// Thinking cost of the conversation.
    pub total_cost: Decimal,
    /// When the conversation concluded.
    pub completed_at: DateTime<Utc>,
}

impl Completion {
    pub(crate) fn apply(&self, record: &mut ConversationRecord) {
        record.status = ConversationStatus::Completed;
        record.final_evaluation = Some(self.final_evaluation.clone());
        record.match_score = self.match_score;
        record.decision = self.decision;
        record.total_cost = self.total_cost;
        record.completed_at = Some(self.completed_at);
    }
}

/// Profiles, conversations and matches behind one interface.
pub enum DocumentStore {
    /// Non-persistent, in-process.
    Memory(MemoryStore),
    /// `PostgreSQL` with JSONB documents.
    Postgres(PostgresPool),
}

impl DocumentStore {
    /// An empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Connect to `PostgreSQL` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or a migration fails.
    pub async fn postgres(config: &PostgresConfig) -> Result<Self, DbError> {
        Ok(Self::Postgres(PostgresPool::connect(config).await?))
    }

    /// Backend name for logs.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Self::Postgres(pool) = self {
            pool.close().await;
        }
    }

    // -- agents -------------------------------------------------------------

    /// Insert a profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id or username is taken.
    pub async fn insert_agent(&self, profile: &AgentProfile) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_agent(profile),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).insert(profile).await,
        }
    }

    /// Fetch one profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn get_agent(&self, id: AgentId) -> Result<Option<AgentProfile>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.get_agent(id)),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).get(id).await,
        }
    }

    /// Fetch one profile by username.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn get_agent_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AgentProfile>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.get_agent_by_username(username)),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).get_by_username(username).await,
        }
    }

    /// Profiles newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list_agents(
        &self,
        agent_type: Option<AgentType>,
    ) -> Result<Vec<AgentProfile>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.list_agents(agent_type)),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).list(agent_type).await,
        }
    }

    /// Replace a stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown id and
    /// [`DbError::AlreadyExists`] for a taken username.
    pub async fn update_agent(&self, profile: &AgentProfile) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.update_agent(profile),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).update(profile).await,
        }
    }

    /// Delete a profile with its conversations and matches.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete_agent(&self, id: AgentId) -> Result<bool, DbError> {
        match self {
            Self::Memory(m) => Ok(m.delete_agent(id)),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).delete(id).await,
        }
    }

    /// Delete every profile, conversation and match.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete_all_agents(&self) -> Result<u64, DbError> {
        match self {
            Self::Memory(m) => Ok(m.delete_all_agents()),
            Self::Postgres(pg) => AgentStore::new(pg.pool()).delete_all().await,
        }
    }

    // -- conversations ------------------------------------------------------

    /// Insert a conversation record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id is taken.
    pub async fn insert_conversation(&self, record: &ConversationRecord) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_conversation(record),
            Self::Postgres(pg) => ConversationStore::new(pg.pool()).insert(record).await,
        }
    }

    /// Fetch one conversation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<ConversationRecord>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.get_conversation(id)),
            Self::Postgres(pg) => ConversationStore::new(pg.pool()).get(id).await,
        }
    }

    /// Conversations newest first, optionally involving one agent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list_conversations(
        &self,
        agent_id: Option<AgentId>,
    ) -> Result<Vec<ConversationRecord>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.list_conversations(agent_id)),
            Self::Postgres(pg) => ConversationStore::new(pg.pool()).list(agent_id).await,
        }
    }

    /// Append one turn to a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the conversation does not exist.
    pub async fn append_turn(
        &self,
        id: ConversationId,
        turn: &ConversationTurn,
    ) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.append_turn(id, turn),
            Self::Postgres(pg) => ConversationStore::new(pg.pool()).append_turn(id, turn).await,
        }
    }

    /// Mark a conversation completed and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the conversation does not exist.
    pub async fn complete_conversation(
        &self,
        id: ConversationId,
        completion: &Completion,
    ) -> Result<ConversationRecord, DbError> {
        match self {
            Self::Memory(m) => m.complete_conversation(id, completion),
            Self::Postgres(pg) => {
                ConversationStore::new(pg.pool())
                    .complete(id, completion)
                    .await
            }
        }
    }

    // -- matches ------------------------------------------------------------

    /// Insert a match record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id is taken.
    pub async fn insert_match(&self, record: &MatchRecord) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_match(record),
            Self::Postgres(pg) => ConversationStore::new(pg.pool()).insert_match(record).await,
        }
    }

    /// Matches newest first, optionally at or above a score.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list_matches(&self, min_score: Option<u8>) -> Result<Vec<MatchRecord>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.list_matches(min_score)),
            Self::Postgres(pg) => {
                ConversationStore::new(pg.pool())
                    .list_matches(min_score)
                    .await
            }
        }
    }
}
