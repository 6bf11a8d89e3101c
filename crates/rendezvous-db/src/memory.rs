//! In-process document store.
//!
//! Keeps every collection in one mutex-guarded map set. Used for offline
//! runs and tests; nothing survives a restart.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rendezvous_types::{
    AgentId, AgentProfile, AgentType, ConversationId, ConversationRecord, ConversationTurn,
    MatchRecord,
};

use crate::error::DbError;
use crate::store::Completion;

#[derive(Debug, Default)]
struct Collections {
    agents: BTreeMap<AgentId, AgentProfile>,
    conversations: BTreeMap<ConversationId, ConversationRecord>,
    matches: Vec<MatchRecord>,
}

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id or username is taken.
    pub fn insert_agent(&self, profile: &AgentProfile) -> Result<(), DbError> {
        let mut inner = self.lock();
        if inner.agents.contains_key(&profile.id) {
            return Err(DbError::AlreadyExists(format!(
                "agent {} already exists",
                profile.id
            )));
        }
        if inner.agents.values().any(|a| a.username == profile.username) {
            return Err(DbError::AlreadyExists(format!(
                "username '{}' already exists",
                profile.username
            )));
        }
        inner.agents.insert(profile.id, profile.clone());
        Ok(())
    }

    /// Fetch one profile.
    pub fn get_agent(&self, id: AgentId) -> Option<AgentProfile> {
        self.lock().agents.get(&id).cloned()
    }

    /// Fetch one profile by username.
    pub fn get_agent_by_username(&self, username: &str) -> Option<AgentProfile> {
        self.lock()
            .agents
            .values()
            .find(|a| a.username == username)
            .cloned()
    }

    /// Profiles newest first, optionally of one type.
    pub fn list_agents(&self, agent_type: Option<AgentType>) -> Vec<AgentProfile> {
        let mut agents: Vec<AgentProfile> = self
            .lock()
            .agents
            .values()
            .filter(|a| agent_type.is_none_or(|t| a.agent_type == t))
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        agents
    }

    /// Replace a stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no profile has this id and
    /// [`DbError::AlreadyExists`] if another profile owns the username.
    pub fn update_agent(&self, profile: &AgentProfile) -> Result<(), DbError> {
        let mut inner = self.lock();
        if inner
            .agents
            .values()
            .any(|a| a.id != profile.id && a.username == profile.username)
        {
            return Err(DbError::AlreadyExists(format!(
                "username '{}' already exists",
                profile.username
            )));
        }
        let Some(slot) = inner.agents.get_mut(&profile.id) else {
            return Err(DbError::not_found("agent", profile.id));
        };
        *slot = profile.clone();
        Ok(())
    }

    /// Delete a profile with its conversations and matches.
    pub fn delete_agent(&self, id: AgentId) -> bool {
        let mut inner = self.lock();
        if inner.agents.remove(&id).is_none() {
            return false;
        }
        inner.conversations.retain(|_, c| !c.involves(id));
        inner
            .matches
            .retain(|m| m.recruiter.agent_id != id && m.candidate.agent_id != id);
        true
    }

    /// Delete every profile, conversation and match.
    pub fn delete_all_agents(&self) -> u64 {
        let mut inner = self.lock();
        let count = u64::try_from(inner.agents.len()).unwrap_or(u64::MAX);
        *inner = Collections::default();
        count
    }

    /// Insert a conversation record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id is taken.
    pub fn insert_conversation(&self, record: &ConversationRecord) -> Result<(), DbError> {
        let mut inner = self.lock();
        if inner.conversations.contains_key(&record.id) {
            return Err(DbError::AlreadyExists(format!(
                "conversation {} already exists",
                record.id
            )));
        }
        inner.conversations.insert(record.id, record.clone());
        Ok(())
    }

    /// Fetch one conversation.
    pub fn get_conversation(&self, id: ConversationId) -> Option<ConversationRecord> {
        self.lock().conversations.get(&id).cloned()
    }

    /// Conversations newest first, optionally involving one agent.
    pub fn list_conversations(&self, agent_id: Option<AgentId>) -> Vec<ConversationRecord> {
        let mut records: Vec<ConversationRecord> = self
            .lock()
            .conversations
            .values()
            .filter(|c| agent_id.is_none_or(|id| c.involves(id)))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records
    }

    /// Append a turn.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the conversation does not exist.
    pub fn append_turn(&self, id: ConversationId, turn: &ConversationTurn) -> Result<(), DbError> {
        let mut inner = self.lock();
        let Some(record) = inner.conversations.get_mut(&id) else {
            return Err(DbError::not_found("conversation", id));
        };
        record.turns.push(turn.clone());
        Ok(())
    }

    /// Mark a conversation completed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the conversation does not exist.
    pub fn complete_conversation(
        &self,
        id: ConversationId,
        completion: &Completion,
    ) -> Result<ConversationRecord, DbError> {
        let mut inner = self.lock();
        let Some(record) = inner.conversations.get_mut(&id) else {
            return Err(DbError::not_found("conversation", id));
        };
        completion.apply(record);
        Ok(record.clone())
    }

    /// Insert a match record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id is taken.
    pub fn insert_match(&self, record: &MatchRecord) -> Result<(), DbError> {
        let mut inner = self.lock();
        if inner.matches.iter().any(|m| m.id == record.id) {
            return Err(DbError::AlreadyExists(format!(
                "match {} already exists",
                record.id
            )));
        }
        inner.matches.push(record.clone());
        Ok(())
    }

    /// Matches newest first, optionally at or above a score.
    pub fn list_matches(&self, min_score: Option<u8>) -> Vec<MatchRecord> {
        let mut matches: Vec<MatchRecord> = self
            .lock()
            .matches
            .iter()
            .filter(|m| min_score.is_none_or(|min| m.score >= min))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matches
    }
}
