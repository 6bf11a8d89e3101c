//! Agent profile management through the engine.
//!
//! Profiles live in the document store. Deleting a profile also takes the
//! agent out of the world so no position outlives its profile.

use chrono::Utc;
use rendezvous_types::{AgentId, AgentProfile, AgentType, ProfileDetails};
use serde::Deserialize;
use tracing::info;

use crate::engine::WorldEngine;
use crate::error::EngineError;

/// Caller-supplied profile fields. Id and creation time are assigned by
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileDraft {
    /// Unique handle.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Recruiter or candidate.
    pub agent_type: AgentType,
    /// Role-specific body; must agree with `agent_type`.
    pub details: ProfileDetails,
}

impl ProfileDraft {
    fn into_profile(self, id: AgentId, created_at: chrono::DateTime<Utc>) -> AgentProfile {
        AgentProfile {
            id,
            username: self.username.trim().to_owned(),
            name: self.name.trim().to_owned(),
            agent_type: self.agent_type,
            details: self.details,
            created_at,
        }
    }
}

impl WorldEngine {
    /// Create a profile.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] if validation fails and
    /// [`EngineError::AlreadyExists`] if the username is taken.
    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<AgentProfile, EngineError> {
        let profile = draft.into_profile(AgentId::new(), Utc::now());
        profile.validate().map_err(EngineError::InvalidArgument)?;
        self.service().store().insert_agent(&profile).await?;
        info!(
            agent_id = %profile.id,
            username = %profile.username,
            agent_type = profile.agent_type.as_str(),
            "Profile created"
        );
        Ok(profile)
    }

    /// Fetch a profile.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if it does not exist.
    pub async fn profile(&self, id: AgentId) -> Result<AgentProfile, EngineError> {
        self.service()
            .store()
            .get_agent(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("agent {id}")))
    }

    /// Look a profile up by username.
    ///
    /// # Errors
    ///
    /// [`EngineError::Storage`] if the store fails.
    pub async fn profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AgentProfile>, EngineError> {
        Ok(self
            .service()
            .store()
            .get_agent_by_username(username.trim())
            .await?)
    }

    /// Profiles newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// [`EngineError::Storage`] if the store fails.
    pub async fn list_profiles(
        &self,
        agent_type: Option<AgentType>,
    ) -> Result<Vec<AgentProfile>, EngineError> {
        Ok(self.service().store().list_agents(agent_type).await?)
    }

    /// Replace a profile's fields. The agent type cannot change.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if it does not exist,
    /// [`EngineError::InvalidArgument`] on a type change or failed
    /// validation and [`EngineError::AlreadyExists`] if the new username is
    /// taken.
    pub async fn update_profile(
        &self,
        id: AgentId,
        draft: ProfileDraft,
    ) -> Result<AgentProfile, EngineError> {
        let existing = self.profile(id).await?;
        if draft.agent_type != existing.agent_type {
            return Err(EngineError::InvalidArgument(format!(
                "agent {id} is a {} and cannot become a {}",
                existing.agent_type, draft.agent_type
            )));
        }
        let profile = draft.into_profile(id, existing.created_at);
        profile.validate().map_err(EngineError::InvalidArgument)?;
        self.service().store().update_agent(&profile).await?;
        info!(agent_id = %id, "Profile updated");
        Ok(profile)
    }

    /// Delete a profile along with its conversations and matches, and take
    /// the agent out of the world.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if it does not exist.
    pub async fn delete_profile(&self, id: AgentId) -> Result<(), EngineError> {
        if !self.service().store().delete_agent(id).await? {
            return Err(EngineError::NotFound(format!("agent {id}")));
        }
        self.remove(id);
        info!(agent_id = %id, "Profile deleted");
        Ok(())
    }

    /// Delete every profile and empty the world. Returns how many profiles
    /// were deleted.
    ///
    /// # Errors
    ///
    /// [`EngineError::Storage`] if the store fails.
    pub async fn delete_all_profiles(&self) -> Result<u64, EngineError> {
        let deleted = self.service().store().delete_all_agents().await?;
        self.clear();
        info!(deleted, "All profiles deleted");
        Ok(deleted)
    }
}
