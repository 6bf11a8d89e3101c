//! Starting, driving and persisting conversations.
//!
//! [`ConversationService`] owns the collaborators a conversation needs: the
//! document store, the generation backend, the prompt templates and the
//! shared cost tracker. The world engine asks it to prepare a conversation
//! (validate participants and create the record) and then to drive it to
//! completion on a separate task.

use std::sync::Arc;

use chrono::Utc;
use rendezvous_db::{Completion, DocumentStore};
use rendezvous_dialogue::{
    Conversation, ConversationOutcome, ConversationSettings, CostTracker, DialogueEvent,
    PromptEngine,
};
use rendezvous_llm::LlmBackend;
use rendezvous_types::{
    AgentId, AgentProfile, AgentType, ConversationId, ConversationRecord, MatchId, MatchRecord,
    TurnEvent, WorldEvent,
};
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::hub::EventHub;

/// Runs conversations against the configured collaborators.
pub struct ConversationService {
    store: Arc<DocumentStore>,
    backend: Arc<LlmBackend>,
    prompts: Arc<PromptEngine>,
    settings: ConversationSettings,
    costs: Arc<CostTracker>,
    hub: EventHub,
}

impl ConversationService {
    /// A service publishing to `hub`.
    pub fn new(
        store: Arc<DocumentStore>,
        backend: Arc<LlmBackend>,
        prompts: Arc<PromptEngine>,
        settings: ConversationSettings,
        hub: EventHub,
    ) -> Self {
        Self {
            store,
            backend,
            prompts,
            settings,
            costs: Arc::new(CostTracker::new()),
            hub,
        }
    }

    /// The document store.
    pub const fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// The process-wide thinking cost tally.
    pub const fn costs(&self) -> &Arc<CostTracker> {
        &self.costs
    }

    /// The hub events are published to.
    pub const fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Validate the participants and create an in-progress record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if either profile is missing,
    /// [`EngineError::InvalidArgument`] if the roles do not match and
    /// [`EngineError::Storage`] if the record cannot be written.
    pub async fn prepare(
        &self,
        recruiter_id: AgentId,
        candidate_id: AgentId,
    ) -> Result<(ConversationRecord, Conversation), EngineError> {
        let recruiter = self.profile(recruiter_id, AgentType::Recruiter).await?;
        let candidate = self.profile(candidate_id, AgentType::Candidate).await?;

        let id = ConversationId::new();
        let conversation = Conversation::new(
            id,
            &recruiter,
            &candidate,
            Arc::clone(&self.backend),
            Arc::clone(&self.prompts),
            self.settings,
        )?
        .with_cost_tracker(Arc::clone(&self.costs));

        let record = ConversationRecord::start(id, recruiter.participant(), candidate.participant());
        self.store.insert_conversation(&record).await?;
        info!(
            conversation_id = %id,
            recruiter = %recruiter.name,
            candidate = %candidate.name,
            "Conversation started"
        );
        Ok((record, conversation))
    }

    /// Run `conversation` to completion, persisting and publishing every
    /// turn. `after_turn` runs once per published turn.
    ///
    /// On failure an `error` event is published and the record stays in
    /// progress.
    ///
    /// # Errors
    ///
    /// [`EngineError::GenerationFailure`] if generation fails and
    /// [`EngineError::Storage`] if persistence fails.
    pub async fn drive<F>(
        &self,
        conversation: Conversation,
        after_turn: F,
    ) -> Result<ConversationRecord, EngineError>
    where
        F: FnMut() + Send,
    {
        let id = conversation.id();
        let result = self.run(conversation, after_turn).await;
        if let Err(e) = &result {
            error!(conversation_id = %id, error = %e, "Conversation failed");
            self.hub.publish(WorldEvent::Error {
                message: e.to_string(),
                conversation_id: Some(id),
            });
        }
        result
    }

    async fn run<F>(
        &self,
        conversation: Conversation,
        mut after_turn: F,
    ) -> Result<ConversationRecord, EngineError>
    where
        F: FnMut() + Send,
    {
        let id = conversation.id();
        let mut stream = conversation.into_stream();
        let mut index: u32 = 0;

        while let Some(event) = stream.next_event().await {
            match event? {
                DialogueEvent::Turn(turn) => {
                    self.store.append_turn(id, &turn).await?;
                    debug!(
                        conversation_id = %id,
                        index,
                        role = turn.role.as_str(),
                        level = ?turn.thinking_level,
                        "Turn"
                    );
                    self.hub.publish(WorldEvent::Turn {
                        data: TurnEvent {
                            conversation_id: id,
                            index,
                            turn,
                        },
                    });
                    index = index.saturating_add(1);
                    after_turn();
                }
                DialogueEvent::Concluded(outcome) => return self.complete(id, outcome).await,
            }
        }

        Err(EngineError::GenerationFailure(format!(
            "conversation {id} ended without an outcome"
        )))
    }

    async fn complete(
        &self,
        id: ConversationId,
        outcome: ConversationOutcome,
    ) -> Result<ConversationRecord, EngineError> {
        let completion = Completion {
            final_evaluation: outcome.final_evaluation,
            match_score: outcome.match_score,
            decision: outcome.decision,
            total_cost: outcome.total_cost,
            completed_at: Utc::now(),
        };
        let record = self.store.complete_conversation(id, &completion).await?;

        if let (Some(score), Some(decision)) = (record.match_score, record.decision) {
            let entry = MatchRecord {
                id: MatchId::new(),
                conversation_id: id,
                recruiter: record.recruiter.clone(),
                candidate: record.candidate.clone(),
                score,
                decision,
                created_at: Utc::now(),
            };
            self.store.insert_match(&entry).await?;
        }
        self.costs.record_conversation();

        info!(
            conversation_id = %id,
            score = ?record.match_score,
            decision = ?record.decision,
            turns = record.turns.len(),
            cost = %record.total_cost,
            "Conversation concluded"
        );
        self.hub.publish(WorldEvent::Complete {
            conversation_id: id,
            match_score: record.match_score,
            decision: record.decision,
        });
        Ok(record)
    }

    async fn profile(&self, id: AgentId, expected: AgentType) -> Result<AgentProfile, EngineError> {
        let profile = self
            .store
            .get_agent(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("agent {id}")))?;
        if profile.agent_type != expected {
            return Err(EngineError::InvalidArgument(format!(
                "agent {id} is not a {expected}"
            )));
        }
        Ok(profile)
    }
}
