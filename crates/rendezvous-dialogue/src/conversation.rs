//! Conversation state machine.
//!
//! Drives one recruiter/candidate dialogue from the opening line to a
//! final evaluation:
//!
//! ```text
//! Opening ──► AwaitingCandidate ──► AwaitingRecruiter ──► Concluded
//!                    ▲                     │
//!                    └─────────────────────┘
//! ```
//!
//! Each call to [`Conversation::step`] produces at most one turn. A
//! generation failure aborts the conversation; malformed analysis output
//! does not (the thinking controller recovers it).

use std::sync::Arc;

use chrono::Utc;
use rendezvous_llm::{GenerationPurpose, GenerationRequest, LlmBackend, OutputShape};
use rendezvous_types::{
    AgentProfile, AgentType, ConversationId, ConversationTurn, Decision, ThinkingLevel,
    ThoughtSignature,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cost::CostTracker;
use crate::error::DialogueError;
use crate::evaluation::parse_evaluation;
use crate::persona::{CandidateSide, RecruiterSide};
use crate::prompt::{PromptEngine, Template, transcript_lines};
use crate::strategy::strategy_hint;
use crate::stream::TurnStream;
use crate::thinking::{AnalysisBrief, ThinkingController};

/// Default bound on candidate turns.
pub const DEFAULT_MAX_TURNS: u32 = 12;

/// Closing line used when the final evaluation response has none.
const DEFAULT_CLOSING_REMARK: &str =
    "Thanks so much for your time today. I'll be in touch about next steps.";

/// Tunables for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Upper bound on candidate turns. The conversation concludes once
    /// `max_turns - 1` candidate turns have been taken.
    pub max_turns: u32,
    /// Give the candidate a keyword-derived hint about each question.
    pub strategy_hints: bool,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            strategy_hints: true,
        }
    }
}

/// Where the dialogue currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    /// Nothing said yet.
    Opening,
    /// The candidate speaks next.
    AwaitingCandidate,
    /// The recruiter analyses and speaks next.
    AwaitingRecruiter,
    /// Terminal. No further turns.
    Concluded,
}

/// Result of a concluded conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationOutcome {
    /// Full evaluation text.
    pub final_evaluation: String,
    /// Rating parsed from the evaluation.
    pub match_score: Option<u8>,
    /// Decision parsed from the evaluation.
    pub decision: Option<Decision>,
    /// Thinking cost charged over the conversation.
    pub total_cost: Decimal,
    /// Candidate turns taken.
    pub candidate_turns: u32,
    /// Recruiter confidence at the end.
    pub final_confidence: u8,
}

/// Shape requested from the final evaluation call.
#[derive(Debug, Default, Deserialize)]
struct FinalEvaluationResponse {
    #[serde(default)]
    closing_remark: String,
    #[serde(default)]
    evaluation: String,
}

/// One dialogue between a recruiter and a candidate.
pub struct Conversation {
    id: ConversationId,
    recruiter: RecruiterSide,
    candidate: CandidateSide,
    settings: ConversationSettings,
    backend: Arc<LlmBackend>,
    prompts: Arc<PromptEngine>,
    controller: ThinkingController,
    phase: ConversationPhase,
    turns: Vec<ConversationTurn>,
    candidate_turns: u32,
    signature: Option<ThoughtSignature>,
    outcome: Option<ConversationOutcome>,
}

impl Conversation {
    /// Prepare a conversation between two profiles.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::InvalidParticipants`] unless `recruiter`
    /// is a recruiter with criteria and `candidate` is a candidate.
    pub fn new(
        id: ConversationId,
        recruiter: &AgentProfile,
        candidate: &AgentProfile,
        backend: Arc<LlmBackend>,
        prompts: Arc<PromptEngine>,
        settings: ConversationSettings,
    ) -> Result<Self, DialogueError> {
        let recruiter = RecruiterSide::from_profile(recruiter)?;
        let candidate = CandidateSide::from_profile(candidate)?;
        let controller = ThinkingController::new(&recruiter.profile.candidate_selection_criteria);
        Ok(Self {
            id,
            recruiter,
            candidate,
            settings,
            backend,
            prompts,
            controller,
            phase: ConversationPhase::Opening,
            turns: Vec::new(),
            candidate_turns: 0,
            signature: None,
            outcome: None,
        })
    }

    /// Report thinking passes to a shared tracker.
    #[must_use]
    pub fn with_cost_tracker(mut self, tracker: Arc<CostTracker>) -> Self {
        self.controller = self.controller.with_tracker(tracker);
        self
    }

    /// Conversation id.
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    /// Current phase.
    pub const fn phase(&self) -> ConversationPhase {
        self.phase
    }

    /// Turns emitted so far.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Candidate turns taken so far.
    pub const fn candidate_turns(&self) -> u32 {
        self.candidate_turns
    }

    /// Most recent thought signature.
    pub const fn signature(&self) -> Option<&ThoughtSignature> {
        self.signature.as_ref()
    }

    /// Outcome, once concluded.
    pub const fn outcome(&self) -> Option<&ConversationOutcome> {
        self.outcome.as_ref()
    }

    /// The recruiting side.
    pub const fn recruiter(&self) -> &RecruiterSide {
        &self.recruiter
    }

    /// The candidate side.
    pub const fn candidate(&self) -> &CandidateSide {
        &self.candidate
    }

    /// Run the conversation on a background task and stream its turns.
    pub fn into_stream(self) -> TurnStream {
        TurnStream::spawn(self)
    }

    /// Advance by one turn.
    ///
    /// Returns `Ok(None)` once the conversation has concluded.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::Generation`] if the backend fails. The
    /// conversation should then be abandoned.
    pub async fn step(&mut self) -> Result<Option<ConversationTurn>, DialogueError> {
        let turn = match self.phase {
            ConversationPhase::Opening => self.open().await?,
            ConversationPhase::AwaitingCandidate => self.candidate_reply().await?,
            ConversationPhase::AwaitingRecruiter => self.recruiter_reply().await?,
            ConversationPhase::Concluded => return Ok(None),
        };
        debug!(
            conversation_id = %self.id,
            role = %turn.role,
            index = self.turns.len(),
            "Turn emitted"
        );
        self.turns.push(turn.clone());
        Ok(Some(turn))
    }

    async fn open(&mut self) -> Result<ConversationTurn, DialogueError> {
        let signature = self.controller.initial_signature();
        let ctx = serde_json::json!({
            "recruiter": self.recruiter.prompt_context(),
            "candidate_name": self.candidate.name(),
        });
        let text = self
            .generate(
                GenerationPurpose::RecruiterOpening,
                Template::RecruiterSystem,
                Template::RecruiterOpening,
                &ctx,
                OutputShape::Text,
            )
            .await?;
        let turn = self.recruiter_turn(text, &signature);
        self.signature = Some(signature);
        self.phase = ConversationPhase::AwaitingCandidate;
        Ok(turn)
    }

    async fn candidate_reply(&mut self) -> Result<ConversationTurn, DialogueError> {
        let hint = if self.settings.strategy_hints {
            self.turns
                .iter()
                .rev()
                .find(|turn| turn.role == AgentType::Recruiter)
                .and_then(|turn| strategy_hint(&turn.content))
        } else {
            None
        };
        let ctx = serde_json::json!({
            "candidate": self.candidate.prompt_context(),
            "recruiter_name": self.recruiter.name(),
            "transcript": transcript_lines(&self.turns),
            "hint": hint,
        });
        let text = self
            .generate(
                GenerationPurpose::CandidateReply,
                Template::CandidateSystem,
                Template::CandidateReply,
                &ctx,
                OutputShape::Text,
            )
            .await?;
        self.candidate_turns = self.candidate_turns.saturating_add(1);
        self.phase = ConversationPhase::AwaitingRecruiter;
        Ok(ConversationTurn {
            role: AgentType::Candidate,
            speaker_name: self.candidate.name().to_owned(),
            content: text,
            timestamp: Utc::now(),
            is_final: false,
            final_evaluation: None,
            thinking_level: None,
            match_confidence: None,
        })
    }

    async fn recruiter_reply(&mut self) -> Result<ConversationTurn, DialogueError> {
        let brief = AnalysisBrief {
            recruiter: &self.recruiter,
            candidate_name: &self.candidate.participant.name,
            transcript: &self.turns,
            turn_number: self.candidate_turns,
        };
        let mut signature = self
            .controller
            .think(&self.backend, &self.prompts, &brief)
            .await?;

        let limit_reached = self.candidate_turns >= self.settings.max_turns.saturating_sub(1);
        let concluding = signature.should_conclude || signature.critical_mismatch || limit_reached;

        if signature.critical_mismatch && signature.thinking_level != ThinkingLevel::MetaCognitive {
            signature = self
                .controller
                .reflect(&self.backend, &self.prompts, &brief)
                .await?;
        }

        if concluding {
            debug!(
                conversation_id = %self.id,
                should_conclude = signature.should_conclude,
                critical_mismatch = signature.critical_mismatch,
                limit_reached,
                "Concluding conversation"
            );
            let turn = self.conclude(&signature).await?;
            self.signature = Some(signature);
            return Ok(turn);
        }

        let verified: Vec<&str> = signature.verified().collect();
        let unverified: Vec<&str> = signature.unverified().collect();
        let ctx = serde_json::json!({
            "recruiter": self.recruiter.prompt_context(),
            "candidate_name": self.candidate.name(),
            "transcript": transcript_lines(&self.turns),
            "confidence": signature.match_confidence,
            "verified": verified,
            "unverified": unverified,
            "what_learned": signature.what_learned,
            "next_action": signature.next_action,
        });
        let text = self
            .generate(
                GenerationPurpose::RecruiterFollowUp,
                Template::RecruiterSystem,
                Template::RecruiterFollowUp,
                &ctx,
                OutputShape::Text,
            )
            .await?;
        let turn = self.recruiter_turn(text, &signature);
        self.signature = Some(signature);
        self.phase = ConversationPhase::AwaitingCandidate;
        Ok(turn)
    }

    async fn conclude(
        &mut self,
        signature: &ThoughtSignature,
    ) -> Result<ConversationTurn, DialogueError> {
        let criteria: Vec<serde_json::Value> = signature
            .goal_progress
            .iter()
            .map(|(criterion, verified)| {
                serde_json::json!({"criterion": criterion, "verified": verified})
            })
            .collect();
        let ctx = serde_json::json!({
            "recruiter": self.recruiter.prompt_context(),
            "candidate_name": self.candidate.name(),
            "transcript": transcript_lines(&self.turns),
            "criteria": criteria,
            "confidence": signature.match_confidence,
            "self_correction": signature.self_correction,
            "critical_mismatch": signature.critical_mismatch,
        });
        let raw = self
            .generate(
                GenerationPurpose::FinalEvaluation,
                Template::RecruiterSystem,
                Template::FinalEvaluation,
                &ctx,
                OutputShape::Json,
            )
            .await?;

        let (closing_remark, evaluation) =
            match rendezvous_llm::extract_json::<FinalEvaluationResponse>(&raw) {
                Ok(response) if !response.evaluation.trim().is_empty() => {
                    let closing = if response.closing_remark.trim().is_empty() {
                        DEFAULT_CLOSING_REMARK.to_owned()
                    } else {
                        response.closing_remark
                    };
                    (closing, response.evaluation)
                }
                Ok(_) | Err(_) => {
                    warn!(
                        conversation_id = %self.id,
                        "Final evaluation was not structured, keeping raw text"
                    );
                    (DEFAULT_CLOSING_REMARK.to_owned(), raw)
                }
            };

        let parsed = parse_evaluation(&evaluation);
        info!(
            conversation_id = %self.id,
            recruiter = self.recruiter.name(),
            candidate = self.candidate.name(),
            score = ?parsed.score,
            decision = ?parsed.decision,
            candidate_turns = self.candidate_turns,
            cost = %self.controller.total_cost(),
            "Conversation concluded"
        );

        self.outcome = Some(ConversationOutcome {
            final_evaluation: evaluation.clone(),
            match_score: parsed.score,
            decision: parsed.decision,
            total_cost: self.controller.total_cost(),
            candidate_turns: self.candidate_turns,
            final_confidence: signature.match_confidence,
        });
        self.phase = ConversationPhase::Concluded;

        Ok(ConversationTurn {
            role: AgentType::Recruiter,
            speaker_name: self.recruiter.name().to_owned(),
            content: closing_remark,
            timestamp: Utc::now(),
            is_final: true,
            final_evaluation: Some(evaluation),
            thinking_level: Some(signature.thinking_level),
            match_confidence: Some(signature.match_confidence),
        })
    }

    fn recruiter_turn(&self, content: String, signature: &ThoughtSignature) -> ConversationTurn {
        ConversationTurn {
            role: AgentType::Recruiter,
            speaker_name: self.recruiter.name().to_owned(),
            content,
            timestamp: Utc::now(),
            is_final: false,
            final_evaluation: None,
            thinking_level: Some(signature.thinking_level),
            match_confidence: Some(signature.match_confidence),
        }
    }

    async fn generate(
        &self,
        purpose: GenerationPurpose,
        system: Template,
        user: Template,
        ctx: &serde_json::Value,
        shape: OutputShape,
    ) -> Result<String, DialogueError> {
        let request = GenerationRequest::new(
            purpose,
            self.prompts.render(system, ctx)?,
            self.prompts.render(user, ctx)?,
            shape,
        );
        let text = self.backend.generate(&request).await?;
        Ok(text.trim().to_owned())
    }
}
