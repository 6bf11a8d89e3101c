//! Dialogue layer for the Rendezvous simulation.
//!
//! A [`Conversation`] pairs one recruiter with one candidate and alternates
//! their turns until the recruiter has seen enough. Before every recruiter
//! turn a [`ThinkingController`] picks an analysis depth, asks the model
//! for a structured assessment and folds it into a [`ThoughtSignature`]
//! that steers the next question and decides when to stop.
//!
//! # Modules
//!
//! - [`conversation`] -- The turn-by-turn state machine
//! - [`cost`] -- Thinking-level tariffs and the process-wide [`CostTracker`]
//! - [`error`] -- [`DialogueError`]
//! - [`evaluation`] -- Rating and decision extraction from evaluation text
//! - [`persona`] -- Role-checked recruiter and candidate sides
//! - [`prompt`] -- Prompt templates
//! - [`strategy`] -- Question classification and candidate hints
//! - [`stream`] -- Streaming adapter over a running conversation
//! - [`thinking`] -- Adaptive thinking level selection and confidence
//!
//! [`ThoughtSignature`]: rendezvous_types::ThoughtSignature

pub mod conversation;
pub mod cost;
pub mod error;
pub mod evaluation;
pub mod persona;
pub mod prompt;
pub mod strategy;
pub mod stream;
pub mod thinking;

pub use conversation::{
    Conversation, ConversationOutcome, ConversationPhase, ConversationSettings, DEFAULT_MAX_TURNS,
};
pub use cost::{CostSummary, CostTracker, level_cost};
pub use error::DialogueError;
pub use evaluation::{ParsedEvaluation, parse_evaluation};
pub use persona::{CandidateSide, RecruiterSide};
pub use prompt::{PromptEngine, Template};
pub use strategy::{QuestionKind, classify_question, strategy_hint};
pub use stream::{DialogueEvent, TurnStream};
pub use thinking::{AnalysisBrief, INITIAL_CONFIDENCE, ThinkingContext, ThinkingController, select_level};
