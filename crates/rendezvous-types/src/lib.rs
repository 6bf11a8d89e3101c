//! Shared type definitions for the Rendezvous simulation.
//!
//! This crate is the single source of truth for the data model shared by
//! the engine, the dialogue crate, the store and the observer API. Types
//! flow downstream to `TypeScript` via `ts-rs` for dashboard clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, conversations, matches
//! - [`enums`] -- Roles, statuses, thinking levels, decisions
//! - [`structs`] -- World state, thought signatures, conversation records
//! - [`profile`] -- Recruiter and candidate profile documents
//! - [`events`] -- Events pushed to world observers

pub mod enums;
pub mod events;
pub mod ids;
pub mod profile;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentStatus, AgentType, ConversationStatus, Decision, ThinkingLevel};
pub use events::{TurnEvent, WorldEvent};
pub use ids::{AgentId, ConversationId, MatchId};
pub use profile::{AgentProfile, CandidateProfile, ProfileDetails, RecruiterProfile, WorkExperience};
pub use structs::{
    ActiveConversation, AgentState, ConversationRecord, ConversationTurn, MatchRecord,
    Participant, ThoughtSignature, WorldState,
};
