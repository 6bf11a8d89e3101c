//! World simulation engine for the Rendezvous simulation.
//!
//! Recruiters and candidates wander a 2D world. When two agents of
//! different types come within range for the first time they are paired
//! and a conversation is driven to a final evaluation on its own task.
//! Everything that happens is published to an [`EventHub`].
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration ([`SimulationConfig`])
//! - [`conversations`] -- Conversation preparation, driving and persistence
//! - [`engine`] -- [`WorldEngine`]: agents, tick loop, supervision
//! - [`error`] -- [`EngineError`]
//! - [`hub`] -- Per-subscriber bounded event delivery with keepalive
//! - [`motion`] -- Idle/walk motion model
//! - [`profiles`] -- Profile management on the engine
//! - [`proximity`] -- One-time proximity pairing
//! - [`records`] -- Conversation and match queries, statistics

pub mod config;
pub mod conversations;
pub mod engine;
pub mod error;
pub mod hub;
pub mod motion;
pub mod profiles;
pub mod proximity;
pub mod records;

pub use config::{ConfigError, SimulationConfig, StorageBackend, WorldConfig};
pub use conversations::ConversationService;
pub use engine::WorldEngine;
pub use error::EngineError;
pub use hub::{EventHub, Subscription};
pub use motion::Motion;
pub use profiles::ProfileDraft;
pub use proximity::{PairKey, ProximityMatch, ProximityMatcher};
pub use records::EngineStats;
