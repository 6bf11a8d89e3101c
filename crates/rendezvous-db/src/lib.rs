//! Data layer for the Rendezvous simulation.
//!
//! Three document collections (agent profiles, conversation records and
//! match records) behind one [`DocumentStore`]. The in-memory backend
//! serves offline runs and tests; the `PostgreSQL` backend keeps each
//! document as JSONB next to the columns it is filtered and sorted by.
//!
//! # Modules
//!
//! - [`store`] -- [`DocumentStore`] dispatch and the [`Completion`] update
//! - [`memory`] -- In-process backend
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`agent_store`] -- Agent profile queries
//! - [`conversation_store`] -- Conversation and match queries
//! - [`error`] -- Shared error types

pub mod agent_store;
pub mod conversation_store;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use agent_store::AgentStore;
pub use conversation_store::ConversationStore;
pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{DEFAULT_MAX_CONNECTIONS, PostgresConfig, PostgresPool};
pub use store::{Completion, DocumentStore};
