//! Error taxonomy for engine operations.

use rendezvous_db::DbError;
use rendezvous_dialogue::DialogueError;

/// Errors reported by the world engine and its services.
///
/// `NotFound` and `InvalidArgument` go back to the caller of the triggering
/// operation. `GenerationFailure` aborts only the conversation it came from.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown agent, profile or conversation.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input or a role mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The generation capability failed.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// Duplicate username or id.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The persistence collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { collection, id } => Self::NotFound(format!("{collection} {id}")),
            DbError::AlreadyExists(msg) => Self::AlreadyExists(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<DialogueError> for EngineError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::InvalidParticipants(msg) => Self::InvalidArgument(msg),
            DialogueError::Generation(e) => Self::GenerationFailure(e.to_string()),
            DialogueError::Template(msg) => Self::GenerationFailure(msg),
        }
    }
}
