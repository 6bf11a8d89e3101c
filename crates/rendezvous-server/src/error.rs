//! Error types for the server binary.
//!
//! [`ServerError`] wraps every failure mode during startup so `main` can
//! propagate with `?`.

/// Top-level startup error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: rendezvous_core::ConfigError,
    },

    /// The document store could not be opened.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying store error.
        #[from]
        source: rendezvous_db::DbError,
    },

    /// The generation backend could not be built.
    #[error("LLM backend error: {source}")]
    Llm {
        /// The underlying backend error.
        #[from]
        source: rendezvous_llm::LlmError,
    },

    /// Prompt templates could not be loaded.
    #[error("prompt template error: {source}")]
    Prompts {
        /// The underlying template error.
        #[from]
        source: rendezvous_dialogue::DialogueError,
    },

    /// Seed profiles could not be loaded or inserted.
    #[error("seed error: {message}")]
    Seed {
        /// Description of the seed failure.
        message: String,
    },

    /// Observer API server failed.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: rendezvous_observer::ServerError,
    },
}
