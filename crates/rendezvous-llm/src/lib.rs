//! Text-generation client for the Rendezvous simulation.
//!
//! The dialogue layer treats generation as a black box: an ordered list of
//! role-tagged messages goes in, text comes out. This crate provides that
//! box for OpenAI-compatible and Anthropic endpoints, plus an in-process
//! stub for offline runs and tests.
//!
//! # Modules
//!
//! - [`backend`] -- Enum-dispatched backends and the [`create_backend`] factory
//! - [`config`] -- Backend configuration
//! - [`error`] -- [`LlmError`]
//! - [`json`] -- Tolerant JSON extraction from model output
//! - [`message`] -- Request and message types

pub mod backend;
pub mod config;
pub mod error;
pub mod json;
pub mod message;

pub use backend::{LlmBackend, StubBackend, create_backend};
pub use config::{BackendType, LlmBackendConfig};
pub use error::LlmError;
pub use json::extract_json;
pub use message::{ChatMessage, ChatRole, GenerationPurpose, GenerationRequest, OutputShape};
