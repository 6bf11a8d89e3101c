//! Observer API server for the Rendezvous simulation.
//!
//! A thin Axum transport over the [`WorldEngine`] control surface:
//!
//! - **REST endpoints** to start and stop the world, spawn and remove
//!   agents, manage profiles, start conversations and query records
//! - **`WebSocket` endpoints** streaming every world event
//!   (`/ws/world`) or a single conversation (`/ws/conversations/{id}`)
//!
//! Handlers never hold engine locks across an await; all state lives in
//! the engine and the document store behind it.
//!
//! [`WorldEngine`]: rendezvous_core::WorldEngine

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
