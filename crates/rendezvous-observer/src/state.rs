//! Shared application state for the Observer server.

use std::time::Duration;

use rendezvous_core::WorldEngine;

/// Keepalive used by [`AppState::new`].
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(1);

/// State shared by every handler, wrapped in an `Arc` by the router.
#[derive(Clone)]
pub struct AppState {
    /// The world engine and, through it, the document store.
    pub engine: WorldEngine,
    /// Silence after which a `WebSocket` client receives a ping.
    pub keepalive: Duration,
}

impl AppState {
    /// State around `engine` with the default keepalive.
    pub const fn new(engine: WorldEngine) -> Self {
        Self {
            engine,
            keepalive: DEFAULT_KEEPALIVE,
        }
    }

    /// Override the `WebSocket` keepalive window.
    #[must_use]
    pub const fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }
}
