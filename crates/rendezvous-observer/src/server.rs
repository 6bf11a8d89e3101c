//! Serving the observer API.
//!
//! [`start_server`] binds the listener, mounts the router over the shared
//! engine and serves until the shutdown future resolves. In-flight
//! requests and sockets are drained before it returns.

use std::future::Future;
use std::sync::Arc;

use rendezvous_core::config::ObserverConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Listen address for the observer API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address, e.g. `0.0.0.0` or `localhost`.
    pub host: String,
    /// TCP port. `0` picks a free port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ObserverConfig::default())
    }
}

impl From<&ObserverConfig> for ServerConfig {
    fn from(config: &ObserverConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Serve the observer API until `shutdown` resolves.
///
/// # Errors
///
/// [`ServerError::Bind`] if the address cannot be resolved or bound and
/// [`ServerError::Serve`] if serving fails.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServerError::Bind(format!("{}:{}: {e}", config.host, config.port)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(e.to_string()))?;

    info!(%addr, "Observer API listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;
    info!("Observer API stopped");
    Ok(())
}

/// Failure to start or run the observer API.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {0}")]
    Bind(String),

    /// Serving stopped with an I/O error.
    #[error("observer server failed: {0}")]
    Serve(String),
}
