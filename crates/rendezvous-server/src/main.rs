//! Rendezvous simulation server.
//!
//! Wires the world engine, the conversation service and the observer API
//! together and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `RENDEZVOUS_CONFIG` or
//!    `rendezvous-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the document store (memory or `PostgreSQL`)
//! 4. Build the generation backend and prompt templates
//! 5. Create the event hub, conversation service and world engine
//! 6. Apply seed profiles (relative paths resolve against the config
//!    file's directory)
//! 7. Start the tick loop if `world.autostart` is set
//! 8. Serve the observer API until shutdown

mod error;
mod seed;

use std::path::Path;
use std::sync::Arc;

use rendezvous_core::config::{LogFormat, LoggingConfig, StorageBackend};
use rendezvous_core::{ConversationService, EventHub, SimulationConfig, WorldEngine};
use rendezvous_db::{DocumentStore, PostgresConfig};
use rendezvous_dialogue::PromptEngine;
use rendezvous_llm::create_backend;
use rendezvous_observer::{AppState, ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails or the observer server
/// stops with an error.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let (config, config_path) = SimulationConfig::load().map_err(ServerError::from)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("rendezvous-server starting");
    info!(
        config_path = ?config_path,
        world_width = config.world.world_width,
        world_height = config.world.world_height,
        proximity_threshold = config.world.proximity_threshold,
        tick_interval_ms = config.world.tick_interval_ms,
        max_turns = config.conversation.max_turns,
        "Configuration loaded"
    );

    // 3. Open the document store.
    let store = Arc::new(open_store(&config).await?);
    info!(backend = store.backend_name(), "Document store ready");

    // 4. Generation backend and prompts.
    let backend = create_backend(&config.llm.backend_config().map_err(ServerError::from)?)
        .map_err(ServerError::from)?;
    info!(backend = backend.name(), model = %config.llm.model, "LLM backend configured");

    let prompts = match &config.llm.templates_dir {
        Some(dir) => PromptEngine::from_dir(dir),
        None => PromptEngine::builtin(),
    }
    .map_err(ServerError::from)?;

    // 5. Engine.
    let hub = EventHub::new(config.observer.subscriber_queue_capacity);
    let service = ConversationService::new(
        Arc::clone(&store),
        Arc::new(backend),
        Arc::new(prompts),
        config.conversation.settings(),
        hub,
    );
    let engine = WorldEngine::new(config.world.clone(), service);

    // 6. Seed profiles.
    if let Some(path) = &config.seed.profiles_file {
        let path = match config_path.as_deref().and_then(Path::parent) {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.clone(),
        };
        let drafts = seed::load_drafts(&path)?;
        seed::apply(&engine, drafts, config.seed.spawn_seeded).await?;
    }

    // 7. Autostart.
    if config.world.autostart {
        engine.start();
    }

    // 8. Observer API.
    let server_config = ServerConfig::from(&config.observer);
    let state = Arc::new(AppState::new(engine.clone()).with_keepalive(config.observer.keepalive()));
    start_server(&server_config, state, shutdown_signal())
        .await
        .map_err(ServerError::from)?;

    // Shutdown.
    engine.stop();
    info!("{}", engine.service().costs().summary());
    store.close().await;
    info!("rendezvous-server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn open_store(config: &SimulationConfig) -> Result<DocumentStore, ServerError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(DocumentStore::memory()),
        StorageBackend::Postgres => {
            let pg = PostgresConfig::new(&config.storage.postgres_url)
                .with_max_connections(config.storage.max_connections);
            Ok(DocumentStore::postgres(&pg).await?)
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
