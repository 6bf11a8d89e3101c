//! REST API endpoint handlers for the Observer server.
//!
//! Every handler delegates to the shared [`WorldEngine`] and converts
//! engine failures through [`ObserverError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `POST` | `/api/world/start` | Start the tick loop |
//! | `POST` | `/api/world/stop` | Stop the tick loop |
//! | `GET` | `/api/world/state` | Current world snapshot |
//! | `POST` | `/api/world/spawn` | Place an agent in the world |
//! | `POST` | `/api/world/remove` | Take an agent out of the world |
//! | `GET` | `/api/agents` | List profiles |
//! | `POST` | `/api/agents` | Create a profile |
//! | `DELETE` | `/api/agents` | Delete every profile |
//! | `GET` | `/api/agents/{id}` | Single profile |
//! | `PUT` | `/api/agents/{id}` | Replace a profile |
//! | `DELETE` | `/api/agents/{id}` | Delete a profile |
//! | `POST` | `/api/conversations` | Start a conversation |
//! | `GET` | `/api/conversations` | List conversations |
//! | `GET` | `/api/conversations/{id}` | Single conversation |
//! | `GET` | `/api/matches` | List matches |
//! | `GET` | `/api/stats` | Thinking cost and engine counters |
//!
//! [`WorldEngine`]: rendezvous_core::WorldEngine

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rendezvous_core::{EngineStats, ProfileDraft};
use rendezvous_types::{
    AgentId, AgentProfile, AgentState, AgentType, ConversationId, ConversationRecord,
    MatchRecord, WorldState,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Body of `POST /api/world/spawn`.
#[derive(Debug, Deserialize)]
pub struct SpawnRequest {
    /// Profile id of the agent to spawn.
    pub agent_id: String,
    /// Optional x coordinate; requires `y`.
    pub x: Option<f64>,
    /// Optional y coordinate; requires `x`.
    pub y: Option<f64>,
}

/// Body of `POST /api/world/remove`.
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    /// Agent to remove.
    pub agent_id: String,
}

/// Body of `POST /api/conversations`.
#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    /// The recruiter profile id.
    pub recruiter_id: String,
    /// The candidate profile id.
    pub candidate_id: String,
}

/// Query parameters for `GET /api/agents`.
#[derive(Debug, Deserialize)]
pub struct AgentsQuery {
    /// `recruiter` or `candidate`.
    pub agent_type: Option<String>,
}

/// Query parameters for `GET /api/conversations`.
#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    /// Only conversations involving this agent.
    pub agent_id: Option<String>,
}

/// Query parameters for `GET /api/matches`.
#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    /// Only matches scored at or above this value (1-10).
    pub min_score: Option<i64>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Start the tick loop. Starting a running world is a no-op.
pub async fn start_world(State(state): State<Arc<AppState>>) -> Json<Value> {
    let started = state.engine.start();
    Json(json!({ "running": true, "changed": started }))
}

/// Stop the tick loop. Conversations in flight keep running.
pub async fn stop_world(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stopped = state.engine.stop();
    Json(json!({ "running": false, "changed": stopped }))
}

/// Current world snapshot.
pub async fn world_state(State(state): State<Arc<AppState>>) -> Json<WorldState> {
    Json(state.engine.snapshot())
}

/// Place an agent in the world.
pub async fn spawn_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpawnRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AgentState>), ObserverError> {
    let Json(request) = payload.map_err(rejected)?;
    let agent_id = parse_id::<AgentId>(&request.agent_id)?;
    let position = match (request.x, request.y) {
        (Some(x), Some(y)) => Some((x, y)),
        (None, None) => None,
        _ => {
            return Err(ObserverError::InvalidArgument(
                "x and y must be given together".to_owned(),
            ));
        }
    };
    let agent = state.engine.spawn(agent_id, position).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Take an agent out of the world.
pub async fn remove_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RemoveRequest>, JsonRejection>,
) -> Result<Json<Value>, ObserverError> {
    let Json(request) = payload.map_err(rejected)?;
    let agent_id = parse_id::<AgentId>(&request.agent_id)?;
    if !state.engine.remove(agent_id) {
        return Err(ObserverError::NotFound(format!(
            "agent {agent_id} is not in the world"
        )));
    }
    Ok(Json(json!({ "removed": agent_id })))
}

// ---------------------------------------------------------------------------
// Agent profiles
// ---------------------------------------------------------------------------

/// List profiles, newest first.
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentsQuery>,
) -> Result<Json<Vec<AgentProfile>>, ObserverError> {
    let agent_type = match query.agent_type.as_deref() {
        None => None,
        Some("recruiter") => Some(AgentType::Recruiter),
        Some("candidate") => Some(AgentType::Candidate),
        Some(other) => {
            return Err(ObserverError::InvalidArgument(format!(
                "unknown agent_type '{other}': expected recruiter or candidate"
            )));
        }
    };
    Ok(Json(state.engine.list_profiles(agent_type).await?))
}

/// Create a profile.
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProfileDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<AgentProfile>), ObserverError> {
    let Json(draft) = payload.map_err(rejected)?;
    let profile = state.engine.create_profile(draft).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fetch one profile.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentProfile>, ObserverError> {
    let id = parse_id::<AgentId>(&id)?;
    Ok(Json(state.engine.profile(id).await?))
}

/// Replace a profile's fields.
pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ProfileDraft>, JsonRejection>,
) -> Result<Json<AgentProfile>, ObserverError> {
    let id = parse_id::<AgentId>(&id)?;
    let Json(draft) = payload.map_err(rejected)?;
    Ok(Json(state.engine.update_profile(id, draft).await?))
}

/// Delete one profile and take the agent out of the world.
pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ObserverError> {
    let id = parse_id::<AgentId>(&id)?;
    state.engine.delete_profile(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every profile.
pub async fn delete_all_agents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ObserverError> {
    let deleted = state.engine.delete_all_profiles().await?;
    Ok(Json(json!({ "deleted": deleted })))
}

// ---------------------------------------------------------------------------
// Conversations and matches
// ---------------------------------------------------------------------------

/// Start a conversation between two profiles, independent of proximity.
pub async fn start_conversation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartConversationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConversationRecord>), ObserverError> {
    let Json(request) = payload.map_err(rejected)?;
    let recruiter = parse_id::<AgentId>(&request.recruiter_id)?;
    let candidate = parse_id::<AgentId>(&request.candidate_id)?;
    let record = state.engine.start_conversation(recruiter, candidate).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List conversations, newest first.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<Vec<ConversationRecord>>, ObserverError> {
    let agent_id = query
        .agent_id
        .as_deref()
        .map(parse_id::<AgentId>)
        .transpose()?;
    Ok(Json(state.engine.list_conversations(agent_id).await?))
}

/// Fetch one conversation with its transcript.
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationRecord>, ObserverError> {
    let id = parse_id::<ConversationId>(&id)?;
    Ok(Json(state.engine.conversation(id).await?))
}

/// List matches, newest first.
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<Vec<MatchRecord>>, ObserverError> {
    let min_score = query
        .min_score
        .map(|score| {
            u8::try_from(score).map_err(|e| {
                ObserverError::InvalidArgument(format!(
                    "min_score must be between 1 and 10, got {score}: {e}"
                ))
            })
        })
        .transpose()?;
    Ok(Json(state.engine.list_matches(min_score).await?))
}

/// Thinking-level call counts, total cost and engine counters.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<EngineStats> {
    Json(state.engine.stats())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an id from a path segment or body field.
pub(crate) fn parse_id<T>(s: &str) -> Result<T, ObserverError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ObserverError::InvalidArgument(format!("invalid id '{s}': {e}")))
}

#[allow(clippy::needless_pass_by_value)]
fn rejected(rejection: JsonRejection) -> ObserverError {
    ObserverError::InvalidArgument(rejection.body_text())
}
