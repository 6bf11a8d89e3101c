//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The engine behind the router uses the in-memory
//! store and the canned stub backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rendezvous_core::{ConversationService, EventHub, WorldConfig, WorldEngine};
use rendezvous_db::DocumentStore;
use rendezvous_dialogue::{ConversationSettings, PromptEngine};
use rendezvous_llm::{LlmBackend, StubBackend};
use rendezvous_observer::router::build_router;
use rendezvous_observer::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_engine() -> WorldEngine {
    let service = ConversationService::new(
        Arc::new(DocumentStore::memory()),
        Arc::new(LlmBackend::Stub(StubBackend::canned())),
        Arc::new(PromptEngine::builtin().unwrap()),
        ConversationSettings {
            max_turns: 3,
            strategy_hints: true,
        },
        EventHub::new(256),
    );
    WorldEngine::new(
        WorldConfig {
            seed: Some(11),
            ..WorldConfig::default()
        },
        service,
    )
}

fn make_router() -> (Router, WorldEngine) {
    let engine = make_engine();
    let state = Arc::new(AppState::new(engine.clone()));
    (build_router(state), engine)
}

fn recruiter_body(username: &str) -> Value {
    json!({
        "username": username,
        "name": "Sarah Chen",
        "agent_type": "recruiter",
        "details": {
            "recruiter": {
                "role_description": "Senior backend engineer",
                "candidate_selection_criteria": ["Production Rust", "Has led a team"]
            }
        }
    })
}

fn candidate_body(username: &str) -> Value {
    json!({
        "username": username,
        "name": "Alex Johnson",
        "agent_type": "candidate",
        "details": {
            "candidate": {
                "professional_summary": "Backend engineer",
                "work_experience": [{ "company": "Acme", "title": "Engineer" }],
                "technical_skills": ["Rust", "PostgreSQL"]
            }
        }
    })
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(router: &Router, body: Value) -> String {
    let (status, json) = send(router, "POST", "/api/agents", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_health() {
    let (router, _) = make_router();
    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_world_state_and_toggle() {
    let (router, engine) = make_router();

    let (status, json) = send(&router, "GET", "/api/world/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["width"], 800.0);
    assert_eq!(json["height"], 600.0);
    assert_eq!(json["running"], false);
    assert!(json["agents"].as_array().unwrap().is_empty());

    let (status, json) = send(&router, "POST", "/api/world/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert!(engine.is_running());

    let (_, json) = send(&router, "POST", "/api/world/start", None).await;
    assert_eq!(json["changed"], false);

    let (status, _) = send(&router, "POST", "/api/world/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_agent_crud() {
    let (router, _) = make_router();
    let id = create(&router, recruiter_body("sarah")).await;

    let (status, json) = send(&router, "GET", &format!("/api/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "sarah");
    assert_eq!(json["agent_type"], "recruiter");

    let (status, json) = send(&router, "POST", "/api/agents", Some(recruiter_body("sarah"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);

    let mut renamed = recruiter_body("sarah.chen");
    renamed["name"] = json!("Sarah C.");
    let (status, json) = send(&router, "PUT", &format!("/api/agents/{id}"), Some(renamed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Sarah C.");

    let (status, _) = send(
        &router,
        "PUT",
        &format!("/api/agents/{id}"),
        Some(candidate_body("sarah.chen")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "DELETE", &format!("/api/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(&router, "GET", &format!("/api/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_agent_validation_errors() {
    let (router, _) = make_router();

    let (status, json) = send(&router, "GET", "/api/agents/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("not-a-uuid"));

    let mut mismatched = candidate_body("alex");
    mismatched["agent_type"] = json!("recruiter");
    let (status, _) = send(&router, "POST", "/api/agents", Some(mismatched)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "POST", "/api/agents", Some(json!({"username": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "GET", "/api/agents?agent_type=manager", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_delete_all_agents() {
    let (router, _) = make_router();
    create(&router, recruiter_body("sarah")).await;
    create(&router, candidate_body("alex")).await;

    let (_, json) = send(&router, "GET", "/api/agents", None).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = send(&router, "GET", "/api/agents?agent_type=candidate", None).await;
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["username"], "alex");

    let (status, json) = send(&router, "DELETE", "/api/agents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 2);
}

#[tokio::test]
async fn test_spawn_and_remove() {
    let (router, engine) = make_router();
    let id = create(&router, recruiter_body("sarah")).await;

    let (status, json) = send(
        &router,
        "POST",
        "/api/world/spawn",
        Some(json!({"agent_id": id, "x": 100.0, "y": 120.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "idle");
    assert_eq!(json["x"], 100.0);
    assert_eq!(engine.snapshot().agents.len(), 1);

    let (status, _) = send(
        &router,
        "POST",
        "/api/world/spawn",
        Some(json!({"agent_id": id, "x": 100.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = rendezvous_types::AgentId::new().to_string();
    let (status, _) = send(
        &router,
        "POST",
        "/api/world/spawn",
        Some(json!({ "agent_id": unknown })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "POST", "/api/world/remove", Some(json!({ "agent_id": id }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, "POST", "/api/world/remove", Some(json!({ "agent_id": id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_and_fetch_conversation() {
    let (router, _) = make_router();
    let recruiter = create(&router, recruiter_body("sarah")).await;
    let candidate = create(&router, candidate_body("alex")).await;

    let (status, _) = send(
        &router,
        "POST",
        "/api/conversations",
        Some(json!({"recruiter_id": candidate, "candidate_id": recruiter})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &router,
        "POST",
        "/api/conversations",
        Some(json!({"recruiter_id": recruiter, "candidate_id": candidate})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "in_progress");
    let conversation_id = json["id"].as_str().unwrap().to_owned();

    let (status, json) = send(
        &router,
        "GET",
        &format!("/api/conversations/{conversation_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recruiter"]["name"], "Sarah Chen");

    let (_, json) = send(
        &router,
        "GET",
        &format!("/api/conversations?agent_id={candidate}"),
        None,
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = send(&router, "GET", "/api/conversations/xyz", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = rendezvous_types::ConversationId::new();
    let (status, _) = send(&router, "GET", &format!("/api/conversations/{unknown}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_matches_filter_validation() {
    let (router, _) = make_router();

    for bad in ["0", "11", "300", "-1"] {
        let (status, json) = send(&router, "GET", &format!("/api/matches?min_score={bad}"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "min_score={bad}");
        assert_eq!(json["status"], 400);
    }

    let (status, json) = send(&router, "GET", "/api/matches?min_score=7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stats() {
    let (router, _) = make_router();
    let (status, json) = send(&router, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["costs"]["total_calls"], 0);
    assert_eq!(json["costs"]["calls_by_level"]["execution"], 0);
    assert_eq!(json["agents_in_world"], 0);
    assert_eq!(json["running"], false);
}
