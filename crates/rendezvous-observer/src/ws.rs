//! `WebSocket` handlers for real-time event streaming.
//!
//! `GET /ws/world` forwards every [`WorldEvent`] from the engine hub, with
//! a `ping` whenever nothing happened for the keepalive window.
//!
//! `GET /ws/conversations/{id}` replays the persisted turns of one
//! conversation, then forwards its live `turn` events, then a final
//! `complete` or `error` event, and closes.
//!
//! Each client owns its own bounded queue in the hub, so a slow client
//! only loses its own events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use rendezvous_types::{
    ConversationId, ConversationRecord, ConversationStatus, ConversationTurn, TurnEvent,
    WorldEvent,
};
use tracing::{debug, warn};

use crate::error::ObserverError;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Upgrade to a `WebSocket` streaming every world event.
///
/// # Route
///
/// `GET /ws/world`
pub async fn ws_world(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_world(socket, state))
}

/// Upgrade to a `WebSocket` streaming one conversation.
///
/// # Route
///
/// `GET /ws/conversations/{id}`
pub async fn ws_conversation(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_conversation(socket, state, id))
}

async fn handle_world(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("World WebSocket client connected");

    let mut sub = state.engine.subscribe();
    if !send_event(&mut socket, &WorldEvent::WorldState { data: state.engine.snapshot() }).await {
        return;
    }

    loop {
        tokio::select! {
            event = sub.recv_or_ping(state.keepalive) => {
                let Some(event) = event else {
                    debug!("Event hub closed, shutting down WebSocket");
                    return;
                };
                if !send_event(&mut socket, &event).await {
                    return;
                }
            }
            msg = socket.recv() => {
                if !handle_client_message(&mut socket, msg).await {
                    return;
                }
            }
        }
    }
}

async fn handle_conversation(mut socket: WebSocket, state: Arc<AppState>, raw_id: String) {
    // Subscribe before reading the record so no live turn falls in between.
    let mut sub = state.engine.subscribe();

    let record = match parse_id::<ConversationId>(&raw_id) {
        Ok(id) => state.engine.conversation(id).await.map_err(ObserverError::from),
        Err(e) => Err(e),
    };
    let record = match record {
        Ok(record) => record,
        Err(e) => {
            let _ = send_event(
                &mut socket,
                &WorldEvent::Error {
                    message: e.to_string(),
                    conversation_id: None,
                },
            )
            .await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    let id = record.id;
    debug!(conversation_id = %id, "Conversation WebSocket client connected");

    let replayed = u32::try_from(record.turns.len()).unwrap_or(u32::MAX);
    for (index, turn) in (0_u32..).zip(record.turns.iter().cloned()) {
        if !send_event(&mut socket, &turn_event(id, index, turn)).await {
            return;
        }
    }

    let completed = record.status == ConversationStatus::Completed;
    if completed || !state.engine.snapshot().active_conversations.contains_key(&id) {
        // It may have finished between the first read and the active check.
        let latest = if completed {
            Some(record)
        } else {
            state.engine.conversation(id).await.ok()
        };
        for event in closing_events(id, latest, replayed) {
            if !send_event(&mut socket, &event).await {
                return;
            }
        }
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            event = sub.recv_or_ping(state.keepalive) => {
                let Some(event) = event else {
                    return;
                };
                let terminal = match &*event {
                    WorldEvent::Ping => false,
                    WorldEvent::Turn { data } if data.conversation_id == id => {
                        if data.index < replayed {
                            continue;
                        }
                        false
                    }
                    WorldEvent::Complete { conversation_id, .. }
                    | WorldEvent::Error { conversation_id: Some(conversation_id), .. }
                        if *conversation_id == id => true,
                    _ => continue,
                };
                if !send_event(&mut socket, &event).await {
                    return;
                }
                if terminal {
                    let _ = socket.send(Message::Close(None)).await;
                    debug!(conversation_id = %id, "Conversation stream finished");
                    return;
                }
            }
            msg = socket.recv() => {
                if !handle_client_message(&mut socket, msg).await {
                    return;
                }
            }
        }
    }
}

const fn turn_event(conversation_id: ConversationId, index: u32, turn: ConversationTurn) -> WorldEvent {
    WorldEvent::Turn {
        data: TurnEvent {
            conversation_id,
            index,
            turn,
        },
    }
}

/// Events that end the stream of a conversation that is no longer running.
///
/// `latest` is a fresh read of its record and `sent` the number of turns the
/// client already has. A completed record yields the missing turns and
/// `complete`; anything else is an `error`.
fn closing_events(
    id: ConversationId,
    latest: Option<ConversationRecord>,
    sent: u32,
) -> Vec<WorldEvent> {
    match latest {
        Some(record) if record.status == ConversationStatus::Completed => {
            let mut events: Vec<WorldEvent> = (0_u32..)
                .zip(record.turns)
                .filter(|(index, _)| *index >= sent)
                .map(|(index, turn)| turn_event(id, index, turn))
                .collect();
            events.push(WorldEvent::Complete {
                conversation_id: id,
                match_score: record.match_score,
                decision: record.decision,
            });
            events
        }
        _ => vec![WorldEvent::Error {
            message: format!("conversation {id} is not running"),
            conversation_id: Some(id),
        }],
    }
}

/// Serialize and send one event. Returns `false` once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &WorldEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize world event: {e}");
            return true;
        }
    };
    if socket.send(Message::Text(json.into())).await.is_err() {
        debug!("WebSocket client disconnected (send failed)");
        return false;
    }
    true
}

/// React to a frame from the client. Returns `false` once the client is
/// gone.
async fn handle_client_message(
    socket: &mut WebSocket,
    msg: Option<Result<Message, axum::Error>>,
) -> bool {
    match msg {
        Some(Ok(Message::Close(_))) | None => {
            debug!("WebSocket client disconnected");
            false
        }
        Some(Ok(Message::Ping(data))) => {
            if socket.send(Message::Pong(data)).await.is_err() {
                debug!("WebSocket client disconnected (pong failed)");
                return false;
            }
            true
        }
        Some(Err(e)) => {
            debug!("WebSocket error: {e}");
            false
        }
        // Text and binary frames from the client are ignored.
        _ => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rendezvous_types::{AgentId, AgentType, Decision, Participant};

    use super::*;

    fn record_with_turns(count: usize) -> ConversationRecord {
        let participant = |name: &str| Participant {
            agent_id: AgentId::new(),
            name: name.to_owned(),
        };
        let mut record = ConversationRecord::start(
            ConversationId::new(),
            participant("Sarah Chen"),
            participant("Alex Johnson"),
        );
        let timestamp = record.created_at;
        record.turns = (0..count)
            .map(|i| ConversationTurn {
                role: if i % 2 == 0 {
                    AgentType::Recruiter
                } else {
                    AgentType::Candidate
                },
                speaker_name: "speaker".to_owned(),
                content: format!("turn {i}"),
                timestamp,
                is_final: false,
                final_evaluation: None,
                thinking_level: None,
                match_confidence: None,
            })
            .collect();
        record
    }

    #[test]
    fn finished_after_first_read_sends_missing_turns_then_complete() {
        let mut record = record_with_turns(3);
        record.status = ConversationStatus::Completed;
        record.match_score = Some(8);
        record.decision = Some(Decision::GoodFit);
        let id = record.id;

        let events = closing_events(id, Some(record), 1);

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], WorldEvent::Turn { data } if data.index == 1));
        assert!(matches!(&events[1], WorldEvent::Turn { data } if data.index == 2));
        assert_eq!(
            events[2],
            WorldEvent::Complete {
                conversation_id: id,
                match_score: Some(8),
                decision: Some(Decision::GoodFit),
            }
        );
    }

    #[test]
    fn stuck_or_missing_record_is_an_error() {
        let record = record_with_turns(2);
        let id = record.id;

        for latest in [Some(record), None] {
            let events = closing_events(id, latest, 2);
            assert_eq!(events.len(), 1);
            assert!(matches!(
                &events[0],
                WorldEvent::Error { conversation_id: Some(c), .. } if *c == id
            ));
        }
    }
}
