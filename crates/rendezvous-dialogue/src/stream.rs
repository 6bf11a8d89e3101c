//! Streaming adapter over a [`Conversation`].
//!
//! The conversation runs on its own task and pushes each turn through a
//! bounded channel, so consumers see turns as soon as they are generated.
//! The stream is finite: it ends after a [`DialogueEvent::Concluded`] or
//! after the first error. Dropping it aborts the producer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use rendezvous_types::ConversationTurn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::conversation::{Conversation, ConversationOutcome};
use crate::error::DialogueError;

/// Turns buffered ahead of a slow consumer.
const STREAM_BUFFER: usize = 4;

/// One item from a running conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueEvent {
    /// A new turn, in order.
    Turn(ConversationTurn),
    /// The conversation finished. Always the last event on success.
    Concluded(ConversationOutcome),
}

/// A running conversation viewed as a stream of events.
pub struct TurnStream {
    rx: mpsc::Receiver<Result<DialogueEvent, DialogueError>>,
    handle: JoinHandle<()>,
}

impl TurnStream {
    pub(crate) fn spawn(conversation: Conversation) -> Self {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let handle = tokio::spawn(produce(conversation, tx));
        Self { rx, handle }
    }

    /// Wait for the next event. `None` once the stream is exhausted.
    pub async fn next_event(&mut self) -> Option<Result<DialogueEvent, DialogueError>> {
        self.rx.recv().await
    }
}

impl Stream for TurnStream {
    type Item = Result<DialogueEvent, DialogueError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn produce(
    mut conversation: Conversation,
    tx: mpsc::Sender<Result<DialogueEvent, DialogueError>>,
) {
    loop {
        match conversation.step().await {
            Ok(Some(turn)) => {
                if tx.send(Ok(DialogueEvent::Turn(turn))).await.is_err() {
                    debug!(conversation_id = %conversation.id(), "Turn stream consumer gone");
                    return;
                }
            }
            Ok(None) => {
                if let Some(outcome) = conversation.outcome().cloned() {
                    let _ = tx.send(Ok(DialogueEvent::Concluded(outcome))).await;
                }
                return;
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id(), error = %e, "Conversation failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}
