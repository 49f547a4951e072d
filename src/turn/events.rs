//! Observation events emitted while a turn runs.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::types::TurnState;

/// Advisory notifications for one turn, in emission order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Answer text as it streams; `done` marks the end of a round.
    AnswerDelta { text: String, done: bool },
    /// Reasoning text as it streams.
    ThinkingDelta { text: String, done: bool },
    ToolCallStarted {
        call_id: String,
        tool_name: String,
        args: serde_json::Value,
    },
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        args: serde_json::Value,
        result: serde_json::Value,
        is_error: bool,
    },
    StateChanged { state: TurnState },
}

/// Sending half of a turn's event channel. Sends after the receiver is gone
/// are dropped.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<TurnEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn emit(&self, event: TurnEvent) {
        let _ = self.tx.send(event);
    }
}
