//! Turn states and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnState {
    /// A model round is in flight.
    Sending,
    /// The round finished and declared at least one tool call.
    AwaitingToolDecision,
    ExecutingTools,
    Complete,
    Failed,
    Cancelled,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }
}

/// Final result of a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnOutcome {
    pub state: TurnState,
    /// Model rounds started.
    pub rounds: usize,
    /// Tool calls executed.
    pub tool_calls_used: usize,
    /// Answer text of the final round.
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TurnOutcome {
    pub(crate) fn new(state: TurnState, rounds: usize, tool_calls_used: usize) -> Self {
        Self {
            state,
            rounds,
            tool_calls_used,
            answer: String::new(),
            error: None,
            finished_at: Utc::now(),
        }
    }

    /// Outcome when the turn task vanished before reporting.
    pub(crate) fn lost() -> Self {
        let mut outcome = Self::new(TurnState::Failed, 0, 0);
        outcome.error = Some("turn task ended without a result".to_string());
        outcome
    }

    pub fn is_complete(&self) -> bool {
        self.state == TurnState::Complete
    }
}
