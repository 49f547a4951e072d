use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::controller::TurnRequest;
use super::events::{EventSink, TurnEvent};
use super::types::{TurnOutcome, TurnState};
use crate::config::ParleyConfig;
use crate::error::ParleyError;
use crate::provider::ChatClient;
use crate::queue::ChunkQueue;
use crate::types::{AssistantStage, Author, ChatMessage, ChatRequest, ChatRole, Message};

mod stream_phase;
mod tool_phase;

use stream_phase::RoundOutput;
use tool_phase::ToolPhaseOutcome;

/// State of one running turn. Owned by the spawned turn task.
pub(super) struct TurnRun {
    config: ParleyConfig,
    client: Arc<dyn ChatClient>,
    queue: ChunkQueue,
    request: TurnRequest,
    answering_at: String,
    snapshot: Vec<Message>,
    cancel: CancellationToken,
    events: EventSink,
    state: watch::Sender<TurnState>,
    history: Vec<ChatMessage>,
    rounds: usize,
    tool_calls_used: usize,
}

impl TurnRun {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        config: ParleyConfig,
        client: Arc<dyn ChatClient>,
        queue: ChunkQueue,
        request: TurnRequest,
        answering_at: String,
        snapshot: Vec<Message>,
        cancel: CancellationToken,
        events: EventSink,
        state: watch::Sender<TurnState>,
    ) -> Self {
        let mut history = history_from(&snapshot);
        history.push(ChatMessage::new(ChatRole::User, request.text.clone()));
        Self {
            config,
            client,
            queue,
            request,
            answering_at,
            snapshot,
            cancel,
            events,
            state,
            history,
            rounds: 0,
            tool_calls_used: 0,
        }
    }

    pub(super) async fn run(mut self) -> TurnOutcome {
        if debug_enabled() {
            tracing::debug!(
                client = self.client.name(),
                model = %self.config.model,
                history = self.history.len(),
                "parley turn start"
            );
        }

        loop {
            self.set_state(TurnState::Sending);
            self.rounds += 1;

            let round = match self.stream_round().await {
                Ok(round) => round,
                Err(err) => return self.finish_with_error(err),
            };

            if debug_enabled() {
                tracing::debug!(
                    round = self.rounds,
                    tool_calls = round.tool_calls.len(),
                    text_len = round.text.len(),
                    "parley round complete"
                );
            }

            if round.tool_calls.is_empty() {
                return self.complete(round.text).await;
            }

            self.set_state(TurnState::AwaitingToolDecision);
            match self.run_tool_phase(round).await {
                ToolPhaseOutcome::Continue => {}
                ToolPhaseOutcome::Canceled => return self.rollback(),
                ToolPhaseOutcome::Failed(err) => return self.fail(err),
            }
        }
    }

    fn build_request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(self.config.model.clone(), self.history.clone());
        request.stream = self.config.stream;
        request.format = self.request.format.clone();
        request.think = self.request.think.or(self.config.think);
        request.tools = self
            .request
            .tools
            .as_ref()
            .map(|tools| tools.schemas())
            .filter(|schemas| !schemas.is_empty());
        request
    }

    fn max_tool_calls(&self) -> usize {
        self.request
            .max_tool_calls
            .unwrap_or(self.config.max_tool_calls)
    }

    fn set_state(&self, state: TurnState) {
        self.state.send_replace(state);
        self.events.emit(TurnEvent::StateChanged { state });
    }

    fn outcome(&self, state: TurnState) -> TurnOutcome {
        TurnOutcome::new(state, self.rounds, self.tool_calls_used)
    }

    async fn complete(self, answer: String) -> TurnOutcome {
        self.queue.flush();
        self.queue.drained().await;
        self.set_state(TurnState::Complete);
        if debug_enabled() {
            tracing::debug!(rounds = self.rounds, "parley turn completed");
        }
        let mut outcome = self.outcome(TurnState::Complete);
        outcome.answer = answer;
        outcome
    }

    /// Route a round error: user cancellation rolls back, anything else fails.
    fn finish_with_error(self, err: ParleyError) -> TurnOutcome {
        if self.cancel.is_cancelled() {
            self.rollback()
        } else {
            self.fail(err)
        }
    }

    /// Restore the message list to its pre-turn snapshot.
    fn rollback(self) -> TurnOutcome {
        self.queue.reset();
        self.queue.list().replace(self.snapshot.clone());
        self.set_state(TurnState::Cancelled);
        tracing::debug!(rounds = self.rounds, "parley turn canceled");
        let mut outcome = self.outcome(TurnState::Cancelled);
        outcome.error = Some(ParleyError::Canceled.to_string());
        outcome
    }

    fn fail(self, err: ParleyError) -> TurnOutcome {
        tracing::warn!(error = %err, rounds = self.rounds, "parley turn failed");
        let text = self.config.error_text(&err);
        self.queue.fail_open(Some(&self.answering_at), &text);
        self.set_state(TurnState::Failed);
        let mut outcome = self.outcome(TurnState::Failed);
        outcome.error = Some(err.to_string());
        outcome
    }
}

/// The part of a dialog the model sees: system, user and answer messages.
pub(crate) fn history_from(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .filter_map(|m| {
            let role = match (m.author, m.stage()) {
                (Author::System, _) => ChatRole::System,
                (Author::User, _) => ChatRole::User,
                (Author::Assistant, Some(AssistantStage::Answer)) => ChatRole::Assistant,
                (Author::Assistant, _) => return None,
            };
            Some(ChatMessage::new(role, m.content.clone()))
        })
        .collect()
}

/// Result text fed back to the model: strings verbatim, anything else as JSON.
pub(crate) fn result_text(result: &serde_json::Value) -> String {
    match result {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(super) fn debug_enabled() -> bool {
    matches!(std::env::var("PARLEY_DEBUG").as_deref(), Ok("1"))
}

impl From<RoundOutput> for ChatMessage {
    fn from(round: RoundOutput) -> Self {
        ChatMessage::assistant_round(round.text, round.tool_calls)
    }
}
