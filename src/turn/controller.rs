//! Turn controller entry point and the handle for an in-flight turn.

use std::sync::Arc;

use bon::Builder;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use super::engine::TurnRun;
use super::events::{EventSink, TurnEvent};
use super::types::{TurnOutcome, TurnState};
use crate::config::ParleyConfig;
use crate::provider::ChatClient;
use crate::queue::ChunkQueue;
use crate::tools::ToolExecutor;
use crate::types::Message;

/// Input for one turn.
#[derive(Clone, Builder)]
pub struct TurnRequest {
    /// The new user message text.
    #[builder(into)]
    pub text: String,
    /// Tool collaborator; a tool call without one fails the turn.
    pub tools: Option<Arc<dyn ToolExecutor>>,
    /// Structured-output hint forwarded to the model.
    pub format: Option<serde_json::Value>,
    /// Overrides `ParleyConfig::think`.
    pub think: Option<bool>,
    /// Overrides `ParleyConfig::max_tool_calls`.
    pub max_tool_calls: Option<usize>,
}

impl std::fmt::Debug for TurnRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnRequest")
            .field("text", &self.text)
            .field("tools", &self.tools.as_ref().map(|t| t.schemas().len()))
            .field("format", &self.format)
            .field("think", &self.think)
            .field("max_tool_calls", &self.max_tool_calls)
            .finish()
    }
}

/// Handle for an in-flight turn.
#[derive(Debug)]
pub struct TurnHandle {
    user_message_id: String,
    cancel: CancellationToken,
    state: watch::Receiver<TurnState>,
    events: Option<mpsc::UnboundedReceiver<TurnEvent>>,
    result_rx: oneshot::Receiver<TurnOutcome>,
}

impl TurnHandle {
    /// Id of the user message this turn answers.
    pub fn user_message_id(&self) -> &str {
        &self.user_message_id
    }

    /// Request cancellation. The turn restores the pre-turn message list.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the turn, e.g. for wiring to a signal handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<TurnState> {
        self.state.clone()
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn events(&mut self) -> Option<UnboundedReceiverStream<TurnEvent>> {
        self.events.take().map(UnboundedReceiverStream::new)
    }

    pub async fn wait(self) -> TurnOutcome {
        self.result_rx.await.unwrap_or_else(|_| TurnOutcome::lost())
    }
}

/// Drives turns against a chat client, committing output through a chunk queue.
#[derive(Clone)]
pub struct TurnController {
    config: ParleyConfig,
    client: Arc<dyn ChatClient>,
    queue: ChunkQueue,
}

impl TurnController {
    pub fn new(config: ParleyConfig, client: Arc<dyn ChatClient>, queue: ChunkQueue) -> Self {
        Self {
            config,
            client,
            queue,
        }
    }

    pub fn queue(&self) -> &ChunkQueue {
        &self.queue
    }

    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    /// Append the user message and spawn the turn.
    ///
    /// The message list is snapshotted before the append; a user
    /// cancellation restores exactly that snapshot.
    pub fn start(&self, request: TurnRequest) -> TurnHandle {
        let snapshot = self.queue.list().snapshot();
        let user = Message::user(request.text.clone());
        let user_message_id = user.id.clone();
        self.queue.push_message(user);

        let cancel = CancellationToken::new();
        let (sink, events) = EventSink::channel();
        let (state_tx, state) = watch::channel(TurnState::Sending);
        let (result_tx, result_rx) = oneshot::channel();

        let run = TurnRun::new(
            self.config.clone(),
            Arc::clone(&self.client),
            self.queue.clone(),
            request,
            user_message_id.clone(),
            snapshot,
            cancel.clone(),
            sink,
            state_tx,
        );
        tokio::spawn(async move {
            let outcome = run.run().await;
            let _ = result_tx.send(outcome);
        });

        TurnHandle {
            user_message_id,
            cancel,
            state,
            events: Some(events),
            result_rx,
        }
    }

    /// Start a turn and wait for it.
    pub async fn run(&self, request: TurnRequest) -> TurnOutcome {
        self.start(request).wait().await
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("client", &self.client.name())
            .field("model", &self.config.model)
            .field("queue", &self.queue)
            .finish()
    }
}
