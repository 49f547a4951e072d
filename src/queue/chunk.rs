//! Frame-cadence batching of streamed text into the message list.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use super::list::MessageList;
use crate::config::ParleyConfig;
use crate::types::{AssistantStage, Message, ToolCallStatus, ToolTrace};

#[derive(Debug)]
struct Piece {
    answering_at: Option<String>,
    stage: AssistantStage,
    text: String,
}

/// The message currently accepting appends.
#[derive(Debug, Clone)]
struct OpenSlot {
    answering_at: Option<String>,
    stage: AssistantStage,
    message_id: String,
}

impl OpenSlot {
    fn accepts(&self, piece: &Piece) -> bool {
        self.stage == piece.stage && self.answering_at == piece.answering_at
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Piece>,
    open: Option<OpenSlot>,
    tick_scheduled: bool,
    generation: u64,
    commits: u64,
}

struct Shared {
    list: MessageList,
    frame_interval: Duration,
    max_piece_chars: usize,
    state: Mutex<QueueState>,
    drained: Notify,
}

/// Buffers `(stage, text)` fragments and commits them to a [`MessageList`]
/// once per frame.
///
/// Each batch is applied as one list commit. Pieces for the open
/// `(answering_at, stage)` slot are appended to its message; any other piece
/// seals that message and opens a new one.
#[derive(Clone)]
pub struct ChunkQueue {
    shared: Arc<Shared>,
}

impl ChunkQueue {
    pub fn new(list: MessageList, frame_interval: Duration, max_piece_chars: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                list,
                frame_interval,
                max_piece_chars: max_piece_chars.max(1),
                state: Mutex::new(QueueState::default()),
                drained: Notify::new(),
            }),
        }
    }

    pub fn from_config(list: MessageList, config: &ParleyConfig) -> Self {
        Self::new(list, config.frame_interval(), config.max_piece_chars)
    }

    /// The list this queue commits into.
    pub fn list(&self) -> &MessageList {
        &self.shared.list
    }

    /// Buffer `text` for the `(answering_at, stage)` slot.
    ///
    /// The text is split into pieces of at most `max_piece_chars` characters.
    /// A flush is scheduled one frame out if none is pending.
    pub fn enqueue(&self, answering_at: Option<&str>, stage: AssistantStage, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut state = self.shared.lock();
        for piece in split_pieces(text, self.shared.max_piece_chars) {
            state.pending.push_back(Piece {
                answering_at: answering_at.map(str::to_string),
                stage,
                text: piece,
            });
        }
        if !state.tick_scheduled {
            self.schedule_tick(&mut state);
        }
    }

    fn schedule_tick(&self, state: &mut QueueState) {
        // Without a runtime the queue only drains on explicit flush.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        state.tick_scheduled = true;
        let generation = state.generation;
        let shared = Arc::clone(&self.shared);
        handle.spawn(async move {
            tokio::time::sleep(shared.frame_interval).await;
            shared.commit_batch(Some(generation));
        });
    }

    /// Commit everything buffered now. Returns `true` if anything was committed.
    pub fn flush(&self) -> bool {
        self.shared.commit_batch(None)
    }

    /// Resolve once the buffer is empty (after a batch commit or a reset).
    pub async fn drained(&self) {
        loop {
            let notified = self.shared.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.lock().pending.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Discard unflushed pieces, seal the open message and wake drain waiters.
    pub fn reset(&self) {
        {
            let mut state = self.shared.lock();
            let dropped = state.pending.len();
            state.pending.clear();
            state.open = None;
            state.tick_scheduled = false;
            state.generation += 1;
            if dropped > 0 {
                tracing::debug!(dropped, "chunk queue reset");
            }
        }
        self.shared.drained.notify_waiters();
    }

    /// Number of buffered pieces.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Number of batch commits applied.
    pub fn commit_count(&self) -> u64 {
        self.shared.lock().commits
    }

    /// Flush, then append a whole message and seal the open slot.
    pub fn push_message(&self, message: Message) {
        self.flush();
        let mut state = self.shared.lock();
        state.open = None;
        self.shared.list.update(|messages| messages.push(message));
    }

    /// Flush, then record a tool call as a running tool-stage message.
    ///
    /// Returns the id of the message carrying the trace.
    pub fn record_tool_started(&self, answering_at: Option<&str>, trace: ToolTrace) -> String {
        let message = Message::tool(answering_at.map(str::to_string), trace);
        let id = message.id.clone();
        self.push_message(message);
        id
    }

    /// Settle the trace on `message_id` with `result`.
    pub fn record_tool_finished(
        &self,
        message_id: &str,
        result: serde_json::Value,
        status: ToolCallStatus,
    ) {
        self.shared.list.update(|messages| {
            let trace = messages
                .iter_mut()
                .rev()
                .find(|m| m.id == message_id)
                .and_then(|m| m.tool_trace.as_mut());
            if let Some(trace) = trace {
                trace.result = result;
                trace.status = Some(status);
            }
        });
    }

    /// Show `error_text` in place of the in-progress answer.
    ///
    /// Unflushed pieces are discarded. If the open message is an answer for
    /// `answering_at`, its content is replaced; otherwise a new answer message
    /// carries the text. The slot is sealed afterwards.
    pub fn fail_open(&self, answering_at: Option<&str>, error_text: &str) {
        let mut state = self.shared.lock();
        state.pending.clear();
        state.tick_scheduled = false;
        state.generation += 1;
        let open = state.open.take().filter(|slot| {
            slot.stage == AssistantStage::Answer && slot.answering_at.as_deref() == answering_at
        });

        self.shared.list.update(|messages| {
            let target = open
                .as_ref()
                .and_then(|slot| messages.iter_mut().rev().find(|m| m.id == slot.message_id));
            match target {
                Some(message) => message.content = error_text.to_string(),
                None => messages.push(Message::assistant(
                    AssistantStage::Answer,
                    answering_at.map(str::to_string),
                    error_text,
                )),
            }
        });
        drop(state);
        self.shared.drained.notify_waiters();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply every pending piece as one list commit.
    ///
    /// `generation` is set for timer-driven commits; a reset in between makes
    /// the stale timer a no-op.
    fn commit_batch(&self, generation: Option<u64>) -> bool {
        let mut state = self.lock();
        if let Some(generation) = generation {
            if generation != state.generation {
                return false;
            }
            state.tick_scheduled = false;
        }
        if state.pending.is_empty() {
            drop(state);
            self.drained.notify_waiters();
            return false;
        }

        let batch: Vec<Piece> = state.pending.drain(..).collect();
        let mut open = state.open.take();
        self.list.update(|messages| {
            for piece in batch {
                let target = open
                    .as_ref()
                    .filter(|slot| slot.accepts(&piece))
                    .and_then(|slot| messages.iter().rposition(|m| m.id == slot.message_id));
                match target {
                    Some(index) => messages[index].content.push_str(&piece.text),
                    None => {
                        let message =
                            Message::assistant(piece.stage, piece.answering_at.clone(), piece.text);
                        open = Some(OpenSlot {
                            answering_at: piece.answering_at,
                            stage: piece.stage,
                            message_id: message.id.clone(),
                        });
                        messages.push(message);
                    }
                }
            }
        });
        state.open = open;
        state.commits += 1;
        drop(state);
        self.drained.notify_waiters();
        true
    }
}

impl std::fmt::Debug for ChunkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ChunkQueue")
            .field("pending", &state.pending.len())
            .field("commits", &state.commits)
            .field("open", &state.open)
            .finish()
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
pub(crate) fn split_pieces(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_chars {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
