use std::pin::Pin;

use futures::StreamExt;
use tokio::time::{self, Instant, Sleep};

use super::TurnRun;
use crate::error::ParleyError;
use crate::turn::events::TurnEvent;
use crate::types::{AssistantStage, ChatChunk, WireToolCall};

/// What one model round produced.
#[derive(Debug, Default)]
pub(super) struct RoundOutput {
    /// Concatenated answer text.
    pub text: String,
    /// Tool calls in declaration order.
    pub tool_calls: Vec<WireToolCall>,
    thinking_seen: bool,
}

impl TurnRun {
    /// Run one round: stream chunks into the queue until the terminator.
    pub(super) async fn stream_round(&mut self) -> Result<RoundOutput, ParleyError> {
        let request = self.build_request();
        let cancel = self.cancel.clone();

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ParleyError::Canceled),
            opened = self.client.stream_chat(&request, &cancel) => opened?,
        };

        let idle_timeout = self.config.stream_idle_timeout();
        let mut idle_sleep = idle_timeout.map(|limit| Box::pin(time::sleep(limit)));
        let mut round = RoundOutput::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ParleyError::Canceled),
                _ = idle_elapsed(&mut idle_sleep) => {
                    let limit = idle_timeout.map_or(0, |limit| limit.as_millis() as u64);
                    return Err(ParleyError::Timeout(limit));
                }
                item = stream.next() => {
                    let Some(item) = item else {
                        tracing::debug!(round = self.rounds, "stream ended without terminator");
                        break;
                    };
                    let chunk = item?;
                    if let (Some(sleep), Some(limit)) = (idle_sleep.as_mut(), idle_timeout) {
                        sleep.as_mut().reset(Instant::now() + limit);
                    }
                    let done = chunk.done;
                    self.apply_chunk(chunk, &mut round);
                    if done {
                        break;
                    }
                }
            }
        }
        Ok(round)
    }

    fn apply_chunk(&self, chunk: ChatChunk, round: &mut RoundOutput) {
        let answering_at = Some(self.answering_at.as_str());

        match chunk.thinking() {
            Some(thinking) => {
                round.thinking_seen = true;
                self.queue
                    .enqueue(answering_at, AssistantStage::Thinking, thinking);
                self.events.emit(TurnEvent::ThinkingDelta {
                    text: thinking.to_string(),
                    done: chunk.done,
                });
            }
            None if chunk.done && round.thinking_seen => {
                self.events.emit(TurnEvent::ThinkingDelta {
                    text: String::new(),
                    done: true,
                });
            }
            None => {}
        }

        match chunk.content() {
            Some(content) => {
                round.text.push_str(content);
                self.queue
                    .enqueue(answering_at, AssistantStage::Answer, content);
                self.events.emit(TurnEvent::AnswerDelta {
                    text: content.to_string(),
                    done: chunk.done,
                });
            }
            None if chunk.done => {
                self.events.emit(TurnEvent::AnswerDelta {
                    text: String::new(),
                    done: true,
                });
            }
            None => {}
        }

        round.tool_calls.extend(chunk.tool_calls().iter().cloned());
    }
}

/// Resolves when the idle deadline passes; never when there is none.
async fn idle_elapsed(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
