//! Shared test helpers and a scripted chat client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use parley::config::ParleyConfig;
use parley::error::ParleyError;
use parley::provider::{ChatClient, ChunkStream};
use parley::queue::{ChunkQueue, MessageList};
use parley::tools::{AgentTool, AgentToolParameters, ToolRegistry};
use parley::turn::TurnController;
use parley::types::*;

/// What the client does for one `stream_chat` call.
pub enum Round {
    /// Yield these chunks, then end.
    Chunks(Vec<ChatChunk>),
    /// Yield these chunks, then never yield again.
    Stall(Vec<ChatChunk>),
    /// Yield these chunks, then a protocol error.
    Fail(Vec<ChatChunk>, String),
}

/// A chat client that replays scripted rounds and records every request.
pub struct ScriptedClient {
    rounds: Mutex<VecDeque<Round>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(rounds: Vec<Round>) -> Arc<Self> {
        Arc::new(Self {
            rounds: Mutex::new(rounds.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, ParleyError> {
        if cancel.is_cancelled() {
            return Err(ParleyError::Canceled);
        }
        self.requests.lock().unwrap().push(request.clone());

        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| answer("Mock response"));

        let stream: ChunkStream = match round {
            Round::Chunks(chunks) => futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
            Round::Stall(chunks) => futures::stream::iter(chunks.into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed(),
            Round::Fail(chunks, message) => futures::stream::iter(chunks.into_iter().map(Ok))
                .chain(futures::stream::once(async move {
                    Err(ParleyError::Protocol(message))
                }))
                .boxed(),
        };
        Ok(stream)
    }
}

pub fn text(content: &str) -> ChatChunk {
    ChatChunk {
        message: Some(ChunkMessage {
            content: Some(content.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn thinking(content: &str) -> ChatChunk {
    ChatChunk {
        message: Some(ChunkMessage {
            thinking: Some(content.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn tool_calls(calls: &[(&str, Value)]) -> ChatChunk {
    ChatChunk {
        message: Some(ChunkMessage {
            tool_calls: Some(
                calls
                    .iter()
                    .map(|(name, args)| WireToolCall::new(*name, args.clone()))
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn done() -> ChatChunk {
    ChatChunk::terminator(Some("stop".into()))
}

/// A complete round answering with `content`.
pub fn answer(content: &str) -> Round {
    Round::Chunks(vec![text(content), done()])
}

/// A complete round that asks for `calls` and says nothing else.
pub fn call_round(calls: &[(&str, Value)]) -> Round {
    Round::Chunks(vec![tool_calls(calls), done()])
}

pub fn test_config() -> ParleyConfig {
    let mut config = ParleyConfig::default().with_model("test-model");
    config.frame_interval_ms = 5;
    config
}

pub fn controller(config: ParleyConfig, client: Arc<ScriptedClient>) -> TurnController {
    controller_with(config, client, Vec::new())
}

pub fn controller_with(
    config: ParleyConfig,
    client: Arc<ScriptedClient>,
    messages: Vec<Message>,
) -> TurnController {
    let queue = ChunkQueue::from_config(MessageList::from_messages(messages), &config);
    TurnController::new(config, client, queue)
}

/// `echo` returns its `text` argument; every execution bumps `counter`.
pub fn echo_tool(counter: Arc<AtomicUsize>) -> AgentTool {
    AgentTool::new(
        "echo",
        "Echo the given text",
        AgentToolParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        move |args, _ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::String(args.get_str("text")?.to_string()))
            }
        },
    )
}

/// `slow` sleeps for `delay` before answering; every start bumps `counter`.
pub fn slow_tool(counter: Arc<AtomicUsize>, delay: Duration) -> AgentTool {
    AgentTool::new(
        "slow",
        "Wait, then answer",
        AgentToolParameters::empty(),
        move |_args, _ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(json!({ "slept_ms": delay.as_millis() as u64 }))
            }
        },
    )
}

pub fn echo_registry(counter: Arc<AtomicUsize>) -> ToolRegistry {
    ToolRegistry::new().with_tool(echo_tool(counter))
}

/// Serialized form of a message list, for byte-level comparisons.
pub fn fingerprint(messages: &[Message]) -> String {
    serde_json::to_string(messages).unwrap()
}
