//! Dialog message types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::id::{self, MESSAGE_ID_PREFIX};

/// Who wrote a message.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Author {
    System,
    User,
    Assistant,
}

/// What an assistant message holds: reasoning, a tool invocation, or the answer.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssistantStage {
    Thinking,
    Tool,
    Answer,
}

/// Settlement state of a traced tool call.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolCallStatus {
    Running,
    Done,
    Error,
}

/// Recorded invocation of one tool, attached to a tool-stage message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolTrace {
    pub call_id: String,
    pub tool_name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolCallStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl ToolTrace {
    /// A trace for a call that has been announced but not settled.
    pub fn running(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            args,
            result: serde_json::Value::Null,
            status: Some(ToolCallStatus::Running),
            command: None,
            cwd: None,
            is_admin: None,
        }
    }
}

/// A single dialog message.
///
/// Messages are replaced rather than edited once committed; only the chunk
/// queue appends to `content` while a turn is streaming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answering_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_stage: Option<AssistantStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_trace: Option<ToolTrace>,
}

impl Message {
    fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            id: id::mint(MESSAGE_ID_PREFIX),
            author,
            content: content.into(),
            timestamp: id::display_time(),
            answering_at: None,
            assistant_stage: None,
            tool_trace: None,
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Author::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text)
    }

    /// Create an assistant message produced while answering `answering_at`.
    pub fn assistant(
        stage: AssistantStage,
        answering_at: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        let mut message = Self::new(Author::Assistant, text);
        message.assistant_stage = Some(stage);
        message.answering_at = answering_at;
        message
    }

    /// Create a tool-stage assistant message carrying `trace`.
    pub fn tool(answering_at: Option<String>, trace: ToolTrace) -> Self {
        let mut message = Self::assistant(AssistantStage::Tool, answering_at, "");
        message.tool_trace = Some(trace);
        message
    }

    /// Effective stage: assistant messages without one count as answers.
    pub fn stage(&self) -> Option<AssistantStage> {
        match self.author {
            Author::Assistant => Some(self.assistant_stage.unwrap_or(AssistantStage::Answer)),
            _ => None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    pub fn is_system(&self) -> bool {
        self.author == Author::System
    }
}
