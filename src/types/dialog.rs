//! Dialog (conversation) types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{self, DIALOG_ID_PREFIX};
use super::message::Message;

/// Title used when a dialog has none.
pub const DEFAULT_DIALOG_TITLE: &str = "New dialog";

/// An ordered conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dialog {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub for_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dialog {
    /// Create an empty standalone dialog.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id::mint(DIALOG_ID_PREFIX),
            title: title.into(),
            messages: Vec::new(),
            for_project_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Index of the message with `message_id`.
    pub fn position(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn is_standalone(&self) -> bool {
        self.for_project_id.is_none()
    }

    /// Build the list entry for this dialog.
    pub fn summary(&self) -> DialogSummary {
        let preview = self
            .messages
            .iter()
            .rev()
            .map(|m| m.content.trim())
            .find(|c| !c.is_empty())
            .map(|c| c.chars().take(PREVIEW_CHARS).collect())
            .unwrap_or_default();
        DialogSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            preview,
            updated_at: self.updated_at,
        }
    }
}

const PREVIEW_CHARS: usize = 80;

/// List entry for a stored dialog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogSummary {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub updated_at: DateTime<Utc>,
}
