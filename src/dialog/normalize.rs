//! Coercion of stored or foreign message/dialog shapes into canonical form.
//!
//! Every function here is idempotent: feeding its output back in returns the
//! same value.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::types::id::{self, DIALOG_ID_PREFIX, MESSAGE_ID_PREFIX, PROJECT_ID_PREFIX};
use crate::types::{
    AssistantStage, Author, Dialog, Message, ToolCallStatus, ToolTrace, DEFAULT_DIALOG_TITLE,
};

/// Build a canonical [`Message`] from an arbitrary JSON value.
pub fn normalize_message(raw: &Value) -> Message {
    let author = str_field(raw, "author")
        .and_then(|s| Author::from_str(&s.trim().to_ascii_lowercase()).ok())
        .unwrap_or(Author::Assistant);

    let id = id_field(raw, "id")
        .and_then(|raw_id| id::canonicalize(MESSAGE_ID_PREFIX, &raw_id))
        .unwrap_or_else(|| id::mint(MESSAGE_ID_PREFIX));

    let content = match raw.get("content") {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };

    let timestamp = str_field(raw, "timestamp")
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(id::display_time);

    let answering_at = id_field(raw, "answeringAt")
        .and_then(|target| id::canonicalize(MESSAGE_ID_PREFIX, &target));

    let assistant_stage = (author == Author::Assistant).then(|| {
        str_field(raw, "assistantStage")
            .and_then(|s| AssistantStage::from_str(&s.trim().to_ascii_lowercase()).ok())
            .unwrap_or(AssistantStage::Answer)
    });

    let tool_trace = if assistant_stage == Some(AssistantStage::Tool) {
        raw.get("toolTrace").and_then(normalize_trace)
    } else {
        None
    };

    Message {
        id,
        author,
        content,
        timestamp,
        answering_at,
        assistant_stage,
        tool_trace,
    }
}

/// Re-normalize a typed message.
pub fn normalize(message: &Message) -> Message {
    match serde_json::to_value(message) {
        Ok(value) => normalize_message(&value),
        Err(_) => message.clone(),
    }
}

/// A trace survives only with a non-empty call id and tool name and an
/// object `args`.
fn normalize_trace(raw: &Value) -> Option<ToolTrace> {
    let call_id = str_field(raw, "callId").filter(|s| !s.trim().is_empty())?;
    let tool_name = str_field(raw, "toolName").filter(|s| !s.trim().is_empty())?;
    let args: Map<String, Value> = raw.get("args")?.as_object()?.clone();

    Some(ToolTrace {
        call_id: call_id.to_string(),
        tool_name: tool_name.to_string(),
        args,
        result: raw.get("result").cloned().unwrap_or(Value::Null),
        status: str_field(raw, "status").and_then(|s| ToolCallStatus::from_str(s).ok()),
        command: str_field(raw, "command").map(str::to_string),
        cwd: str_field(raw, "cwd").map(str::to_string),
        is_admin: raw.get("isAdmin").and_then(Value::as_bool),
    })
}

/// Canonicalize dialog-level fields and every message.
///
/// Duplicate message ids after the first occurrence are re-minted.
pub fn normalize_dialog(dialog: &Dialog) -> Dialog {
    let id = id::canonicalize(DIALOG_ID_PREFIX, &dialog.id)
        .unwrap_or_else(|| id::mint(DIALOG_ID_PREFIX));

    let title = match dialog.title.trim() {
        "" => DEFAULT_DIALOG_TITLE.to_string(),
        trimmed => trimmed.to_string(),
    };

    let for_project_id = dialog
        .for_project_id
        .as_deref()
        .and_then(|project| id::canonicalize(PROJECT_ID_PREFIX, project));

    let mut seen = HashSet::new();
    let messages = dialog
        .messages
        .iter()
        .map(|message| {
            let mut message = normalize(message);
            if !seen.insert(message.id.clone()) {
                message.id = id::mint(MESSAGE_ID_PREFIX);
                seen.insert(message.id.clone());
            }
            message
        })
        .collect();

    Dialog {
        id,
        title,
        messages,
        for_project_id,
        created_at: dialog.created_at,
        updated_at: dialog.updated_at,
    }
}

/// Build a canonical [`Dialog`] from an arbitrary JSON value.
///
/// `fallback_id` is used when the value carries no usable `id`. Unparseable
/// timestamps fall back to now.
pub fn dialog_from_value(raw: &Value, fallback_id: Option<&str>) -> Dialog {
    let now = Utc::now();
    let created_at = time_field(raw, "createdAt").unwrap_or(now);
    let updated_at = time_field(raw, "updatedAt").unwrap_or(created_at);

    let messages = raw
        .get("messages")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_message).collect())
        .unwrap_or_default();

    let id = id_field(raw, "id")
        .and_then(|raw_id| id::canonicalize(DIALOG_ID_PREFIX, &raw_id))
        .or_else(|| fallback_id.and_then(|f| id::canonicalize(DIALOG_ID_PREFIX, f)))
        .unwrap_or_default();

    let draft = Dialog {
        id,
        title: str_field(raw, "title").unwrap_or_default().to_string(),
        messages,
        for_project_id: id_field(raw, "forProjectId"),
        created_at,
        updated_at,
    };
    normalize_dialog(&draft)
}

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

/// String or integer id fields, as text.
fn id_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn time_field(raw: &Value, key: &str) -> Option<DateTime<Utc>> {
    str_field(raw, key)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unknown_author_becomes_assistant_answer() {
        let message = normalize_message(&json!({ "author": "robot", "content": "hi" }));
        assert_eq!(message.author, Author::Assistant);
        assert_eq!(message.assistant_stage, Some(AssistantStage::Answer));
        assert!(id::is_canonical(MESSAGE_ID_PREFIX, &message.id));
    }

    #[test]
    fn stage_is_dropped_for_non_assistants() {
        let message = normalize_message(&json!({
            "author": "User",
            "assistantStage": "thinking",
            "content": "q"
        }));
        assert_eq!(message.author, Author::User);
        assert_eq!(message.assistant_stage, None);
    }

    #[test]
    fn numeric_ids_are_prefixed() {
        let message = normalize_message(&json!({
            "id": 1700000000123u64,
            "author": "assistant",
            "answeringAt": "1700000000000"
        }));
        assert_eq!(message.id, "msg_1700000000123");
        assert_eq!(message.answering_at.as_deref(), Some("msg_1700000000000"));
    }

    #[test]
    fn missing_content_and_timestamp_get_defaults() {
        let message = normalize_message(&json!({ "author": "system" }));
        assert_eq!(message.content, "");
        assert!(!message.timestamp.is_empty());
    }

    #[test]
    fn trace_kept_only_when_fully_paired() {
        let good = normalize_message(&json!({
            "author": "assistant",
            "assistantStage": "tool",
            "toolTrace": { "callId": "call_1", "toolName": "ls", "args": { "path": "." }, "result": "a\nb", "status": "done" }
        }));
        let trace = good.tool_trace.expect("trace kept");
        assert_eq!(trace.status, Some(ToolCallStatus::Done));

        let null_args = normalize_message(&json!({
            "author": "assistant",
            "assistantStage": "tool",
            "content": "ran ls",
            "toolTrace": { "callId": "call_1", "toolName": "ls", "args": null }
        }));
        assert!(null_args.tool_trace.is_none());
        assert_eq!(null_args.content, "ran ls");

        let wrong_stage = normalize_message(&json!({
            "author": "assistant",
            "assistantStage": "answer",
            "toolTrace": { "callId": "call_1", "toolName": "ls", "args": {} }
        }));
        assert!(wrong_stage.tool_trace.is_none());
    }

    #[test]
    fn normalize_is_idempotent() {
        let raws = [
            json!({ "author": "weird", "id": "bad id!", "content": 42 }),
            json!({ "author": "assistant", "assistantStage": "tool", "toolTrace": { "callId": "c", "toolName": "t", "args": {} } }),
            json!({ "author": "user", "id": "99", "timestamp": "10:30", "content": "hi" }),
            json!({}),
        ];
        for raw in raws {
            let once = normalize_message(&raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn dialog_fields_are_canonicalized() {
        let mut dialog = Dialog::new("   ");
        dialog.id = "42".into();
        dialog.for_project_id = Some("not a project!".into());
        let first = Message::user("a");
        let mut dup = Message::user("b");
        dup.id = first.id.clone();
        dialog.messages = vec![first.clone(), dup];

        let normalized = normalize_dialog(&dialog);

        assert_eq!(normalized.id, "dlg_42");
        assert_eq!(normalized.title, DEFAULT_DIALOG_TITLE);
        assert_eq!(normalized.for_project_id, None);
        assert_eq!(normalized.messages[0].id, first.id);
        assert_ne!(normalized.messages[1].id, first.id);
        assert_eq!(normalize_dialog(&normalized), normalized);
    }

    #[test]
    fn dialog_from_loose_json() {
        let dialog = dialog_from_value(
            &json!({
            "id": "dlg_x",
            "title": "Trip",
            "forProjectId": "p1",
            "createdAt": "2024-05-01T10:00:00Z",
            "messages": [{ "author": "user", "content": "hello" }]
            }),
            Some("dlg_ignored"),
        );
        assert_eq!(dialog.id, "dlg_x");
        assert_eq!(dialog.for_project_id.as_deref(), Some("prj_p1"));
        assert_eq!(dialog.updated_at, dialog.created_at);
        assert_eq!(dialog.messages.len(), 1);
    }

    #[test]
    fn missing_or_malformed_id_uses_fallback() {
        let missing = dialog_from_value(&json!({ "title": "old" }), Some("dlg_legacy"));
        assert_eq!(missing.id, "dlg_legacy");

        let malformed = dialog_from_value(&json!({ "id": "not an id!" }), Some("dlg_legacy"));
        assert_eq!(malformed.id, "dlg_legacy");
        assert_eq!(normalize_dialog(&malformed), malformed);

        let neither = dialog_from_value(&json!({}), None);
        assert!(id::is_canonical(DIALOG_ID_PREFIX, &neither.id));
    }
}
