//! Message-level dialog edits: delete with cascade, truncate-and-resend.

use std::collections::HashSet;

use crate::types::{Dialog, Message};

/// System messages starting with this marker launch a scenario.
pub const SCENARIO_LAUNCH_PREFIX: &str = "SCENARIO_LAUNCH:";

pub fn is_scenario_launch(message: &Message) -> bool {
    message.is_system() && message.content.trim_start().starts_with(SCENARIO_LAUNCH_PREFIX)
}

/// Index of the launch message paired with the user message at `index`.
///
/// Only the immediate predecessor is considered.
fn paired_launch(messages: &[Message], index: usize) -> Option<usize> {
    let previous = index.checked_sub(1)?;
    (messages[index].is_user() && is_scenario_launch(&messages[previous])).then_some(previous)
}

/// Remove `message_id` together with its paired launch message and every
/// message answering a removed one.
///
/// Returns the dialog unchanged when the id is unknown.
pub fn delete_message(dialog: &Dialog, message_id: &str) -> Dialog {
    let Some(index) = dialog.position(message_id) else {
        return dialog.clone();
    };

    let mut removed: HashSet<&str> = HashSet::from([dialog.messages[index].id.as_str()]);
    if let Some(launch) = paired_launch(&dialog.messages, index) {
        removed.insert(dialog.messages[launch].id.as_str());
    }

    // Answers to answers are removed as well.
    loop {
        let before = removed.len();
        for message in &dialog.messages {
            if message
                .answering_at
                .as_deref()
                .is_some_and(|target| removed.contains(target))
            {
                removed.insert(message.id.as_str());
            }
        }
        if removed.len() == before {
            break;
        }
    }

    let messages = dialog
        .messages
        .iter()
        .filter(|m| !removed.contains(m.id.as_str()))
        .cloned()
        .collect();
    Dialog {
        messages,
        ..dialog.clone()
    }
}

/// Drop `message_id` and everything after it.
///
/// A paired launch message before the target is dropped too. Returns the
/// dialog unchanged when the id is unknown.
pub fn truncate_from_message(dialog: &Dialog, message_id: &str) -> Dialog {
    let Some(index) = dialog.position(message_id) else {
        return dialog.clone();
    };
    let cut = paired_launch(&dialog.messages, index).unwrap_or(index);

    let mut truncated = dialog.clone();
    truncated.messages.truncate(cut);
    truncated
}
