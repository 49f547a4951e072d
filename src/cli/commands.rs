//! Slash commands understood by the chat loop.

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Text to send as a new turn.
    Message(String),
    New,
    List,
    /// Show the current dialog's messages with their ids.
    Messages,
    Rename(String),
    /// Drop a message (and its cascade) from the dialog.
    Delete(String),
    /// Drop a message and everything after it.
    Truncate(String),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub const HELP: &str = "\
/new              start a new dialog
/list             list dialogs
/messages         show messages with their ids
/rename <title>   rename the current dialog
/delete <id>      delete a message
/truncate <id>    drop a message and everything after it
/quit             exit";

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((command, ""));

        match (name, rest) {
            ("new", _) => Self::New,
            ("list", _) => Self::List,
            ("messages", _) => Self::Messages,
            ("rename", title) if !title.is_empty() => Self::Rename(title.to_string()),
            ("delete", id) if !id.is_empty() => Self::Delete(id.to_string()),
            ("truncate", id) if !id.is_empty() => Self::Truncate(id.to_string()),
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            ChatInput::parse("  hello there "),
            ChatInput::Message("hello there".into())
        );
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(
            ChatInput::parse("/rename  Road trip"),
            ChatInput::Rename("Road trip".into())
        );
        assert_eq!(
            ChatInput::parse("/truncate msg_1"),
            ChatInput::Truncate("msg_1".into())
        );
    }

    #[test]
    fn messages_command_takes_no_argument() {
        assert_eq!(ChatInput::parse("/messages"), ChatInput::Messages);
        assert!(HELP.contains("/messages"));
    }

    #[test]
    fn missing_argument_is_unknown() {
        assert_eq!(
            ChatInput::parse("/rename"),
            ChatInput::Unknown("/rename".into())
        );
    }

    #[test]
    fn quit_aliases_and_blank_lines() {
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
    }
}
