//! Interactive chat loop and dialog subcommands.

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::commands::{ChatInput, HELP};
use super::{ChatArgs, DialogCommands};
use crate::config::ParleyConfig;
use crate::dialog::{DialogManager, FileDialogStore};
use crate::error::Result;
use crate::provider::{ChatClient, OllamaClient};
use crate::queue::{ChunkQueue, MessageList};
use crate::tools::builtin::builtin_registry;
use crate::tools::ToolExecutor;
use crate::turn::{TurnController, TurnEvent, TurnRequest, TurnState};
use crate::types::{Dialog, DialogSummary, Message};
use crate::util::cache::ClientCache;

fn dialog_manager(config: &ParleyConfig) -> DialogManager {
    DialogManager::new(Arc::new(FileDialogStore::new(config.data_dir())))
}

/// `parley dialogs ...`
pub fn run_dialogs(config: &ParleyConfig, command: &DialogCommands) -> Result<()> {
    let manager = dialog_manager(config);
    match command {
        DialogCommands::List => print_summaries(&manager.list()?),
        DialogCommands::Delete { id } => {
            let outcome = manager.delete(id)?;
            println!("active: {} ({})", outcome.active.title, outcome.active.id);
        }
    }
    Ok(())
}

fn print_summaries(dialogs: &[DialogSummary]) {
    if dialogs.is_empty() {
        println!("(no dialogs)");
    }
    for dialog in dialogs {
        println!(
            "{}  {}  {}  {}",
            dialog.id,
            dialog.updated_at.format("%Y-%m-%d %H:%M"),
            dialog.title,
            dialog.preview
        );
    }
}

fn print_messages(messages: &[Message]) {
    if messages.is_empty() {
        eprintln!("(no messages)");
    }
    for message in messages {
        let stage = message
            .stage()
            .map(|stage| format!("/{stage}"))
            .unwrap_or_default();
        let preview: String = message.content.chars().take(60).collect();
        eprintln!(
            "{}  {}{}  {}",
            message.id,
            message.author,
            stage,
            preview.replace('\n', " ")
        );
    }
}

/// `parley chat`: read lines from stdin and run one turn per message.
pub async fn run_chat(config: ParleyConfig, args: &ChatArgs) -> Result<()> {
    let config = args.apply(config);
    config.validate()?;

    let manager = dialog_manager(&config);
    let cache = ClientCache::new();
    let client: Arc<dyn ChatClient> = Arc::new(OllamaClient::new(&config, &cache)?);
    let tools: Option<Arc<dyn ToolExecutor>> = args
        .tools
        .then(|| Arc::new(builtin_registry()) as Arc<dyn ToolExecutor>);

    let mut dialog = manager.get_active_dialog(args.dialog.as_deref())?;
    let list = MessageList::from_messages(dialog.messages.clone());
    let queue = ChunkQueue::from_config(list.clone(), &config);
    let controller = TurnController::new(config.clone(), client, queue.clone());

    if let Some(system) = &args.system {
        if list.is_empty() {
            queue.push_message(Message::system(system.clone()));
        }
    }

    eprintln!(
        "dialog: {} ({})  model: {}  /help for commands",
        dialog.title, dialog.id, config.model
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => {}
            ChatInput::Quit => break,
            ChatInput::Help => eprintln!("{HELP}"),
            ChatInput::Unknown(input) => eprintln!("unknown command: {input}"),
            ChatInput::New => {
                dialog = manager.create(None)?;
                list.replace(dialog.messages.clone());
                eprintln!("dialog: {} ({})", dialog.title, dialog.id);
            }
            ChatInput::List => print_summaries(&manager.list()?),
            ChatInput::Messages => print_messages(&list.snapshot()),
            ChatInput::Rename(title) => {
                dialog = manager.rename(&dialog.id, &title)?;
                eprintln!("renamed to {}", dialog.title);
            }
            ChatInput::Delete(message_id) => {
                dialog.messages = list.snapshot();
                dialog = manager.save_snapshot(&dialog)?;
                dialog = manager.delete_message(&dialog.id, &message_id)?;
                list.replace(dialog.messages.clone());
                eprintln!("{} messages", dialog.messages.len());
            }
            ChatInput::Truncate(message_id) => {
                dialog.messages = list.snapshot();
                dialog = manager.save_snapshot(&dialog)?;
                dialog = manager.truncate_from_message(&dialog.id, &message_id)?;
                list.replace(dialog.messages.clone());
                eprintln!("{} messages", dialog.messages.len());
            }
            ChatInput::Message(text) => {
                let request = TurnRequest::builder()
                    .text(text)
                    .maybe_tools(tools.clone())
                    .build();
                run_turn(&controller, request).await;
                dialog.messages = list.snapshot();
                dialog = manager.save_snapshot(&dialog)?;
            }
        }
    }
    persist_on_exit(&manager, &mut dialog, &list)
}

fn persist_on_exit(manager: &DialogManager, dialog: &mut Dialog, list: &MessageList) -> Result<()> {
    dialog.messages = list.snapshot();
    *dialog = manager.save_snapshot(dialog)?;
    Ok(())
}

/// Run one turn, printing answer text to stdout and everything else to
/// stderr. Ctrl-C cancels the turn.
async fn run_turn(controller: &TurnController, request: TurnRequest) {
    let mut handle = controller.start(request);
    if let Some(mut events) = handle.events() {
        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else { break };
                    print_event(&event);
                }
                _ = tokio::signal::ctrl_c() => {
                    handle.cancel();
                }
            }
        }
    }

    let outcome = handle.wait().await;
    println!();
    match outcome.state {
        TurnState::Cancelled => eprintln!("(canceled)"),
        TurnState::Failed => eprintln!(
            "(failed: {})",
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
        _ => {}
    }
}

fn print_event(event: &TurnEvent) {
    match event {
        TurnEvent::AnswerDelta { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        TurnEvent::ThinkingDelta { text, done } => {
            eprint!("{text}");
            if *done {
                eprintln!();
            }
        }
        TurnEvent::ToolCallStarted {
            call_id, tool_name, ..
        } => eprintln!("\n[{call_id}] {tool_name}"),
        TurnEvent::ToolCallFinished {
            call_id, is_error, ..
        } => eprintln!("[{call_id}] {}", if *is_error { "error" } else { "done" }),
        TurnEvent::StateChanged { .. } => {}
    }
}
