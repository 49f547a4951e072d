//! Convenience re-exports for common use.

pub use crate::config::ParleyConfig;
pub use crate::dialog::{DialogManager, DialogStore, FileDialogStore, MemoryDialogStore};
pub use crate::error::{ParleyError, Result};
pub use crate::provider::{ChatClient, OllamaClient};
pub use crate::queue::{ChunkQueue, MessageList};
pub use crate::tools::{
    AgentTool, AgentToolParameters, Tool, ToolArguments, ToolExecutor, ToolRegistry,
};
pub use crate::turn::{TurnController, TurnEvent, TurnOutcome, TurnRequest, TurnState};
pub use crate::types::{AssistantStage, Author, Dialog, Message};
pub use crate::util::cache::ClientCache;
