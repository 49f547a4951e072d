//! Turn controller: drives one user turn across model rounds and tool calls.
//!
//! A turn streams each round into the [`ChunkQueue`](crate::queue::ChunkQueue),
//! runs declared tool calls sequentially against a
//! [`ToolExecutor`](crate::tools::ToolExecutor), and repeats until a round
//! declares no tool calls. Cancellation is one token per turn; a user cancel
//! restores the message list to its pre-turn snapshot.

mod controller;
mod engine;
mod events;
mod types;

pub use controller::{TurnController, TurnHandle, TurnRequest};
pub use events::TurnEvent;
pub use types::{TurnOutcome, TurnState};
