//! Parley: turn orchestration for a tool-calling chat client.
//!
//! One user turn may span several model rounds: the answer streams in as
//! newline-delimited JSON, the model may pause to request tool calls, and the
//! user may cancel at any point. Parley keeps that turn correct while the
//! visible message list updates at frame cadence instead of once per token.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use parley::prelude::*;
//!
//! # async fn example() -> parley::error::Result<()> {
//! let config = ParleyConfig::load()?;
//! let cache = ClientCache::new();
//! let client = Arc::new(OllamaClient::new(&config, &cache)?);
//!
//! let list = MessageList::new();
//! let queue = ChunkQueue::from_config(list.clone(), &config);
//! let controller = TurnController::new(config, client, queue);
//!
//! let outcome = controller
//!     .run(TurnRequest::builder().text("Hello!").build())
//!     .await;
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialog;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod queue;
pub mod tools;
pub mod turn;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
