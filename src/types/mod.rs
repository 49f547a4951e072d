//! Core types for parley.

pub mod chat;
pub mod dialog;
pub mod id;
pub mod message;

pub use chat::*;
pub use dialog::*;
pub use message::*;
