//! Render batching: the shared message list and the chunk queue feeding it.

mod chunk;
mod list;

pub use chunk::ChunkQueue;
pub use list::MessageList;
