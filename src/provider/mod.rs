//! Chat client trait and the NDJSON streaming implementation.

pub mod http;
pub mod ndjson;
pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::ParleyError;
use crate::types::{ChatChunk, ChatRequest};

/// Ordered stream of decoded chunks for one model round.
///
/// The stream ends after the first chunk with `done == true` or the first
/// error. Errors are terminal: nothing follows an `Err` item.
pub type ChunkStream = BoxStream<'static, Result<ChatChunk, ParleyError>>;

/// Core trait implemented by model endpoints.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Client name, for logging.
    fn name(&self) -> &str;

    /// Open one chat request and return its chunk stream.
    ///
    /// Returns [`ParleyError::Canceled`] without issuing a request when
    /// `cancel` is already set; a cancellation observed mid-stream ends the
    /// stream with the same error.
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, ParleyError>;
}
