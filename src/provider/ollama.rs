//! Ollama-style `/api/chat` client (NDJSON streaming with a single-response
//! fallback).

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ParleyConfig;
use crate::error::ParleyError;
use crate::types::{ChatChunk, ChatRequest, ChatResponse};
use crate::util::cache::{ClientCache, ClientKey};
use crate::util::retry::RetryPolicy;

use super::http::{build_client, json_headers, status_to_error};
use super::ndjson::NdjsonDecoder;
use super::{ChatClient, ChunkStream};

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl OllamaClient {
    /// Create a client for the configured endpoint, reusing a cached HTTP
    /// client when the endpoint and credential are unchanged.
    pub fn new(config: &ParleyConfig, cache: &ClientCache) -> Result<Self, ParleyError> {
        let key = ClientKey::new(&config.base_url, config.api_key.as_deref());
        let client = cache.get_or_build(&key, build_client)?;
        Ok(Self {
            client,
            base_url: key.base_url().to_string(),
            api_key: config.api_key.clone(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Send the request and check the status. Retried only until a response
    /// with a success status arrives; nothing has been consumed at that point.
    async fn open(&self, request: &ChatRequest) -> Result<reqwest::Response, ParleyError> {
        let url = self.chat_url();
        let url = url.as_str();
        self.retry
            .execute(|| async move {
                let resp = self
                    .client
                    .post(url)
                    .headers(json_headers(self.api_key.as_deref()))
                    .json(request)
                    .send()
                    .await?;
                let status = resp.status().as_u16();
                if !(200..300).contains(&status) {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(status_to_error(status, &body));
                }
                Ok(resp)
            })
            .await
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<ChatResponse, ParleyError> {
        let resp = self.open(request).await?;
        let bytes = resp.bytes().await?;
        let response: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ParleyError::Protocol(format!("malformed response: {e}")))?;
        if let Some(error) = response.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return Err(ParleyError::Protocol(error.to_string()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, ParleyError> {
        if cancel.is_cancelled() {
            return Err(ParleyError::Canceled);
        }

        debug!(
            model = %request.model,
            stream = request.stream,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "ollama chat request"
        );

        if !request.stream {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ParleyError::Canceled),
                response = self.chat_once(request) => response?,
            };
            let chunks = response.into_chunks();
            return Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed());
        }

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ParleyError::Canceled),
            resp = self.open(request) => resp?,
        };

        let byte_stream = resp.bytes_stream();
        let cancel = cancel.clone();

        let stream = async_stream::stream! {
            let mut decoder = NdjsonDecoder::new();
            futures::pin_mut!(byte_stream);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        yield Err(ParleyError::Canceled);
                        return;
                    }
                    next = byte_stream.next() => next,
                };

                match next {
                    Some(Ok(bytes)) => {
                        for item in decoder.push(&bytes) {
                            let terminal = is_terminal(&item);
                            yield item;
                            if terminal {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield Err(ParleyError::Network(e));
                        return;
                    }
                    None => {
                        if let Some(item) = decoder.finish() {
                            yield item;
                        }
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn is_terminal(item: &Result<ChatChunk, ParleyError>) -> bool {
    match item {
        Ok(chunk) => chunk.done,
        Err(_) => true,
    }
}
