//! The provider abstraction (§4.G): every LLM backend — hosted or local —
//! implements [`Provider`] the same way, so the router and callers never
//! branch on which vendor is in play.

use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    pub content: String,
    pub finish_reason: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompletionChunk {
    pub delta: String,
    pub finish_reason: Option<String>,
}

/// A streaming completion in progress. `close` propagates cancellation to
/// the provider adapter producing chunks (§4.G: "cancellation must stop the
/// upstream request, not just stop reading from it").
pub struct CompletionStream {
    inner: Pin<Box<dyn Stream<Item = trc::Result<CompletionChunk>> + Send>>,
    cancel: tokio::sync::oneshot::Sender<()>,
}

impl CompletionStream {
    pub fn new(
        inner: Pin<Box<dyn Stream<Item = trc::Result<CompletionChunk>> + Send>>,
        cancel: tokio::sync::oneshot::Sender<()>,
    ) -> Self {
        CompletionStream { inner, cancel }
    }

    pub fn into_inner(self) -> Pin<Box<dyn Stream<Item = trc::Result<CompletionChunk>> + Send>> {
        self.inner
    }

    /// Signals the producing task to stop; a no-op if it has already
    /// finished (the receiver may already be dropped).
    pub fn close(self) {
        let _ = self.cancel.send(());
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

pub type EmbeddingVector = Vec<f32>;

/// Also used for single-input requests — an `input` of length 1 yields an
/// `embeddings` vec of length 1, so callers never special-case batch size.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingResponse {
    pub model: String,
    pub embeddings: Vec<EmbeddingVector>,
    pub usage: Usage,
}

pub type BatchEmbeddingResponse = EmbeddingResponse;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> trc::Result<CompletionResponse>;

    async fn complete_stream(&self, request: CompletionRequest) -> trc::Result<CompletionStream>;

    async fn embed(&self, request: EmbeddingRequest) -> trc::Result<EmbeddingResponse>;

    /// A cheap liveness probe the router's health cache polls (§4.H).
    async fn health_check(&self) -> trc::Result<()>;
}
