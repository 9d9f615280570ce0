//! Adapter for the second hosted chat vendor. Deliberately uses a different
//! wire shape (`prompt_messages`/`output`) than [`crate::hosted_chat_a`] so
//! the router's fallback chain is exercised across genuinely different
//! response parsing, not two copies of the same adapter.

use crate::error_mapping::map_vendor_error;
use crate::transport::VendorTransport;
use async_trait::async_trait;
use llm_core::{
    ChatRole, CompletionChunk, CompletionRequest, CompletionResponse, CompletionStream, EmbeddingRequest, EmbeddingResponse, Provider,
    Usage,
};
use std::sync::Arc;

pub struct HostedChatB {
    transport: Arc<dyn VendorTransport>,
}

impl HostedChatB {
    pub fn new(transport: Arc<dyn VendorTransport>) -> Self {
        HostedChatB { transport }
    }
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "human",
        ChatRole::Assistant => "ai",
    }
}

#[async_trait]
impl Provider for HostedChatB {
    fn name(&self) -> &str {
        "hosted-chat-b"
    }

    async fn complete(&self, request: CompletionRequest) -> trc::Result<CompletionResponse> {
        let body = serde_json::json!({
            "model": request.model,
            "prompt_messages": request.messages.iter().map(|m| serde_json::json!({
                "speaker": role_str(m.role),
                "text": m.content,
            })).collect::<Vec<_>>(),
            "max_output_tokens": request.max_tokens,
        });
        let (status, json) = self.transport.post_json("/chat/generate", body).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        let content = json["output"]["text"].as_str().unwrap_or_default().to_string();
        let finish_reason = json["output"]["stop_reason"].as_str().unwrap_or("stop").to_string();
        Ok(CompletionResponse {
            model: request.model,
            content,
            finish_reason,
            usage: Usage {
                prompt_tokens: json["token_usage"]["input"].as_u64().unwrap_or(0) as u32,
                completion_tokens: json["token_usage"]["output"].as_u64().unwrap_or(0) as u32,
                total_tokens: json["token_usage"]["input"].as_u64().unwrap_or(0) as u32
                    + json["token_usage"]["output"].as_u64().unwrap_or(0) as u32,
            },
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> trc::Result<CompletionStream> {
        let response = self.complete(request).await?;
        let (cancel_tx, mut cancel_rx) = tokio::sync::oneshot::channel();
        let stream = async_stream::stream! {
            if cancel_rx.try_recv().is_ok() {
                return;
            }
            yield Ok(CompletionChunk { delta: response.content, finish_reason: Some(response.finish_reason) });
        };
        Ok(CompletionStream::new(Box::pin(stream), cancel_tx))
    }

    async fn embed(&self, request: EmbeddingRequest) -> trc::Result<EmbeddingResponse> {
        let body = serde_json::json!({ "model": request.model, "texts": request.input });
        let (status, json) = self.transport.post_json("/embeddings/generate", body).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        let embeddings = json["vectors"]
            .as_array()
            .map(|items| items.iter().map(|v| v.as_array().map(|f| f.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect()).unwrap_or_default()).collect())
            .unwrap_or_default();
        Ok(EmbeddingResponse {
            model: request.model,
            embeddings,
            usage: Usage::default(),
        })
    }

    async fn health_check(&self) -> trc::Result<()> {
        let (status, json) = self.transport.post_json("/status", serde_json::json!({})).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        Ok(())
    }
}
