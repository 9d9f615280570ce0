//! Adapter for the first hosted chat vendor. Request/response shapes are
//! intentionally generic (an OpenAI-style `messages`/`choices` payload) — it
//! stands in for whichever hosted provider a deployment actually wires up.

use crate::error_mapping::map_vendor_error;
use crate::transport::VendorTransport;
use async_trait::async_trait;
use llm_core::{
    ChatRole, CompletionChunk, CompletionRequest, CompletionResponse, CompletionStream, EmbeddingRequest, EmbeddingResponse, Provider,
    Usage,
};
use std::sync::Arc;

pub struct HostedChatA {
    transport: Arc<dyn VendorTransport>,
}

impl HostedChatA {
    pub fn new(transport: Arc<dyn VendorTransport>) -> Self {
        HostedChatA { transport }
    }
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

#[async_trait]
impl Provider for HostedChatA {
    fn name(&self) -> &str {
        "hosted-chat-a"
    }

    async fn complete(&self, request: CompletionRequest) -> trc::Result<CompletionResponse> {
        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages.iter().map(|m| serde_json::json!({
                "role": role_str(m.role),
                "content": m.content,
            })).collect::<Vec<_>>(),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        let (status, json) = self.transport.post_json("/v1/chat/completions", body).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        let content = json["choices"][0]["message"]["content"].as_str().unwrap_or_default().to_string();
        let finish_reason = json["choices"][0]["finish_reason"].as_str().unwrap_or("stop").to_string();
        Ok(CompletionResponse {
            model: request.model,
            content,
            finish_reason,
            usage: Usage {
                prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: json["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32,
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
        let body = serde_json::json!({ "model": request.model, "input": request.input });
        let (status, json) = self.transport.post_json("/v1/embeddings", body).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        let embeddings = json["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| item["embedding"].as_array().map(|v| v.iter().filter_map(|f| f.as_f64()).map(|f| f as f32).collect()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        Ok(EmbeddingResponse {
            model: request.model,
            embeddings,
            usage: Usage {
                prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: 0,
                total_tokens: json["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32,
            },
        })
    }

    async fn health_check(&self) -> trc::Result<()> {
        let (status, json) = self.transport.post_json("/v1/health", serde_json::json!({})).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        Ok(())
    }
}
