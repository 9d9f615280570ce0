//! Adapter for a locally-hosted inference runtime (e.g. a self-hosted model
//! server reachable on the local network). No API key, and no streaming
//! support — callers that need streaming should list this provider after a
//! hosted one in the fallback chain.

use crate::error_mapping::map_vendor_error;
use crate::transport::VendorTransport;
use async_trait::async_trait;
use llm_core::{CompletionRequest, CompletionResponse, CompletionStream, EmbeddingRequest, EmbeddingResponse, Provider, Usage};
use std::sync::Arc;

pub struct LocalRuntime {
    transport: Arc<dyn VendorTransport>,
}

impl LocalRuntime {
    pub fn new(transport: Arc<dyn VendorTransport>) -> Self {
        LocalRuntime { transport }
    }
}

#[async_trait]
impl Provider for LocalRuntime {
    fn name(&self) -> &str {
        "local-runtime"
    }

    async fn complete(&self, request: CompletionRequest) -> trc::Result<CompletionResponse> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        let body = serde_json::json!({
            "model": request.model,
            "prompt": prompt,
            "n_predict": request.max_tokens,
        });
        let (status, json) = self.transport.post_json("/completion", body).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        let content = json["content"].as_str().unwrap_or_default().to_string();
        Ok(CompletionResponse {
            model: request.model,
            content,
            finish_reason: if json["stop"].as_bool().unwrap_or(true) { "stop".into() } else { "length".into() },
            usage: Usage {
                prompt_tokens: json["tokens_evaluated"].as_u64().unwrap_or(0) as u32,
                completion_tokens: json["tokens_predicted"].as_u64().unwrap_or(0) as u32,
                total_tokens: json["tokens_evaluated"].as_u64().unwrap_or(0) as u32 + json["tokens_predicted"].as_u64().unwrap_or(0) as u32,
            },
        })
    }

    async fn complete_stream(&self, _request: CompletionRequest) -> trc::Result<CompletionStream> {
        Err(trc::Error::provider(trc::ProviderEvent::Unsupported, "local runtime does not support streaming completions"))
    }

    async fn embed(&self, request: EmbeddingRequest) -> trc::Result<EmbeddingResponse> {
        let body = serde_json::json!({ "model": request.model, "content": request.input });
        let (status, json) = self.transport.post_json("/embedding", body).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        let embeddings = json["embedding"]
            .as_array()
            .map(|v| vec![v.iter().filter_map(|f| f.as_f64()).map(|f| f as f32).collect()])
            .unwrap_or_default();
        Ok(EmbeddingResponse {
            model: request.model,
            embeddings,
            usage: Usage::default(),
        })
    }

    async fn health_check(&self) -> trc::Result<()> {
        let (status, json) = self.transport.post_json("/health", serde_json::json!({})).await?;
        if status >= 300 {
            return Err(map_vendor_error(status, &json));
        }
        Ok(())
    }
}
