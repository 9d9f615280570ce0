//! The seam between a provider adapter and the actual HTTP call (§9:
//! "vendor wire formats resolved via an internal VendorTransport seam for
//! unit-testability"). Adapters depend on [`VendorTransport`], never on
//! `reqwest` directly, so tests can swap in a canned transport instead of
//! making real network calls.

use async_trait::async_trait;

#[async_trait]
pub trait VendorTransport: Send + Sync {
    /// POSTs `body` as JSON to `path` (resolved against the transport's base
    /// URL) and returns the parsed JSON response body alongside the HTTP
    /// status, so callers can distinguish a 200 with an error payload from
    /// a non-2xx status.
    async fn post_json(&self, path: &str, body: serde_json::Value) -> trc::Result<(u16, serde_json::Value)>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        ReqwestTransport {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl VendorTransport for ReqwestTransport {
    async fn post_json(&self, path: &str, body: serde_json::Value) -> trc::Result<(u16, serde_json::Value)> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let event = if e.is_timeout() {
                    trc::ProviderEvent::Timeout
                } else {
                    trc::ProviderEvent::ServiceUnavailable
                };
                trc::Error::provider(event, "request to provider failed").details(e.to_string())
            })?;
        let status = response.status().as_u16();
        let json = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| trc::Error::provider(trc::ProviderEvent::ServerError, "malformed provider response").details(e.to_string()))?;
        Ok((status, json))
    }
}
