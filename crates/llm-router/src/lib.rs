//! Provider routing with health-aware fallback (§4.H). The router tries
//! providers in priority order, skipping any the health cache currently
//! marks unhealthy, retries a provider's own transient failures with
//! exponential backoff, and falls through to the next provider on a fatal
//! one — cancellation is checked before every attempt, not just once at the
//! top.

use llm_core::{CompletionRequest, CompletionResponse, Provider};
use std::sync::Arc;
use std::time::Duration;
use utils::cache::CacheWithTtl;

const DEFAULT_HEALTH_TTL: Duration = Duration::from_secs(30);
const DEFAULT_MAX_ATTEMPTS_PER_PROVIDER: u32 = 3;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(200);

pub struct ProviderRouter {
    providers: Vec<Arc<dyn Provider>>,
    health: CacheWithTtl<String, bool>,
    health_ttl: Duration,
    max_attempts_per_provider: u32,
    base_backoff: Duration,
}

impl ProviderRouter {
    /// `providers` is the fallback chain in priority order: index 0 is
    /// tried first.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        ProviderRouter {
            providers,
            health: CacheWithTtl::new(),
            health_ttl: DEFAULT_HEALTH_TTL,
            max_attempts_per_provider: DEFAULT_MAX_ATTEMPTS_PER_PROVIDER,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }

    pub fn with_health_ttl(mut self, ttl: Duration) -> Self {
        self.health_ttl = ttl;
        self
    }

    pub fn with_max_attempts_per_provider(mut self, attempts: u32) -> Self {
        self.max_attempts_per_provider = attempts;
        self
    }

    /// Records the outcome of an out-of-band health probe so routing
    /// decisions reflect it for `health_ttl`.
    pub fn record_health(&self, provider_name: &str, healthy: bool) {
        self.health.insert_with_ttl(provider_name.to_string(), healthy, self.health_ttl);
    }

    /// Probes every provider's `health_check` out of band and refreshes the
    /// health cache, the way a background task keeps routing decisions off
    /// the request path (§4.H).
    pub async fn refresh_health(&self) {
        for provider in &self.providers {
            let healthy = provider.health_check().await.is_ok();
            self.record_health(provider.name(), healthy);
        }
    }

    fn is_healthy(&self, provider_name: &str) -> bool {
        // Absent an entry, a provider is assumed healthy until proven
        // otherwise — the cache only ever suppresses known-bad providers.
        self.health.get(&provider_name.to_string()).unwrap_or(true)
    }

    /// Runs `request` against the fallback chain, retrying each provider's
    /// transient errors with jittered backoff before moving to the next
    /// provider. `cancel` fires when the caller gives up; it's checked
    /// before every attempt, including between providers.
    pub async fn complete_with_fallback(
        &self,
        request: CompletionRequest,
        mut cancel: tokio::sync::oneshot::Receiver<()>,
    ) -> trc::Result<CompletionResponse> {
        let mut last_err: Option<trc::Error> = None;
        for provider in &self.providers {
            if !self.is_healthy(provider.name()) {
                continue;
            }
            for attempt in 0..self.max_attempts_per_provider {
                if cancel.try_recv().is_ok() {
                    return Err(trc::Error::cancelled());
                }
                let outcome = tokio::select! {
                    biased;
                    _ = &mut cancel => return Err(trc::Error::cancelled()),
                    result = provider.complete(request.clone()) => result,
                };
                match outcome {
                    Ok(response) => return Ok(response),
                    Err(err) if err.retryable() && attempt + 1 < self.max_attempts_per_provider => {
                        self.record_health(provider.name(), true);
                        let delay = utils::backoff::exponential_with_jitter(self.base_backoff, attempt, 0.25);
                        tokio::select! {
                            biased;
                            _ = &mut cancel => return Err(trc::Error::cancelled()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        last_err = Some(err);
                    }
                    Err(err) => {
                        if !err.retryable() {
                            self.record_health(provider.name(), false);
                        }
                        last_err = Some(err);
                        break;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            trc::Error::new(trc::Kind::ProviderUnavailable, trc::EventType::Provider(trc::ProviderEvent::ServiceUnavailable), "no providers configured")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm_core::{ChatMessage, ChatRole, CompletionChunk, CompletionStream, EmbeddingRequest, EmbeddingResponse, Usage};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        name: &'static str,
        fail_times: AtomicU32,
        fatal: bool,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _request: CompletionRequest) -> trc::Result<CompletionResponse> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return if self.fatal {
                    Err(trc::Error::provider(trc::ProviderEvent::AuthenticationError, "bad key"))
                } else {
                    Err(trc::Error::provider(trc::ProviderEvent::RateLimited, "slow down"))
                };
            }
            Ok(CompletionResponse {
                model: "m".into(),
                content: format!("ok from {}", self.name),
                finish_reason: "stop".into(),
                usage: Usage::default(),
            })
        }

        async fn complete_stream(&self, _request: CompletionRequest) -> trc::Result<CompletionStream> {
            unimplemented!()
        }

        async fn embed(&self, _request: EmbeddingRequest) -> trc::Result<EmbeddingResponse> {
            unimplemented!()
        }

        async fn health_check(&self) -> trc::Result<()> {
            Ok(())
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage { role: ChatRole::User, content: "hi".into() }],
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_before_succeeding() {
        let provider = Arc::new(FlakyProvider { name: "p1", fail_times: AtomicU32::new(2), fatal: false });
        let router = ProviderRouter::new(vec![provider]);
        let (_tx, rx) = tokio::sync::oneshot::channel();
        let response = router.complete_with_fallback(request(), rx).await.unwrap();
        assert_eq!(response.content, "ok from p1");
    }

    #[tokio::test]
    async fn fatal_error_falls_through_to_next_provider_without_retrying() {
        let failing = Arc::new(FlakyProvider { name: "p1", fail_times: AtomicU32::new(99), fatal: true });
        let backup = Arc::new(FlakyProvider { name: "p2", fail_times: AtomicU32::new(0), fatal: false });
        let router = ProviderRouter::new(vec![failing, backup]);
        let (_tx, rx) = tokio::sync::oneshot::channel();
        let response = router.complete_with_fallback(request(), rx).await.unwrap();
        assert_eq!(response.content, "ok from p2");
    }

    #[tokio::test]
    async fn cancellation_short_circuits_before_any_attempt() {
        let provider = Arc::new(FlakyProvider { name: "p1", fail_times: AtomicU32::new(0), fatal: false });
        let router = ProviderRouter::new(vec![provider]);
        let (tx, rx) = tokio::sync::oneshot::channel();
        tx.send(()).unwrap();
        let err = router.complete_with_fallback(request(), rx).await.unwrap_err();
        assert_eq!(err.kind, trc::Kind::Cancelled);
    }

    #[tokio::test]
    async fn unhealthy_providers_are_skipped() {
        let unhealthy = Arc::new(FlakyProvider { name: "p1", fail_times: AtomicU32::new(99), fatal: true });
        let backup = Arc::new(FlakyProvider { name: "p2", fail_times: AtomicU32::new(0), fatal: false });
        let router = ProviderRouter::new(vec![unhealthy, backup]);
        router.record_health("p1", false);
        let (_tx, rx) = tokio::sync::oneshot::channel();
        let response = router.complete_with_fallback(request(), rx).await.unwrap();
        assert_eq!(response.content, "ok from p2");
    }
}
