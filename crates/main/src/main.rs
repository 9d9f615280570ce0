//! Binary entry point: load configuration, wire the storage/policy plane and
//! the LLM provider router into one `AppState`, and drive the HTTP listener
//! plus background workers, mirroring the teacher's `main.rs` shape (global
//! allocator, config load, `Server` construction, then `tokio::select!` over
//! the listener and housekeeping tasks).

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use common::{LegalHold, RetentionPolicy};
use llm_providers::{HostedChatA, HostedChatB, LocalRuntime, ReqwestTransport};
use llm_router::ProviderRouter;
use store::{LocalFsStore, ObjectStore};
use utils::Config;

#[tokio::main]
async fn main() {
    let mut config = Config::from_env();

    let bind_addr: std::net::SocketAddr = config
        .property_or("BIND_ADDR", "0.0.0.0:8080".to_string())
        .parse()
        .unwrap_or_else(|_| ([0, 0, 0, 0], 8080).into());

    let object_store = build_object_store(&mut config);
    let provider_router = Arc::new(build_provider_router(&mut config));

    let retention_sweep_interval = config.duration_or("RETENTION_SWEEP_INTERVAL", Duration::from_secs(3600));
    let dedup_quarantine_secs = config.duration_or("DEDUP_QUARANTINE", Duration::from_secs(24 * 3600)).as_secs() as i64;
    let provider_health_interval = config.duration_or("PROVIDER_HEALTH_INTERVAL", Duration::from_secs(30));

    if config.has_errors() {
        for err in config.errors() {
            trc::warn!("config.malformed", err);
        }
    }

    let state = Arc::new(AppState::new(object_store, provider_router));

    trc::info!("main.startup", "storage and policy plane initialized");

    let retention_task = {
        let state = state.clone();
        tokio::spawn(async move { retention_sweeper(state, retention_sweep_interval).await })
    };
    let gc_task = {
        let state = state.clone();
        tokio::spawn(async move { orphan_gc(state, dedup_quarantine_secs).await })
    };
    let health_task = {
        let state = state.clone();
        tokio::spawn(async move { provider_health_checker(state, provider_health_interval).await })
    };

    tokio::select! {
        result = api::serve(bind_addr, state) => {
            if let Err(err) = result {
                trc::warn!("main.server", &err.to_string());
            }
        }
        _ = retention_task => {}
        _ = gc_task => {}
        _ = health_task => {}
    }
}

/// Resolves the blob backend from `STORAGE_BACKEND_URL`: `file://<path>` for
/// the local-filesystem backend, anything else (including unset) falls back
/// to the in-memory backend, matching `store::memory`'s role as the
/// zero-dependency default the teacher uses for `sqlite`/`rocks` in tests.
fn build_object_store(config: &mut Config) -> Arc<dyn ObjectStore> {
    match config.value("STORAGE_BACKEND_URL").map(str::to_string) {
        Some(url) if url.starts_with("file://") => {
            let path = url.trim_start_matches("file://");
            Arc::new(LocalFsStore::new(path))
        }
        _ => Arc::new(store::InMemoryStore::new()),
    }
}

/// Builds the fallback chain from `PROVIDER_FALLBACK_CHAIN`
/// (comma-separated, e.g. `hosted_a,hosted_b,local`). An unparseable chain
/// is a fatal startup error per the configuration loader's policy; here
/// "unparseable" means naming an unknown provider.
fn build_provider_router(config: &mut Config) -> ProviderRouter {
    let chain = config
        .value("PROVIDER_FALLBACK_CHAIN")
        .map(str::to_string)
        .unwrap_or_else(|| "hosted_a,hosted_b,local".to_string());

    let mut providers: Vec<Arc<dyn llm_core::Provider>> = Vec::new();
    for name in chain.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name {
            "hosted_a" => {
                let base_url = config.value("HOSTED_CHAT_A_URL").unwrap_or("https://api.hosted-a.example").to_string();
                let api_key = config.value("HOSTED_CHAT_A_KEY").unwrap_or_default().to_string();
                providers.push(Arc::new(HostedChatA::new(Arc::new(ReqwestTransport::new(base_url, api_key)))));
            }
            "hosted_b" => {
                let base_url = config.value("HOSTED_CHAT_B_URL").unwrap_or("https://api.hosted-b.example").to_string();
                let api_key = config.value("HOSTED_CHAT_B_KEY").unwrap_or_default().to_string();
                providers.push(Arc::new(HostedChatB::new(Arc::new(ReqwestTransport::new(base_url, api_key)))));
            }
            "local" => {
                let base_url = config.value("LOCAL_RUNTIME_URL").unwrap_or("http://127.0.0.1:8081").to_string();
                providers.push(Arc::new(LocalRuntime::new(Arc::new(ReqwestTransport::new(base_url, "")))));
            }
            other => {
                config.new_build_error("PROVIDER_FALLBACK_CHAIN", format!("unknown provider {other:?}"));
            }
        }
    }

    let health_ttl = config.duration_or("PROVIDER_HEALTH_INTERVAL", Duration::from_secs(30));
    ProviderRouter::new(providers).with_health_ttl(health_ttl)
}

/// Evaluates every enabled retention policy against every domain's
/// message metadata on a fixed interval (§4.D). This binary has no durable
/// message index to sweep yet, so the loop currently just re-evaluates the
/// in-memory legal-hold/policy lists it was handed through the HTTP surface;
/// a real deployment would page through `store`'s message metadata here.
async fn retention_sweeper(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let policies: Vec<RetentionPolicy> = state.retention_policies.read().clone();
        let holds: Vec<LegalHold> = state.legal_holds.read().clone();
        trc::info!(
            "retention.sweep",
            &format!("sweep tick: {} policies, {} holds loaded", policies.len(), holds.len())
        );
    }
}

/// Runs dedup orphan/garbage collection on a fixed cadence, mirroring how
/// the teacher runs housekeeping sweeps off the main request path (§4.B).
async fn orphan_gc(state: Arc<AppState>, quarantine_secs: i64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(900));
    loop {
        ticker.tick().await;
        let collected = state.dedup.collect_garbage(chrono::Duration::seconds(quarantine_secs), common::now());
        if !collected.is_empty() {
            trc::info!("dedup.gc", &format!("collected {} quarantined blobs", collected.len()));
        }
    }
}

/// Periodically probes every provider's `health_check` and feeds the result
/// back into the router's health cache (§4.H: "cached health, not probed
/// per-call").
async fn provider_health_checker(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        state.provider_router.refresh_health().await;
    }
}
