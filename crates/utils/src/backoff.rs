//! Exponential backoff with jitter, shared by `llm-router` (§4.H retry loop)
//! and the job workers (§4.E bounded transient-error retries).

use std::time::Duration;

use rand::Rng;

/// `delay = base * 2^attempt + uniform(0, delay * jitter_pct)`, per §4.H.
///
/// `attempt` is zero-based: the first retry passes `attempt = 0`.
pub fn exponential_with_jitter(base: Duration, attempt: u32, jitter_pct: f64) -> Duration {
    let exp = base.as_millis().saturating_mul(1u128 << attempt.min(20));
    let jitter_max = (exp as f64 * jitter_pct).max(0.0) as u64;
    let jitter = if jitter_max == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_max)
    };
    Duration::from_millis(exp as u64 + jitter)
}
