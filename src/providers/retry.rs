//! Shared retry helpers for LLM providers.
//!
//! Provides backoff configurations and a rate-limit-aware delay adjuster
//! for use with `backon::Retryable`.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::errors::ProviderError;

/// Standard backoff: 1s → 2s → 4s … capped at 30s, with jitter.
///
/// `max_times` comes from `llm.retries` in the config; 0 disables retries.
pub fn provider_backoff(max_times: usize) -> ExponentialBuilder {
    ExponentialBuilder::new()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(30))
        .with_factor(2.0)
        .with_jitter()
        .with_max_times(max_times)
}

/// If the error is `RateLimited`, ensure the delay is at least `retry_after_ms`.
///
/// Signature matches `backon::Retry::adjust`: returning `None` aborts the retry.
pub fn adjust_for_rate_limit(err: &ProviderError, dur: Option<Duration>) -> Option<Duration> {
    match (err, dur) {
        (ProviderError::RateLimited { retry_after_ms, .. }, Some(d)) => {
            let rate_limit_delay = Duration::from_millis(*retry_after_ms);
            Some(d.max(rate_limit_delay))
        }
        (_, dur) => dur,
    }
}
