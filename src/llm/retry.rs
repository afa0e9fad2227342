use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;

use super::LlmError;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all; used by tests and one-shot tooling.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub(crate) fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);

        let mut delay_ms = base_delay.min(self.max_delay.as_millis() as f64);

        // ±25%
        if self.jitter {
            let jitter_range = delay_ms * 0.25;
            let jitter = (unit_noise() * 2.0 - 1.0) * jitter_range;
            delay_ms = (delay_ms + jitter).max(0.0);
        }

        Duration::from_millis(delay_ms as u64)
    }
}

/// Cheap value in [0, 1) from the clock; good enough to spread retries.
fn unit_noise() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Classify an error from a provider call.
pub fn is_retryable_error(error: &anyhow::Error) -> RetryDecision {
    if let Some(llm) = error.downcast_ref::<LlmError>() {
        return if llm.is_transient() {
            RetryDecision::Retry
        } else {
            RetryDecision::NoRetry
        };
    }

    if let Some(http) = error.downcast_ref::<reqwest::Error>() {
        if http.is_timeout() || http.is_connect() {
            return RetryDecision::Retry;
        }
        if let Some(status) = http.status() {
            return if status.as_u16() == 429 || status.is_server_error() {
                RetryDecision::Retry
            } else {
                RetryDecision::NoRetry
            };
        }
        return RetryDecision::NoRetry;
    }

    let error_str = error.to_string().to_lowercase();
    let transient = ["timeout", "rate limit", "temporarily unavailable", "overloaded"];
    if transient.iter().any(|p| error_str.contains(p)) {
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Execute an async operation with retry logic
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_retries {
                    return Err(e);
                }
                if is_retryable_error(&e) == RetryDecision::NoRetry {
                    tracing::debug!("Permanent error, not retrying: {}", e);
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempt + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
