//! Retry with exponential backoff and jitter for model calls.
//!
//! Only transport-class failures retry (5xx, 408/429, network, timeout).
//! Other 4xx and payload problems surface immediately. An overall
//! max-elapsed bound caps the whole attempt sequence independently of any
//! per-attempt timeout.

use std::future::Future;
use std::time::Instant;

use rand::Rng;
use tokio::time::{sleep, Duration};

use crate::errors::{EngineError, TransportKind};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
    pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 250,
            max_delay_ms: 8_000,
            jitter_factor: 0.3,
            max_elapsed_ms: 45_000,
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((clamped + jitter).max(0.0) as u64)
    }
}

pub fn is_retryable(err: &EngineError) -> bool {
    match err {
        EngineError::Transport { kind, .. } => matches!(
            kind,
            TransportKind::Network
                | TransportKind::Timeout
                | TransportKind::RateLimited
                | TransportKind::Server
        ),
        _ => false,
    }
}

/// Retry a fallible async operation. Non-retryable errors and the elapsed
/// bound both end the sequence with the last error.
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let started = Instant::now();
    let mut last_error: Option<EngineError> = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                if attempt < config.max_retries {
                    let delay = config.delay_for_attempt(attempt);
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    if elapsed_ms + delay.as_millis() as u64 > config.max_elapsed_ms {
                        return Err(e);
                    }
                    eprintln!(
                        "[retry] {} attempt {}/{} failed: {}. Retrying in {:?}",
                        operation_name,
                        attempt + 1,
                        config.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(EngineError::Transport {
        kind: TransportKind::Other,
        detail: "retry exhausted without error".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transport(kind: TransportKind) -> EngineError {
        EngineError::Transport {
            kind,
            detail: "test".to_string(),
        }
    }

    #[test]
    fn delay_doubles_then_clamps() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 400,
            jitter_factor: 0.0,
            max_elapsed_ms: 60_000,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn only_transport_class_failures_retry() {
        assert!(is_retryable(&transport(TransportKind::Server)));
        assert!(is_retryable(&transport(TransportKind::RateLimited)));
        assert!(is_retryable(&transport(TransportKind::Timeout)));
        assert!(!is_retryable(&transport(TransportKind::Auth)));
        assert!(!is_retryable(&transport(TransportKind::Other)));
        assert!(!is_retryable(&EngineError::Validation("bad json".into())));
    }

    #[tokio::test]
    async fn eventual_success_after_server_errors() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter_factor: 0.0,
            max_elapsed_ms: 60_000,
        };
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = retry_async(&config, "test", || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transport(TransportKind::Server))
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let config = RetryConfig {
            base_delay_ms: 1,
            ..Default::default()
        };
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result: Result<u32, _> = retry_async(&config, "test", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(transport(TransportKind::Auth))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
