use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

/// Decides whether a failed task is worth running again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// How often and how patiently a task is re-run after a retryable failure.
///
/// A task runs at most `1 + retries` times. The wait before retry `n` is
/// `base_delay * 2^(n-1)`, capped at `max_delay`, plus up to `jitter`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    fn delay_before(&self, retry: u32) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
            .min(self.max_delay);

        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return backoff;
        }
        backoff + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Runs `task` until it succeeds, fails with a non-retryable error, or
    /// runs out of retries. Each attempt starts from scratch.
    pub async fn run<T, E, F, Fut>(&self, name: &str, mut task: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match task().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(task = name, attempt, "task succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt <= self.retries => {
                    let delay = self.delay_before(attempt);
                    warn!(
                        task = name,
                        attempt,
                        retries = self.retries,
                        delay_ms = delay.as_millis() as u64,
                        "task failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(task = name, attempt, "task failed: {err}");
                    return Err(err);
                }
            }
        }
    }
}
