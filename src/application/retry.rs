use crate::domain::ports::{GatewayResult, WorkflowStep};
use crate::error::{PaymentError, Result};
use std::future::Future;
use std::time::Duration;

/// Bounded retry for transient provider failures.
///
/// `max_attempts` counts every call, the first one included. The wait before
/// retry `n` is `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, step: WorkflowStep, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(source) if !source.is_transient() => {
                    return Err(PaymentError::Gateway { step, source });
                }
                Err(source) if attempt >= self.max_attempts => {
                    return Err(PaymentError::TransientExhausted {
                        step,
                        attempts: attempt,
                        source,
                    });
                }
                Err(source) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        step = %step,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %source,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
