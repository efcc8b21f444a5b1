use crate::error::{DriverError, RetryError};
use std::future::Future;
use std::time::Duration;

/// Bounded retry with exponential backoff for flaky page interactions.
///
/// An operation gets one initial try plus `max_retries` retries. Only
/// errors the driver classifies as retryable are retried; anything else
/// short-circuits as [`RetryError::Fatal`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Create a policy with the given budget and backoff shape
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_factor,
        }
    }

    /// Runs `op` until it succeeds or the budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
    {
        self.run_inner(label, op, None::<fn() -> NoRecovery>).await
    }

    /// Runs `op` like [`RetryPolicy::run`], invoking `recovery` after
    /// each backoff sleep. A failed recovery is logged and the next
    /// attempt proceeds anyway.
    pub async fn run_with_recovery<T, F, Fut, R, RFut>(
        &self,
        label: &str,
        op: F,
        recovery: R,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
        R: FnMut() -> RFut,
        RFut: Future<Output = Result<(), DriverError>>,
    {
        self.run_inner(label, op, Some(recovery)).await
    }

    async fn run_inner<T, F, Fut, R, RFut>(
        &self,
        label: &str,
        mut op: F,
        mut recovery: Option<R>,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
        R: FnMut() -> RFut,
        RFut: Future<Output = Result<(), DriverError>>,
    {
        let attempts = self.max_retries.saturating_add(1);
        let mut last: Option<DriverError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.delay_before_retry(attempt - 1);
                ::log::debug!(
                    "{}: retrying ({}/{}) after {:.1}s",
                    label,
                    attempt,
                    self.max_retries,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;

                if let Some(rec) = recovery.as_mut() {
                    if let Err(e) = rec().await {
                        ::log::warn!("{}: recovery step failed: {}", label, e);
                    }
                }
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    ::log::warn!(
                        "{}: attempt {} of {} failed: {}",
                        label,
                        attempt + 1,
                        attempts,
                        e
                    );
                    last = Some(e);
                }
                Err(e) => return Err(RetryError::Fatal(e)),
            }
        }

        Err(RetryError::Exhausted {
            attempts,
            last: last
                .unwrap_or_else(|| DriverError::Command(format!("{label} was never attempted"))),
        })
    }

    /// Backoff before retry number `retry_index` (zero-based).
    fn delay_before_retry(&self, retry_index: u32) -> Duration {
        self.initial_delay
            .mul_f64(self.backoff_factor.powi(retry_index as i32))
    }
}

/// Stand-in future type for the recovery-free variant
type NoRecovery = std::future::Ready<Result<(), DriverError>>;
