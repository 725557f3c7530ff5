//! Retry Controller
//!
//! Bounded retry with randomized exponential backoff. After the `n`-th failed
//! attempt the controller waits `base ^ n` seconds, where `base` is drawn
//! uniformly from an integer range (default `[2, 5]`). The random base gives
//! jitter between sessions hammering the same rate-limited API.
//!
//! Randomness and sleeping are injected through [`BackoffBase`] and
//! [`Sleeper`] so tests run without real waiting.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Answer returned once every attempt failed transiently
pub const MAX_RETRIES_EXCEEDED: &str =
    "⚠️ Excedemos o número máximo de tentativas. Tente novamente mais tarde.";

/// Upper bound on `max_retries`; waits grow as `base ^ attempt` seconds
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Largest accepted backoff base
pub const BASE_MAX_LIMIT: u64 = 10;

/// Retry parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Smallest backoff base
    #[serde(default = "default_base_min")]
    pub base_min: u64,

    /// Largest backoff base
    #[serde(default = "default_base_max")]
    pub base_max: u64,
}

fn default_max_retries() -> u32 { 3 }
fn default_base_min() -> u64 { 2 }
fn default_base_max() -> u64 { 5 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_min: default_base_min(),
            base_max: default_base_max(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 || self.max_retries > MAX_RETRIES_LIMIT {
            return Err(AgentError::Config(format!(
                "max_retries must be between 1 and {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }
        if self.base_min == 0 || self.base_min > self.base_max || self.base_max > BASE_MAX_LIMIT {
            return Err(AgentError::Config(format!(
                "invalid backoff base range [{}, {}]",
                self.base_min, self.base_max
            )));
        }
        Ok(())
    }
}

/// Source of the backoff base for each wait
pub trait BackoffBase: Send + Sync {
    fn next_base(&self) -> u64;
}

/// Uniform random base in `[min, max]`
#[derive(Clone, Debug)]
pub struct RandomBase {
    min: u64,
    max: u64,
}

impl RandomBase {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }
}

impl BackoffBase for RandomBase {
    fn next_base(&self) -> u64 {
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Suspends the current call between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Yields to the tokio scheduler; other sessions keep running
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Wait after the `attempt`-th failure (1-based)
pub fn backoff_delay(base: u64, attempt: u32) -> Duration {
    Duration::from_secs(base.saturating_pow(attempt))
}

/// Wraps one logical call with bounded retries
#[derive(Clone)]
pub struct RetryController {
    max_retries: u32,
    backoff: Arc<dyn BackoffBase>,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryController {
    /// Production controller: random base and tokio sleep
    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.max_retries,
            Arc::new(RandomBase::new(config.base_min, config.base_max)),
            Arc::new(TokioSleeper),
        ))
    }

    pub fn new(max_retries: u32, backoff: Arc<dyn BackoffBase>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            max_retries: max_retries.clamp(1, MAX_RETRIES_LIMIT),
            backoff,
            sleeper,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Transient failures never escape: once attempts are exhausted the
    /// [`MAX_RETRIES_EXCEEDED`] answer is returned instead.
    pub async fn execute<F, Fut>(&self, mut operation: F) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut attempt = 0;

        loop {
            let err = match operation().await {
                Ok(answer) => return Ok(answer),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            attempt += 1;
            if attempt >= self.max_retries {
                tracing::warn!(
                    attempt,
                    max_attempts = self.max_retries,
                    error = %err,
                    "Giving up after transient errors"
                );
                return Ok(MAX_RETRIES_EXCEEDED.to_string());
            }

            let delay = backoff_delay(self.backoff.next_base(), attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.max_retries,
                error = %err,
                wait_secs = delay.as_secs(),
                "Retrying after transient error"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedBase, RecordingSleeper};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn controller(max: u32, bases: Vec<u64>) -> (RetryController, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let controller = RetryController::new(max, Arc::new(FixedBase::new(bases)), sleeper.clone());
        (controller, sleeper)
    }

    #[tokio::test]
    async fn test_success_first_try_does_not_sleep() {
        let (retry, sleeper) = controller(3, vec![2]);
        let answer = retry.execute(|| async { Ok("pronto".to_string()) }).await.unwrap();
        assert_eq!(answer, "pronto");
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_exhaustion_returns_sentinel_after_max_attempts() {
        let (retry, sleeper) = controller(3, vec![3, 5]);
        let calls = AtomicU32::new(0);

        let answer = retry
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AgentError::RateLimited("429".into())) }
            })
            .await
            .unwrap();

        assert_eq!(answer, MAX_RETRIES_EXCEEDED);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 3^1 after the first failure, 5^2 after the second, none after the last
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(3), Duration::from_secs(25)]
        );
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let (retry, sleeper) = controller(3, vec![2]);
        let calls = AtomicU32::new(0);

        let answer = retry
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(AgentError::Timeout("slow".into()))
                    } else {
                        Ok("resposta".to_string())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(answer, "resposta");
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let (retry, sleeper) = controller(3, vec![2]);
        let calls = AtomicU32::new(0);

        let result = retry
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AgentError::Auth("invalid key".into())) }
            })
            .await;

        assert!(matches!(result, Err(AgentError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_single_attempt_budget() {
        let (retry, sleeper) = controller(1, vec![2]);
        let answer = retry
            .execute(|| async { Err(AgentError::MalformedResponse("??".into())) })
            .await
            .unwrap();
        assert_eq!(answer, MAX_RETRIES_EXCEEDED);
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn test_random_base_stays_in_range() {
        let base = RandomBase::new(2, 5);
        for _ in 0..200 {
            let b = base.next_base();
            assert!((2..=5).contains(&b));
        }
    }

    #[test]
    fn test_backoff_delay_is_power_of_base() {
        assert_eq!(backoff_delay(2, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(4, 2), Duration::from_secs(16));
        assert_eq!(backoff_delay(5, 3), Duration::from_secs(125));
    }

    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        let zero = RetryConfig { max_retries: 0, ..Default::default() };
        assert!(matches!(zero.validate(), Err(AgentError::Config(_))));
        let inverted = RetryConfig { base_min: 6, base_max: 5, ..Default::default() };
        assert!(RetryController::from_config(&inverted).is_err());
    }

    #[test]
    fn test_config_bounds_total_wait() {
        let at_limit = RetryConfig { max_retries: MAX_RETRIES_LIMIT, ..Default::default() };
        assert!(at_limit.validate().is_ok());

        let too_many = RetryConfig { max_retries: 30, ..Default::default() };
        assert!(matches!(too_many.validate(), Err(AgentError::Config(_))));

        let huge_base = RetryConfig { base_min: 2, base_max: 1000, ..Default::default() };
        assert!(matches!(huge_base.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_controller_clamps_attempts() {
        let (retry, _) = controller(u32::MAX, vec![2]);
        assert_eq!(retry.max_retries(), MAX_RETRIES_LIMIT);
    }
}
