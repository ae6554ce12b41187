//! Exponential backoff for transient failures

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

/// Maximum retry attempts after the initial attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1000;

/// Injectable delay function
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;
/// Decides whether an error is worth another attempt
pub type ShouldRetryFn<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
/// Observes each retry: `(attempt_number, delay, error)`, attempt numbers start at 1
pub type OnRetryFn<E> = Arc<dyn Fn(u32, Duration, &E) + Send + Sync>;

/// Options for [`retry_with_exponential_backoff`]
pub struct RetryOptions<E> {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for every retry after it
    pub base_delay: Duration,
    should_retry: ShouldRetryFn<E>,
    sleep: SleepFn,
    on_retry: Option<OnRetryFn<E>>,
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            should_retry: Arc::new(|_: &E| true),
            sleep: Arc::new(|delay| -> BoxFuture<'static, ()> {
                Box::pin(tokio::time::sleep(delay))
            }),
            on_retry: None,
        }
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            should_retry: Arc::clone(&self.should_retry),
            sleep: Arc::clone(&self.sleep),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("should_retry", &"<callback>")
            .field("sleep", &"<callback>")
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl<E> RetryOptions<E> {
    /// Create options with the defaults (3 retries, 1s base delay, retry everything)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of retries after the initial attempt
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay
    #[must_use]
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Only retry errors the predicate accepts
    #[must_use]
    pub fn should_retry(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Replace the delay function
    #[must_use]
    pub fn sleep(
        mut self,
        sleep: impl Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    ) -> Self {
        self.sleep = Arc::new(sleep);
        self
    }

    /// Observe every retry
    #[must_use]
    pub fn on_retry(mut self, callback: impl Fn(u32, Duration, &E) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(callback));
        self
    }
}

/// Backoff delay before retry number `attempt` (0-based)
#[must_use]
pub fn retry_delay(base_delay: Duration, attempt: u32) -> Duration {
    let exponent = attempt.min(31);
    base_delay.saturating_mul(2u32.saturating_pow(exponent))
}

/// Run `operation`, retrying failures with exponential backoff
///
/// The operation runs at most `max_retries + 1` times. Before retry `n`
/// (0-based) it waits `base_delay * 2^n`. Errors rejected by `should_retry`
/// and the error of the final attempt are returned unchanged.
///
/// # Errors
/// Returns the last error produced by `operation`
pub async fn retry_with_exponential_backoff<T, E, F, Fut>(
    mut operation: F,
    options: &RetryOptions<E>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= options.max_retries || !(options.should_retry)(&error) {
                    return Err(error);
                }

                let delay = retry_delay(options.base_delay, attempt);
                log::warn!(
                    "Attempt {} failed ({error}); retrying in {}ms",
                    attempt + 1,
                    delay.as_millis()
                );
                if let Some(on_retry) = &options.on_retry {
                    on_retry(attempt + 1, delay, &error);
                }

                (options.sleep)(delay).await;
                attempt += 1;
            }
        }
    }
}
