//! Bounded retry with a fixed delay between attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retries a fallible operation a fixed number of times
///
/// `times` is the number of retries, so an operation is attempted at most
/// `times + 1` times. Failed attempts are separated by a fixed `interval`
/// with no backoff or jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub times: u32,

    /// Delay between two consecutive attempts
    pub interval: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy
    pub fn new(times: u32, interval: Duration) -> Self {
        Self { times, interval }
    }

    /// A policy that attempts exactly once
    pub fn never() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Runs `job` until it succeeds or the attempt budget is spent
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The value of the first successful attempt
    /// * `Err(E)` - The error of the last attempt when every attempt failed
    pub async fn run<T, E, F, Fut>(&self, mut job: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match job().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.times => {
                    attempt += 1;
                    tracing::debug!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.times + 1,
                        e,
                        self.interval
                    );
                    tokio::time::sleep(self.interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(3))
    }
}
