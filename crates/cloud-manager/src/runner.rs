use std::future::Future;
use std::time::Duration;

use crate::error::CloudError;

type RetryPredicate = Box<dyn Fn(&CloudError) -> bool + Send + Sync>;

/// Bounded, predicate-gated retry around one operation.
///
/// A failure the predicate rejects surfaces immediately. A matching
/// failure is retried after a fixed interval until `max_attempts` is
/// reached, then the last failure surfaces unchanged.
pub struct Runner {
    max_attempts: u32,
    retry_interval: Duration,
    retry_on: RetryPredicate,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_interval: Duration::from_secs(10),
            retry_on: Box::new(|_| false),
        }
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn retry_on(mut self, predicate: impl Fn(&CloudError) -> bool + Send + Sync + 'static) -> Self {
        self.retry_on = Box::new(predicate);
        self
    }

    /// Retry only on the given AWS error code.
    pub fn retry_on_code(self, code: &'static str) -> Self {
        self.retry_on(move |e| e.aws_code() == Some(code))
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, CloudError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CloudError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempts < self.max_attempts && (self.retry_on)(&e) => {
                    tracing::warn!(
                        attempts,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "operation failed, retry soon"
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
