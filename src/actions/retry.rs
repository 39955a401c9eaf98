use crate::core::config::InteractionConfig;
use crate::errors::{BrowserAgentError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &InteractionConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&InteractionConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Fail,
}

/// Transition out of a failed `attempt` (0-based): a transient failure with
/// budget left goes to the next attempt, anything else is final.
pub fn decide(error: &BrowserAgentError, attempt: u32, policy: &RetryPolicy) -> RetryDecision {
    if error.is_transient() && attempt < policy.max_retries {
        RetryDecision::Retry
    } else {
        RetryDecision::Fail
    }
}

/// Runs `operation`, retrying transient failures per `policy`.
///
/// The final error is returned exactly as the operation produced it.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, action: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(action, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => match decide(&error, attempt, policy) {
                RetryDecision::Retry => {
                    warn!(action, attempt, error = %error, "transient failure, retrying");
                    tokio::time::sleep(policy.backoff).await;
                    attempt += 1;
                }
                RetryDecision::Fail => {
                    debug!(action, attempt, kind = ?error.kind(), "giving up");
                    return Err(error);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn decision_table() {
        let policy = fast(1);
        let transient = BrowserAgentError::Timeout("Timeout 2000ms exceeded".into());
        let permanent = BrowserAgentError::InteractionFailed("not a select".into());

        assert_eq!(decide(&transient, 0, &policy), RetryDecision::Retry);
        assert_eq!(decide(&transient, 1, &policy), RetryDecision::Fail);
        assert_eq!(decide(&permanent, 0, &policy), RetryDecision::Fail);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_exactly_once() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(1), "click", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(BrowserAgentError::InteractionFailed(
                        "Node is detached from document".into(),
                    ))
                } else {
                    Ok("clicked")
                }
            }
        })
        .await;

        assert_eq!(tokio_test::assert_ok!(result), "clicked");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_transient_failure_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast(1), "select_option", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BrowserAgentError::InteractionFailed("no option 'XL'".into())) }
        })
        .await;

        tokio_test::assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error_unchanged() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast(1), "type", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(BrowserAgentError::Timeout(format!("Timeout on attempt {}", n))) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, BrowserAgentError::Timeout(_)));
        assert_eq!(err.to_string(), "Timeout on attempt 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_budget_never_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&RetryPolicy::no_retry(), "hover", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BrowserAgentError::TargetClosed("Target closed".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_follows_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.backoff, Duration::from_millis(500));
    }
}
