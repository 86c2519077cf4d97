//! Retry state machine for single transfers
//!
//! ```text
//! ATTEMPT -> SUCCESS
//!         -> RETRY  (connection reset, I/O error: immediately, no cap)
//!         -> RETRY  (other error under ignore: after `retry_wait`, capped)
//!         -> SKIP   (other error under ignore, cap reached)
//!         -> FAIL   (other error)
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};
use vocp_config::RetryConfig;
use vocp_types::{CopyResult, Error, Result, TransferClass};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again, after an optional wait
    Retry {
        /// Pause before the next attempt
        wait: Option<Duration>,
    },
    /// Give up on this item and carry on with the run
    Skip,
    /// Abort the run
    Fail,
}

/// Final state of a transfer driven by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Data was copied
    Transferred,
    /// The item was abandoned; its code is in the aggregate
    Skipped,
}

/// Classifies transfer failures into retry, skip or abort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRetryPolicy {
    ignore_errors: bool,
    max_ignored_retries: u32,
    retry_wait: Duration,
}

impl TransferRetryPolicy {
    /// Policy with the default retry budget
    pub fn new(ignore_errors: bool) -> Self {
        Self::from_config(&RetryConfig::default(), ignore_errors)
    }

    /// Policy with the configured retry budget
    pub fn from_config(config: &RetryConfig, ignore_errors: bool) -> Self {
        Self {
            ignore_errors,
            max_ignored_retries: config.max_ignored_retries,
            retry_wait: config.retry_wait(),
        }
    }

    /// Retries allowed per item for non-transient errors under ignore
    pub fn max_ignored_retries(&self) -> u32 {
        self.max_ignored_retries
    }

    /// Decide the next step after `error`, with `ignored_retries` already
    /// spent on this item. A lock conflict always fails so its remediation
    /// reaches the user.
    pub fn decide(&self, error: &Error, ignored_retries: u32) -> RetryDecision {
        if matches!(error, Error::NodeLocked { .. }) {
            return RetryDecision::Fail;
        }
        match error.transfer_class() {
            TransferClass::ConnectionReset | TransferClass::Io => RetryDecision::Retry { wait: None },
            TransferClass::Other if !self.ignore_errors => RetryDecision::Fail,
            TransferClass::Other if ignored_retries >= self.max_ignored_retries => {
                RetryDecision::Skip
            }
            TransferClass::Other => RetryDecision::Retry {
                wait: Some(self.retry_wait),
            },
        }
    }

    /// Drive `attempt` until it succeeds, is skipped or fails.
    ///
    /// Connection resets add their code to the aggregate on every occurrence,
    /// even when a later attempt succeeds.
    pub async fn run<F, Fut>(&self, result: &mut CopyResult, mut attempt: F) -> Result<TransferOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut ignored_retries = 0u32;
        loop {
            let error = match attempt().await {
                Ok(()) => return Ok(TransferOutcome::Transferred),
                Err(error) => error,
            };
            debug!("{}", error);

            match self.decide(&error, ignored_retries) {
                RetryDecision::Retry { wait: None } => {
                    if error.transfer_class() == TransferClass::ConnectionReset {
                        warn!("{}", error);
                        result.add_error_code(error.errno());
                    } else {
                        warn!("{}: Retrying", error);
                    }
                }
                RetryDecision::Retry { wait: Some(wait) } => {
                    error!("{} (retrying)", error);
                    tokio::time::sleep(wait).await;
                    ignored_retries += 1;
                }
                RetryDecision::Skip => {
                    error!(
                        "{} (skipping after {} attempts)",
                        error,
                        ignored_retries + 1
                    );
                    result.record_failed_skip(skip_code(&error));
                    return Ok(TransferOutcome::Skipped);
                }
                RetryDecision::Fail => return Err(error),
            }
            result.stats.retries += 1;
        }
    }
}

/// Aggregate contribution of a skipped item; errors without an errno count 1
pub fn skip_code(error: &Error) -> i32 {
    match error.errno() {
        code if code > 0 => code,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::VecDeque;
    use vocp_types::errno;

    fn scripted(errors: Vec<Error>) -> impl FnMut() -> std::future::Ready<Result<()>> {
        let mut queue: VecDeque<Error> = errors.into();
        move || std::future::ready(queue.pop_front().map_or(Ok(()), Err))
    }

    fn reset() -> Error {
        Error::ConnectionReset {
            message: "Connection reset by peer".into(),
        }
    }

    #[rstest]
    #[case(false, Error::io("disk", errno::EIO), 0, RetryDecision::Retry { wait: None })]
    #[case(true, reset(), 500, RetryDecision::Retry { wait: None })]
    #[case(false, Error::NodeLocked { path: "vos:a".into() }, 0, RetryDecision::Fail)]
    #[case(true, Error::NodeLocked { path: "vos:a".into() }, 0, RetryDecision::Fail)]
    #[case(true, Error::NodeLocked { path: "vos:a".into() }, 100, RetryDecision::Fail)]
    #[case(true, Error::io("quota", 122), 0, RetryDecision::Retry { wait: Some(Duration::from_secs(5)) })]
    #[case(true, Error::io("quota", 122), 99, RetryDecision::Retry { wait: Some(Duration::from_secs(5)) })]
    #[case(true, Error::io("quota", 122), 100, RetryDecision::Skip)]
    fn test_decide(
        #[case] ignore: bool,
        #[case] error: Error,
        #[case] spent: u32,
        #[case] expected: RetryDecision,
    ) {
        assert_eq!(TransferRetryPolicy::new(ignore).decide(&error, spent), expected);
    }

    #[tokio::test]
    async fn test_io_errors_retry_until_success() {
        let policy = TransferRetryPolicy::new(false);
        let mut result = CopyResult::new();
        let outcome = policy
            .run(
                &mut result,
                scripted(vec![Error::io("disk", errno::EIO), Error::io("disk", errno::EIO)]),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stats.retries, 2);
    }

    #[tokio::test]
    async fn test_connection_reset_adds_code_and_retries() {
        let policy = TransferRetryPolicy::new(false);
        let mut result = CopyResult::new();
        let outcome = policy
            .run(&mut result, scripted(vec![reset(), reset(), reset()]))
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred);
        assert_eq!(result.exit_code, 3 * errno::ECONNRESET);
    }

    #[tokio::test]
    async fn test_unclassified_error_fails_without_ignore() {
        let policy = TransferRetryPolicy::new(false);
        let mut result = CopyResult::new();
        let error = policy
            .run(&mut result, scripted(vec![Error::RemoteFailure { message: "500".into() }]))
            .await
            .unwrap_err();

        assert_eq!(error.errno(), errno::EREMOTE);
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_error_retried_exactly_max_times() {
        let policy = TransferRetryPolicy::new(true);
        let mut result = CopyResult::new();
        let mut attempts = 0u32;
        let start = tokio::time::Instant::now();

        let outcome = policy
            .run(&mut result, || {
                attempts += 1;
                std::future::ready(Err(Error::io("quota exceeded", 122)))
            })
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Skipped);
        assert_eq!(attempts, 101);
        assert_eq!(start.elapsed(), Duration::from_secs(500));
        assert_eq!(result.exit_code, 122);
        assert_eq!(result.stats.files_skipped, 1);
        assert_eq!(result.stats.retries, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_do_not_spend_budget() {
        let config = RetryConfig {
            max_ignored_retries: 1,
            retry_wait_secs: 5,
        };
        let policy = TransferRetryPolicy::from_config(&config, true);
        let mut result = CopyResult::new();
        let outcome = policy
            .run(
                &mut result,
                scripted(vec![
                    Error::other("flaky"),
                    Error::io("disk", errno::EIO),
                    Error::io("disk", errno::EIO),
                    reset(),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred);
        assert_eq!(result.exit_code, errno::ECONNRESET);
        assert_eq!(result.stats.files_skipped, 0);
    }

    #[test]
    fn test_skip_code() {
        assert_eq!(skip_code(&Error::io("quota", 122)), 122);
        assert_eq!(skip_code(&Error::other("odd")), 1);
        assert_eq!(skip_code(&Error::NodeLocked { path: "vos:a".into() }), 1);
    }
}
