//! Polling for long-running operations.
//!
//! Form Recognizer analyses run server-side: a submit call returns an
//! operation URL, and the client checks that URL until the operation reaches
//! a terminal status. [`LongRunningOperationPoller`] drives that loop for any
//! caller-supplied status check, on a constant interval, and stops early when
//! the caller's [`CancellationToken`] fires.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_form_recognizer_core::polling::{LongRunningOperationPoller, OperationOutcome, PollResult};
//! use tokio_util::sync::CancellationToken;
//! use std::time::Duration;
//!
//! # async fn example() -> azure_form_recognizer_core::error::FormRecognizerResult<()> {
//! let poller = LongRunningOperationPoller::new().with_interval(Duration::from_secs(1));
//! let cancellation = CancellationToken::new();
//!
//! let outcome = poller
//!     .poll("operation-1", &cancellation, |_token| async {
//!         // One network round-trip against the status endpoint goes here.
//!         Ok(PollResult::succeeded("done"))
//!     })
//!     .await?;
//!
//! if let OperationOutcome::Succeeded(value) = outcome {
//!     println!("finished: {value}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{FormRecognizerError, FormRecognizerResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default wait between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Status and outcome types
// ---------------------------------------------------------------------------

/// Status reported by a long-running operation.
///
/// Moves forward only: `NotStarted` → `Running` → `Succeeded` | `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// The operation has been accepted but has not started.
    NotStarted,
    /// The operation is in progress.
    Running,
    /// The operation completed successfully.
    Succeeded,
    /// The operation failed.
    Failed,
}

impl OperationStatus {
    /// Returns `true` if the status is terminal (succeeded or failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "notStarted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a long-running operation failed on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationError {
    /// The error code.
    pub code: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Final state of a long-running operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome<T> {
    /// The operation succeeded and produced a value.
    Succeeded(T),
    /// The operation failed with the given error detail.
    Failed(OperationError),
}

impl<T> OperationOutcome<T> {
    /// The terminal status this outcome corresponds to.
    pub fn status(&self) -> OperationStatus {
        match self {
            Self::Succeeded(_) => OperationStatus::Succeeded,
            Self::Failed(_) => OperationStatus::Failed,
        }
    }

    /// Returns `true` for [`OperationOutcome::Succeeded`].
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Convert into a `Result`, turning a failed operation into
    /// [`FormRecognizerError::Api`] with the server's code and message.
    pub fn into_result(self) -> FormRecognizerResult<T> {
        match self {
            Self::Succeeded(value) => Ok(value),
            Self::Failed(error) => Err(FormRecognizerError::Api {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

/// The answer to a single status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult<T> {
    /// The operation is still `NotStarted` or `Running`.
    Pending,
    /// The operation reached a terminal status.
    Complete(OperationOutcome<T>),
}

impl<T> PollResult<T> {
    /// Shorthand for `Complete(Succeeded(value))`.
    pub fn succeeded(value: T) -> Self {
        Self::Complete(OperationOutcome::Succeeded(value))
    }

    /// Shorthand for `Complete(Failed(error))`.
    pub fn failed(error: OperationError) -> Self {
        Self::Complete(OperationOutcome::Failed(error))
    }

    /// Returns `true` if the operation reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Waits for a long-running operation by checking its status on a fixed interval.
///
/// The interval is constant across iterations. Errors returned by the status
/// check are surfaced immediately; retrying transient transport failures is
/// the job of the HTTP client, not the poller.
#[derive(Debug, Clone)]
pub struct LongRunningOperationPoller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl Default for LongRunningOperationPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

impl LongRunningOperationPoller {
    /// Create a poller with [`DEFAULT_POLL_INTERVAL`] and no attempt limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wait between two status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Limit the number of status checks.
    ///
    /// When the limit is reached without a terminal status, polling fails with
    /// [`FormRecognizerError::Api`] and code `PollTimeout`.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// The configured polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The configured attempt limit, if any.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Poll until the operation reaches a terminal status.
    ///
    /// `check` performs one status round-trip and receives a clone of
    /// `cancellation` so it can abort its own request. The token is also
    /// checked before every status check and before every wait.
    ///
    /// # Errors
    ///
    /// - [`FormRecognizerError::Cancelled`] if `cancellation` fires.
    /// - Any error returned by `check`, unchanged.
    /// - [`FormRecognizerError::Api`] with code `PollTimeout` when
    ///   `max_attempts` is exhausted.
    ///
    /// # Tracing
    ///
    /// Emits a span named `form_recognizer::polling::poll` with field `operation_id`.
    #[tracing::instrument(
        name = "form_recognizer::polling::poll",
        skip(self, cancellation, check),
        fields(operation_id = %operation_id)
    )]
    pub async fn poll<T, F, Fut>(
        &self,
        operation_id: &str,
        cancellation: &CancellationToken,
        mut check: F,
    ) -> FormRecognizerResult<OperationOutcome<T>>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = FormRecognizerResult<PollResult<T>>>,
    {
        tracing::debug!("starting to poll for completion");

        let mut attempts = 0u32;

        loop {
            if cancellation.is_cancelled() {
                tracing::debug!(attempts, "polling cancelled before status check");
                return Err(FormRecognizerError::Cancelled);
            }

            if let Some(max_attempts) = self.max_attempts {
                if attempts >= max_attempts {
                    return Err(FormRecognizerError::Api {
                        code: "PollTimeout".into(),
                        message: format!(
                            "operation did not complete within {max_attempts} max_attempts"
                        ),
                    });
                }
            }
            attempts += 1;

            if let PollResult::Complete(outcome) = check(cancellation.clone()).await? {
                tracing::debug!(
                    status = %outcome.status(),
                    attempts,
                    "operation reached terminal status"
                );
                return Ok(outcome);
            }

            if cancellation.is_cancelled() {
                tracing::debug!(attempts, "polling cancelled before wait");
                return Err(FormRecognizerError::Cancelled);
            }

            tracing::trace!(attempt = attempts, "operation still in progress, waiting");
            tokio::select! {
                _ = cancellation.cancelled() => {
                    tracing::debug!(attempts, "polling cancelled during wait");
                    return Err(FormRecognizerError::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{ready, Ready};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    type Check = FormRecognizerResult<PollResult<&'static str>>;

    const INTERVAL: Duration = Duration::from_secs(10);

    /// A status check that answers with `script(n)` on its n-th call (0-based).
    fn scripted(
        calls: &AtomicU32,
        script: fn(u32) -> Check,
    ) -> impl FnMut(CancellationToken) -> Ready<Check> + '_ {
        move |_token| ready(script(calls.fetch_add(1, Ordering::SeqCst)))
    }

    fn failure() -> OperationError {
        OperationError {
            code: "InvalidImage".into(),
            message: "The input data is not a valid image.".into(),
        }
    }

    fn poller() -> LongRunningOperationPoller {
        LongRunningOperationPoller::new().with_interval(INTERVAL)
    }

    #[test]
    fn operation_status_deserialization() {
        let cases = [
            (r#""notStarted""#, OperationStatus::NotStarted),
            (r#""running""#, OperationStatus::Running),
            (r#""succeeded""#, OperationStatus::Succeeded),
            (r#""failed""#, OperationStatus::Failed),
        ];
        for (json, expected) in cases {
            let status: OperationStatus = serde_json::from_str(json).expect("should deserialize");
            assert_eq!(status, expected);
            assert_eq!(format!("\"{status}\""), json);
        }
    }

    #[test]
    fn operation_status_is_terminal() {
        assert!(!OperationStatus::NotStarted.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(OperationStatus::Succeeded.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
    }

    #[test]
    fn failed_outcome_into_result_is_api_error() {
        let outcome: OperationOutcome<()> = OperationOutcome::Failed(failure());
        assert_eq!(outcome.status(), OperationStatus::Failed);

        let err = outcome.into_result().expect_err("should be an error");
        match err {
            FormRecognizerError::Api { code, .. } => assert_eq!(code, "InvalidImage"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn default_poller_settings() {
        let poller = LongRunningOperationPoller::default();
        assert_eq!(poller.interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(poller.max_attempts(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_checks_once_without_waiting() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let start = Instant::now();

        let outcome = poller()
            .poll("op", &token, scripted(&calls, |_| Ok(PollResult::succeeded("done"))))
            .await
            .expect("should succeed");

        assert_eq!(outcome, OperationOutcome::Succeeded("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < INTERVAL, "no wait expected");
    }

    #[tokio::test(start_paused = true)]
    async fn running_twice_then_success_checks_three_times() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let start = Instant::now();

        let outcome = poller()
            .poll(
                "op",
                &token,
                scripted(&calls, |n| {
                    Ok(if n < 2 {
                        PollResult::Pending
                    } else {
                        PollResult::succeeded("done")
                    })
                }),
            )
            .await
            .expect("should succeed");

        assert_eq!(outcome, OperationOutcome::Succeeded("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // One wait after each of the first two checks, none after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= INTERVAL * 2, "elapsed: {elapsed:?}");
        assert!(elapsed < INTERVAL * 3, "elapsed: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_returned_as_outcome() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let outcome = poller()
            .poll(
                "op",
                &token,
                scripted(&calls, |n| {
                    Ok(if n == 0 {
                        PollResult::Pending
                    } else {
                        PollResult::failed(failure())
                    })
                }),
            )
            .await
            .expect("failed status is not a transport error");

        assert_eq!(outcome, OperationOutcome::Failed(failure()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_error_propagates_without_retry() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let err = poller()
            .poll(
                "op",
                &token,
                scripted(&calls, |_| Err(FormRecognizerError::http(500, "boom"))),
            )
            .await
            .expect_err("should propagate");

        assert!(matches!(err, FormRecognizerError::Http { status: 500, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_never_checks() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        token.cancel();

        let err = poller()
            .poll("op", &token, scripted(&calls, |_| Ok(PollResult::succeeded("done"))))
            .await
            .expect_err("should be cancelled");

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_from_status_check_stops_before_wait() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let start = Instant::now();

        let err = poller()
            .poll("op", &token, |passed: CancellationToken| {
                if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                    passed.cancel();
                }
                ready(Ok::<_, FormRecognizerError>(PollResult::<()>::Pending))
            })
            .await
            .expect_err("should be cancelled");

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= INTERVAL && elapsed < INTERVAL * 2, "elapsed: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_wait_interrupts_sleep() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let start = Instant::now();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(INTERVAL + INTERVAL / 2).await;
            canceller.cancel();
        });

        let err = poller()
            .poll("op", &token, scripted(&calls, |_| Ok(PollResult::Pending)))
            .await
            .expect_err("should be cancelled");

        assert!(matches!(err, FormRecognizerError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = start.elapsed();
        assert!(elapsed < INTERVAL * 2, "elapsed: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn max_attempts_exceeded_is_poll_timeout() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let err = poller()
            .with_max_attempts(3)
            .poll("op", &token, scripted(&calls, |_| Ok(PollResult::Pending)))
            .await
            .expect_err("should time out");

        match err {
            FormRecognizerError::Api { code, message } => {
                assert_eq!(code, "PollTimeout");
                assert!(message.contains("max_attempts"), "message: {message}");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_operations_poll_concurrently() {
        let fast_calls = AtomicU32::new(0);
        let slow_calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let poller = poller();

        let (fast, slow) = futures::future::join(
            poller.poll(
                "fast",
                &token,
                scripted(&fast_calls, |n| {
                    Ok(if n < 1 {
                        PollResult::Pending
                    } else {
                        PollResult::succeeded("fast")
                    })
                }),
            ),
            poller.poll(
                "slow",
                &token,
                scripted(&slow_calls, |n| {
                    Ok(if n < 4 {
                        PollResult::Pending
                    } else {
                        PollResult::succeeded("slow")
                    })
                }),
            ),
        )
        .await;

        assert_eq!(fast.expect("fast"), OperationOutcome::Succeeded("fast"));
        assert_eq!(slow.expect("slow"), OperationOutcome::Succeeded("slow"));
        assert_eq!(fast_calls.load(Ordering::SeqCst), 2);
        assert_eq!(slow_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn poll_emits_span_with_operation_id() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let _ = poller()
            .poll(
                "op-traced",
                &token,
                scripted(&calls, |_| Ok(PollResult::succeeded("done"))),
            )
            .await;

        assert!(logs_contain("form_recognizer::polling::poll"));
        assert!(logs_contain("op-traced"));
    }
}
