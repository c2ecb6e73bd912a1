//! Blocking operation poller with a timeout.
//!
//! The loop fetches the status immediately, then alternates sleeping for the
//! check interval and re-checking. The elapsed time is compared against the
//! timeout only *after* each sleep, never before the first fetch, so an
//! already-finished operation costs a single fetch and no sleep.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Invalid poll settings.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSettingsError {
    /// The check interval was zero.
    #[error("check interval must be greater than zero")]
    ZeroInterval,
    /// The timeout was zero.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Validated interval and timeout for [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    check_interval: Duration,
    timeout: Duration,
}

impl PollSettings {
    /// Create poll settings; both durations must be positive.
    ///
    /// # Errors
    /// Returns [`PollSettingsError`] if either duration is zero.
    pub fn new(check_interval: Duration, timeout: Duration) -> Result<Self, PollSettingsError> {
        if check_interval.is_zero() {
            return Err(PollSettingsError::ZeroInterval);
        }
        if timeout.is_zero() {
            return Err(PollSettingsError::ZeroTimeout);
        }

        Ok(Self {
            check_interval,
            timeout,
        })
    }

    /// Create poll settings from whole seconds.
    ///
    /// # Errors
    /// Returns [`PollSettingsError`] if either value is zero.
    pub fn from_secs(check_interval_secs: u64, timeout_secs: u64) -> Result<Self, PollSettingsError> {
        Self::new(
            Duration::from_secs(check_interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    /// Time slept between two status fetches.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Total time after which waiting gives up.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Classification of a single status fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Not terminal yet; keep waiting.
    Pending,
    /// Terminal success.
    Ready(T),
    /// Terminal failure with a reason.
    Failed(String),
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// A fetch reported terminal success.
    Succeeded(T),
    /// A fetch reported terminal failure.
    Failed(String),
    /// The timeout expired first.
    TimedOut {
        /// Number of status fetches performed.
        attempts: u32,
    },
}

/// Poll `check` until it reports a terminal status or the timeout expires.
///
/// An error from `check` stops the loop and is returned as-is; it is not
/// retried.
///
/// # Errors
/// Returns the first error produced by `check`.
pub async fn poll_until<T, E, F, Fut>(
    settings: PollSettings,
    mut check: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match check().await? {
            PollStatus::Ready(value) => return Ok(PollOutcome::Succeeded(value)),
            PollStatus::Failed(reason) => return Ok(PollOutcome::Failed(reason)),
            PollStatus::Pending => {}
        }

        debug!(
            attempts,
            elapsed_secs = start.elapsed().as_secs(),
            interval_secs = settings.check_interval.as_secs(),
            "Not terminal yet, sleeping"
        );

        tokio::time::sleep(settings.check_interval).await;

        if start.elapsed() > settings.timeout {
            return Ok(PollOutcome::TimedOut { attempts });
        }
    }
}
