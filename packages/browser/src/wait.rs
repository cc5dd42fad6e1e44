//! Deadline, backoff and cancellation for the pipeline's wait loops.
//!
//! Both suspension points (reloading until the landing page renders, and
//! polling until the download lands) share a [`WaitPolicy`]. The default
//! policy places no limit on attempts, matching a supervised batch job that
//! would rather wait than fail, but callers can bound it with
//! [`WaitPolicy::with_max_attempts`], [`WaitPolicy::with_timeout`], or by
//! cancelling the token.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::BrowserError;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Always wait the base interval.
    Fixed,
    /// Double the base interval each attempt, capped at `max`.
    Exponential {
        /// Upper bound on a single delay.
        max: Duration,
    },
}

/// Retry policy for a wait loop.
#[derive(Debug, Clone)]
pub struct WaitPolicy {
    /// How long a single attempt may take (e.g. waiting for an element).
    pub attempt_timeout: Duration,
    /// Base delay between attempts.
    pub interval: Duration,
    /// Delay growth strategy.
    pub backoff: Backoff,
    /// Maximum number of attempts, `None` for unbounded.
    pub max_attempts: Option<u32>,
    /// Absolute deadline for the whole loop.
    pub deadline: Option<Instant>,
    /// Token that aborts the loop at the next suspension point.
    pub cancel: CancellationToken,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(10),
            interval: Duration::from_secs(1),
            backoff: Backoff::Fixed,
            max_attempts: None,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl WaitPolicy {
    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the base delay between attempts.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Limits the number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = Some(max);
        self
    }

    /// Sets a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Uses `cancel` as the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Delay to wait after the given (1-based) attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.interval.saturating_mul(factor).min(max)
            }
        }
    }

    /// Time a single attempt may take: [`attempt_timeout`](Self::attempt_timeout)
    /// clamped to whatever is left before the deadline.
    #[must_use]
    pub fn attempt_budget(&self) -> Duration {
        self.deadline.map_or(self.attempt_timeout, |deadline| {
            self.attempt_timeout
                .min(deadline.saturating_duration_since(Instant::now()))
        })
    }

    /// Fails if the loop should not start attempt number `attempt`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Cancelled`] if the token is cancelled, or
    /// [`BrowserError::TimedOut`] if the deadline has passed or `attempt`
    /// exceeds the attempt limit.
    pub fn check(&self, what: &str, attempt: u32) -> Result<(), BrowserError> {
        if self.cancel.is_cancelled() {
            return Err(BrowserError::Cancelled {
                what: what.to_owned(),
            });
        }
        let over_limit = self.max_attempts.is_some_and(|max| attempt > max);
        let past_deadline = self.deadline.is_some_and(|d| Instant::now() >= d);
        if over_limit || past_deadline {
            return Err(BrowserError::TimedOut {
                what: what.to_owned(),
                attempts: attempt.saturating_sub(1),
            });
        }
        Ok(())
    }

    /// Sleeps for the delay after `attempt`, cut short by the deadline or
    /// cancellation.
    ///
    /// Returning `Ok` does not mean the deadline still holds; the caller's
    /// next [`check`](Self::check) decides that.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Cancelled`] if the token fires while
    /// sleeping.
    pub async fn pause(&self, what: &str, attempt: u32) -> Result<(), BrowserError> {
        let mut delay = self.delay_after(attempt);
        if let Some(deadline) = self.deadline {
            delay = delay.min(deadline.saturating_duration_since(Instant::now()));
        }

        tokio::select! {
            () = self.cancel.cancelled() => Err(BrowserError::Cancelled { what: what.to_owned() }),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Runs `fut` unless the token is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Cancelled`] on cancellation, otherwise the
    /// future's own error.
    pub async fn cancellable<T, F>(&self, what: &str, fut: F) -> Result<T, BrowserError>
    where
        F: Future<Output = Result<T, BrowserError>>,
    {
        tokio::select! {
            () = self.cancel.cancelled() => Err(BrowserError::Cancelled { what: what.to_owned() }),
            result = fut => result,
        }
    }
}
