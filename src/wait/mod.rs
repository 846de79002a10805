//! Deadlines, polling and conflict retries.
//!
//! Every suspension point of a controller (remote call, poll, back-off
//! sleep) is raced against the operation's [`Deadline`], which combines an
//! absolute instant with a cancellation token supplied by the caller.

mod entities;

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::error::ProviderError;

/// Default per-phase deadline.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Controller phase a deadline applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Resource creation.
    Create,
    /// Refresh from remote.
    Read,
    /// In-place update.
    Update,
    /// Removal.
    Delete,
}

/// Deadline durations per phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timeouts {
    /// Create phase.
    pub create: Duration,
    /// Read phase.
    pub read: Duration,
    /// Update phase.
    pub update: Duration,
    /// Delete phase.
    pub delete: Duration,
}

impl Timeouts {
    /// Uses `duration` for every phase.
    #[must_use]
    pub const fn uniform(duration: Duration) -> Self {
        Self {
            create: duration,
            read: duration,
            update: duration,
            delete: duration,
        }
    }

    /// Returns the duration of `phase`.
    #[must_use]
    pub const fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Create => self.create,
            Phase::Read => self.read,
            Phase::Update => self.update,
            Phase::Delete => self.delete,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_PHASE_TIMEOUT)
    }
}

/// Absolute deadline plus cooperative cancellation.
#[derive(Clone, Debug)]
pub struct Deadline {
    at: Instant,
    cancel: CancellationToken,
}

impl Deadline {
    /// Expires `duration` from now with a fresh token.
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self::with_token(duration, CancellationToken::new())
    }

    /// Expires `duration` from now, also honouring `cancel`.
    #[must_use]
    pub fn with_token(duration: Duration, cancel: CancellationToken) -> Self {
        Self {
            at: Instant::now() + duration,
            cancel,
        }
    }

    /// Runs `work` until it completes, the deadline passes or the token
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns the error of `work`, [`ProviderError::Timeout`] naming
    /// `action` and `id`, or [`ProviderError::Cancelled`].
    pub async fn guard<T, F>(&self, action: &str, id: &str, work: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            outcome = timeout_at(self.at, work) => outcome.unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    action: action.to_owned(),
                    id: id.to_owned(),
                })
            }),
        }
    }

    /// Sleeps for `interval`, cut short by the deadline or the token.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Timeout`] when the deadline falls inside the
    /// interval and [`ProviderError::Cancelled`] when the token fires.
    pub async fn sleep(&self, interval: Duration, action: &str, id: &str) -> Result<(), ProviderError> {
        let wake = Instant::now() + interval;
        if wake >= self.at {
            self.guard(action, id, async {
                sleep_until(self.at).await;
                Ok(())
            })
            .await?;
            return Err(ProviderError::Timeout {
                action: action.to_owned(),
                id: id.to_owned(),
            });
        }
        self.guard(action, id, async {
            sleep_until(wake).await;
            Ok(())
        })
        .await
    }
}

/// Deadline and warning sink of one controller call.
#[derive(Debug)]
pub struct Operation {
    /// Deadline of the call.
    pub deadline: Deadline,
    /// Warnings raised during the call.
    pub diagnostics: Diagnostics,
}

impl Operation {
    /// Starts an operation bounded by `deadline`.
    #[must_use]
    pub fn new(deadline: Deadline) -> Self {
        Self {
            deadline,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Starts an operation expiring `duration` from now.
    #[must_use]
    pub fn with_timeout(duration: Duration) -> Self {
        Self::new(Deadline::after(duration))
    }
}

/// Polls `fetch` every `interval` until `is_terminal` accepts the observed
/// value, returning that value.
///
/// # Errors
///
/// Returns the first error raised by `fetch`, or the deadline outcome of
/// [`Deadline::guard`].
pub async fn poll_until<T, F, Fut, P>(
    deadline: &Deadline,
    interval: Duration,
    action: &str,
    id: &str,
    mut fetch: F,
    is_terminal: P,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&T) -> bool,
{
    loop {
        let observed = deadline.guard(action, id, fetch()).await?;
        if is_terminal(&observed) {
            debug!(action, id, "reached terminal status");
            return Ok(observed);
        }
        debug!(action, id, "not terminal yet; polling again");
        deadline.sleep(interval, action, id).await?;
    }
}

/// Re-drives an operation that fails with a transient conflict, re-waiting
/// the owning resource before each attempt.
#[derive(Clone, Copy, Debug)]
pub struct ConflictRetry<'d> {
    deadline: &'d Deadline,
    interval: Duration,
}

impl<'d> ConflictRetry<'d> {
    /// Retries on [`ProviderError::is_conflict`] until `deadline`.
    #[must_use]
    pub const fn new(deadline: &'d Deadline, interval: Duration) -> Self {
        Self { deadline, interval }
    }

    /// Runs `op`; on a retryable error runs `rewait`, backs off for the
    /// interval, and tries again.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error of `op` or `rewait`, the last
    /// retryable error when the deadline passes, or
    /// [`ProviderError::Cancelled`].
    pub async fn run<T, Op, OpFut, Rw, RwFut>(
        &self,
        action: &str,
        id: &str,
        mut op: Op,
        mut rewait: Rw,
    ) -> Result<T, ProviderError>
    where
        Op: FnMut() -> OpFut,
        OpFut: Future<Output = Result<T, ProviderError>>,
        Rw: FnMut() -> RwFut,
        RwFut: Future<Output = Result<(), ProviderError>>,
    {
        let mut last: Option<ProviderError> = None;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self.deadline.guard(action, id, op()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if matches!(err, ProviderError::Timeout { .. }) {
                return Err(last.unwrap_or(err));
            }
            if !err.is_conflict() {
                return Err(err);
            }
            info!(action, id, attempt, error = %err, "transient conflict; waiting for owner before retrying");

            if let Err(wait_err) = rewait().await {
                return Err(Self::settle(wait_err, err));
            }
            if let Err(sleep_err) = self.deadline.sleep(self.interval, action, id).await {
                return Err(Self::settle(sleep_err, err));
            }
            last = Some(err);
        }
    }

    fn settle(interruption: ProviderError, conflict: ProviderError) -> ProviderError {
        match interruption {
            ProviderError::Timeout { .. } => conflict,
            other => other,
        }
    }
}
