//! Convergence poller: bounded "check until true or give up".
//!
//! [`poll_until`] re-runs an async check at a fixed interval for at most
//! `max_attempts` invocations. It separates three outcomes:
//!
//! - the check returned `true`: converged, no further sleep;
//! - the budget ran out while the check kept returning `false`: timed out;
//! - the check itself failed (e.g. unreadable state): aborted at once,
//!   never retried.
//!
//! Sleeps race a [`CancellationToken`], so a caller can abort mid-wait. A
//! check abandoned on cancellation ends the loop as cancelled, not failed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::{Converged, PollPolicy};
use crate::error::CheckerError;
use crate::gateway::{QueryGateway, ResultRow, SqlSession};

/// Why a poll loop ended without converging.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Every attempt ran and none converged.
    #[error("not converged after {attempts} attempts ({waited:?} waited)")]
    TimedOut {
        /// Number of check invocations.
        attempts: u32,
        /// Total time slept between checks.
        waited: Duration,
    },

    /// The cancellation token fired.
    #[error("cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of check invocations completed before cancellation.
        attempts: u32,
    },

    /// The check failed; its error is passed through unchanged.
    #[error(transparent)]
    Check(#[from] CheckerError),
}

impl PollError {
    /// Converts into a [`CheckerError`], using `on_timeout` to build the
    /// caller-specific timeout variant.
    pub fn into_checker_error(
        self,
        label: &str,
        on_timeout: impl FnOnce(u32, Duration) -> CheckerError,
    ) -> CheckerError {
        match self {
            Self::TimedOut { attempts, waited } => on_timeout(attempts, waited),
            Self::Cancelled { attempts } => CheckerError::Cancelled {
                step: label.to_string(),
                attempts,
            },
            Self::Check(err) => err,
        }
    }
}

/// Row predicate of a [`PollSpec`]. Receives the statement text for error
/// context.
pub type RowPredicate = fn(&str, &[ResultRow]) -> Result<bool, CheckerError>;

/// A query, the predicate that decides convergence from its rows, and the
/// budget to poll it with.
#[derive(Debug, Clone)]
pub struct PollSpec {
    /// Name used in log lines and cancellation errors.
    pub label: String,
    /// Read-only statement re-run on every attempt.
    pub sql: String,
    /// Decides convergence; an error means the state is unreadable.
    pub predicate: RowPredicate,
    /// Interval and attempt budget.
    pub policy: PollPolicy,
}

/// Polls `check` until it returns `true`, the budget is spent, or `cancel`
/// fires.
///
/// `check` must be a pure read; it is invoked at most
/// `policy.max_attempts()` times with one `policy.interval()` sleep between
/// consecutive invocations.
///
/// # Errors
///
/// - [`PollError::TimedOut`] when every attempt returned `false`.
/// - [`PollError::Cancelled`] when `cancel` fires before convergence.
/// - [`PollError::Check`] as soon as `check` fails.
pub async fn poll_until<F>(
    label: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<Converged, PollError>
where
    F: AsyncFnMut() -> Result<bool, CheckerError>,
{
    let mut attempts: u32 = 0;
    let mut waited = Duration::ZERO;

    loop {
        if cancel.is_cancelled() {
            tracing::warn!(check = label, attempts, "poll cancelled");
            return Err(PollError::Cancelled { attempts });
        }

        let converged = match check().await {
            Ok(converged) => converged,
            Err(CheckerError::Cancelled { .. }) => {
                tracing::warn!(check = label, attempts, "poll cancelled mid-check");
                return Err(PollError::Cancelled { attempts });
            }
            Err(e) => return Err(e.into()),
        };
        attempts = attempts.saturating_add(1);
        if converged {
            tracing::info!(check = label, attempts, ?waited, "converged");
            return Ok(Converged { attempts, waited });
        }

        let remaining = policy.max_attempts().saturating_sub(attempts);
        if remaining == 0 {
            tracing::warn!(check = label, attempts, ?waited, "poll timed out");
            return Err(PollError::TimedOut { attempts, waited });
        }

        tracing::info!(
            check = label,
            attempts,
            remaining,
            interval = ?policy.interval(),
            "not converged yet"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!(check = label, attempts, "poll cancelled");
                return Err(PollError::Cancelled { attempts });
            }
            () = tokio::time::sleep(policy.interval()) => {}
        }
        waited = waited.saturating_add(policy.interval());
    }
}

/// Runs `spec` against the cluster through `gateway`.
///
/// # Errors
///
/// Same as [`poll_until`]; query failures and predicate errors surface as
/// [`PollError::Check`].
pub async fn wait_for<S: SqlSession>(
    gateway: &mut QueryGateway<S>,
    spec: &PollSpec,
    cancel: &CancellationToken,
) -> Result<Converged, PollError> {
    poll_until(&spec.label, spec.policy, cancel, async || {
        gateway
            .query(&spec.sql)
            .await
            .and_then(|rows| (spec.predicate)(&spec.sql, &rows))
    })
    .await
}
