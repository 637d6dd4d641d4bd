//! Service layer: convergence poller, parameter synchronizer and the
//! post-upgrade verifier, plus the session-scoped entry points that tie
//! them to a live cluster.

pub mod parameter_sync;
pub mod poller;
pub mod verifier;

pub use parameter_sync::ParameterSynchronizer;
pub use poller::{PollError, PollSpec, poll_until, wait_for};
pub use verifier::{PostUpgradeVerifier, VerificationReport, VerifierPlan};

use tokio_util::sync::CancellationToken;

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::gateway::{MySqlSession, QueryGateway, SqlSession};

/// Connects to the coordinator in `config` and runs every check.
///
/// The session is closed whether the checks succeed or fail.
///
/// # Errors
///
/// Returns [`CheckerError::Connection`] if the coordinator is unreachable,
/// otherwise the first failing step's error.
pub async fn run_post_upgrade_checks(
    config: &CheckerConfig,
    cancel: &CancellationToken,
) -> Result<VerificationReport, CheckerError> {
    let session = MySqlSession::connect(&config.connection).await?;
    run_with_session(session, config.plan.clone(), cancel).await
}

/// Runs every check over an already open session, then closes it.
///
/// A failure to close is logged but does not change the outcome. After
/// cancellation a statement may still be in flight, so the session is
/// dropped instead of closed.
///
/// # Errors
///
/// Returns the first failing step's error, or [`CheckerError::Cancelled`]
/// once `cancel` fires, even while a statement is running.
pub async fn run_with_session<S: SqlSession>(
    session: S,
    plan: VerifierPlan,
    cancel: &CancellationToken,
) -> Result<VerificationReport, CheckerError> {
    let mut gateway = QueryGateway::new(session).with_cancel(cancel.clone());
    let mut verifier = PostUpgradeVerifier::new(plan);

    let outcome = verifier.run(&mut gateway, cancel).await;
    if cancel.is_cancelled() {
        tracing::warn!("dropping session without close after cancellation");
        drop(gateway);
    } else {
        // close() logs its own failure
        let _ = gateway.close().await;
    }
    outcome
}
