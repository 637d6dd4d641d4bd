//! Post-upgrade verifier.
//!
//! Runs the fixed step sequence
//! `VersionCheck → InspectionCheck → EnableDdl → EnableRebalance →
//! EnableRereplication → EnableMajorCompaction → Done`. A failing step ends
//! the run; switches enabled by earlier steps are left enabled.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::parameter_sync::ParameterSynchronizer;
use super::poller::{PollSpec, wait_for};
use crate::domain::{ClusterParameter, Converged, PollPolicy, VerifierStep};
use crate::error::CheckerError;
use crate::gateway::{Cell, QueryGateway, ResultRow, SqlSession, single_int};

/// Target version checked when none is configured.
pub const DEFAULT_TARGET_VERSION: &str = "4.1.0.0";

/// What to verify and how patiently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierPlan {
    /// Expected `min_observer_version` on every node.
    pub target_version: String,
    /// Budget for the version check.
    pub version_policy: PollPolicy,
    /// Budget for the self-inspection check.
    pub inspection_policy: PollPolicy,
    /// Budget for each parameter sync.
    pub sync_policy: PollPolicy,
}

impl VerifierPlan {
    /// Plan with the default budgets for `target_version`.
    #[must_use]
    pub fn new(target_version: impl Into<String>) -> Self {
        Self {
            target_version: target_version.into(),
            version_policy: PollPolicy::version_check(),
            inspection_policy: PollPolicy::inspection_check(),
            sync_policy: PollPolicy::parameter_sync(),
        }
    }
}

impl Default for VerifierPlan {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_VERSION)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Steps that finished, in order.
    pub completed: Vec<VerifierStep>,
    /// Check invocations across all steps.
    pub attempts: u32,
    /// Time slept across all steps.
    pub waited: Duration,
}

/// Drives the verification sequence and keeps the step cursor.
#[derive(Debug)]
pub struct PostUpgradeVerifier {
    plan: VerifierPlan,
    cursor: VerifierStep,
    completed: Vec<VerifierStep>,
    attempts: u32,
    waited: Duration,
}

impl PostUpgradeVerifier {
    /// Creates a verifier positioned on the first step.
    #[must_use]
    pub const fn new(plan: VerifierPlan) -> Self {
        Self {
            plan,
            cursor: VerifierStep::VersionCheck,
            completed: Vec::new(),
            attempts: 0,
            waited: Duration::ZERO,
        }
    }

    /// The step being run, or the one that failed.
    #[must_use]
    pub const fn current_step(&self) -> VerifierStep {
        self.cursor
    }

    /// Steps that finished successfully.
    #[must_use]
    pub fn completed(&self) -> &[VerifierStep] {
        &self.completed
    }

    /// The plan this verifier runs.
    #[must_use]
    pub const fn plan(&self) -> &VerifierPlan {
        &self.plan
    }

    /// `select distinct value = '<target>' ...` over every node's
    /// `min_observer_version`.
    #[must_use]
    pub fn version_statement(target_version: &str) -> String {
        format!(
            "select distinct value = '{}' from oceanbase.GV$OB_PARAMETERS where name='min_observer_version'",
            target_version.replace('\'', "''")
        )
    }

    /// Counts inspection items that have not succeeded.
    #[must_use]
    pub fn inspection_statement() -> &'static str {
        "select count(*) from oceanbase.__all_virtual_upgrade_inspection where info != 'succeed'"
    }

    /// Runs the remaining steps in order.
    ///
    /// On failure the cursor stays on the failed step and already enabled
    /// switches are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns the first step failure: [`CheckerError::VersionMismatch`],
    /// [`CheckerError::InspectionFailed`], [`CheckerError::SyncTimeout`],
    /// [`CheckerError::Query`] or [`CheckerError::Cancelled`].
    pub async fn run<S: SqlSession>(
        &mut self,
        gateway: &mut QueryGateway<S>,
        cancel: &CancellationToken,
    ) -> Result<VerificationReport, CheckerError> {
        while self.cursor != VerifierStep::Done {
            let step = self.cursor;
            tracing::info!(%step, "step started");

            let converged = match self.run_step(step, gateway, cancel).await {
                Ok(converged) => converged,
                Err(e) => {
                    tracing::info!(
                        %step,
                        completed = self.completed.len(),
                        "step failed, aborting remaining steps"
                    );
                    return Err(e);
                }
            };

            tracing::info!(
                %step,
                attempts = converged.attempts,
                waited = ?converged.waited,
                "step succeeded"
            );
            self.completed.push(step);
            self.attempts = self.attempts.saturating_add(converged.attempts);
            self.waited = self.waited.saturating_add(converged.waited);
            self.cursor = step.next();
        }

        tracing::info!(
            steps = self.completed.len(),
            attempts = self.attempts,
            waited = ?self.waited,
            "post-upgrade checks finished"
        );
        Ok(VerificationReport {
            completed: self.completed.clone(),
            attempts: self.attempts,
            waited: self.waited,
        })
    }

    async fn run_step<S: SqlSession>(
        &self,
        step: VerifierStep,
        gateway: &mut QueryGateway<S>,
        cancel: &CancellationToken,
    ) -> Result<Converged, CheckerError> {
        match step {
            VerifierStep::VersionCheck => self.check_cluster_version(gateway, cancel).await,
            VerifierStep::InspectionCheck => self.check_upgrade_inspection(gateway, cancel).await,
            VerifierStep::EnableDdl
            | VerifierStep::EnableRebalance
            | VerifierStep::EnableRereplication
            | VerifierStep::EnableMajorCompaction => {
                let switch = step.switch().ok_or_else(|| {
                    CheckerError::InvalidParameter(format!("{step} has no cluster switch"))
                })?;
                let parameter = ClusterParameter::enabled(switch)?;
                ParameterSynchronizer::new(self.plan.sync_policy)
                    .set_and_wait(gateway, &parameter, cancel)
                    .await
            }
            VerifierStep::Done => Ok(Converged {
                attempts: 0,
                waited: Duration::ZERO,
            }),
        }
    }

    async fn check_cluster_version<S: SqlSession>(
        &self,
        gateway: &mut QueryGateway<S>,
        cancel: &CancellationToken,
    ) -> Result<Converged, CheckerError> {
        let spec = PollSpec {
            label: VerifierStep::VersionCheck.name().to_string(),
            sql: Self::version_statement(&self.plan.target_version),
            predicate: version_converged,
            policy: self.plan.version_policy,
        };
        wait_for(gateway, &spec, cancel).await.map_err(|e| {
            e.into_checker_error(&spec.label, |attempts, waited| {
                tracing::warn!(target_version = %self.plan.target_version, attempts, "check cluster version timeout");
                CheckerError::VersionMismatch {
                    target_version: self.plan.target_version.clone(),
                    attempts,
                    waited,
                }
            })
        })
    }

    async fn check_upgrade_inspection<S: SqlSession>(
        &self,
        gateway: &mut QueryGateway<S>,
        cancel: &CancellationToken,
    ) -> Result<Converged, CheckerError> {
        let spec = PollSpec {
            label: VerifierStep::InspectionCheck.name().to_string(),
            sql: Self::inspection_statement().to_string(),
            predicate: inspection_succeeded,
            policy: self.plan.inspection_policy,
        };
        wait_for(gateway, &spec, cancel).await.map_err(|e| {
            e.into_checker_error(&spec.label, |attempts, waited| {
                tracing::warn!(attempts, "check upgrade inspection failed");
                CheckerError::InspectionFailed { attempts, waited }
            })
        })
    }
}

/// One row reading `1` means every node agrees on the target. Several rows
/// mean nodes still disagree. No rows, or rows of the wrong width, mean the
/// version view is unreadable.
fn version_converged(sql: &str, rows: &[ResultRow]) -> Result<bool, CheckerError> {
    if rows.is_empty() {
        return Err(CheckerError::malformed(sql, "no min_observer_version rows"));
    }
    if let Some(row) = rows.iter().find(|row| row.len() != 1) {
        return Err(CheckerError::malformed(
            sql,
            format!("expected exactly one column, got {}", row.len()),
        ));
    }
    Ok(matches!(rows, [row] if row.first() == Some(&Cell::Int(1))))
}

fn inspection_succeeded(sql: &str, rows: &[ResultRow]) -> Result<bool, CheckerError> {
    Ok(single_int(sql, rows)? == 0)
}
