//! Parameter synchronizer: write a cluster parameter, then wait until every
//! node reports the new value.

use tokio_util::sync::CancellationToken;

use super::poller::{PollSpec, wait_for};
use crate::domain::{ClusterParameter, Converged, PollPolicy};
use crate::error::CheckerError;
use crate::gateway::{QueryGateway, ResultRow, SqlSession, single_int};

/// Issues `alter system set` statements and confirms cluster-wide
/// propagation.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSynchronizer {
    policy: PollPolicy,
}

impl ParameterSynchronizer {
    /// Creates a synchronizer polling with `policy`.
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Poll budget used for the propagation check.
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// `alter system set <name> = '<value>'`
    #[must_use]
    pub fn set_statement(parameter: &ClusterParameter) -> String {
        format!(
            "alter system set {} = '{}'",
            parameter.name(),
            parameter.quoted_value()
        )
    }

    /// Counts nodes whose reported value differs from the target. The value
    /// is compared as text by the server.
    #[must_use]
    pub fn mismatch_statement(parameter: &ClusterParameter) -> String {
        format!(
            "select count(*) as cnt from oceanbase.__all_virtual_sys_parameter_stat \
             where name = '{}' and value != '{}'",
            parameter.name(),
            parameter.quoted_value()
        )
    }

    /// Writes `parameter` and waits until no node reports another value.
    ///
    /// # Errors
    ///
    /// - [`CheckerError::Query`] if the write or a check query fails, or a
    ///   check returns anything but a single count.
    /// - [`CheckerError::SyncTimeout`] if nodes still disagree after the
    ///   last attempt.
    /// - [`CheckerError::Cancelled`] if `cancel` fires first.
    pub async fn set_and_wait<S: SqlSession>(
        &self,
        gateway: &mut QueryGateway<S>,
        parameter: &ClusterParameter,
        cancel: &CancellationToken,
    ) -> Result<Converged, CheckerError> {
        gateway.execute(&Self::set_statement(parameter)).await?;

        let spec = PollSpec {
            label: format!("sync {}", parameter.name()),
            sql: Self::mismatch_statement(parameter),
            predicate: no_mismatch,
            policy: self.policy,
        };

        match wait_for(gateway, &spec, cancel).await {
            Ok(converged) => {
                tracing::info!(
                    parameter = parameter.name(),
                    value = parameter.value(),
                    attempts = converged.attempts,
                    "parameter is sync"
                );
                Ok(converged)
            }
            Err(e) => {
                let err = e.into_checker_error(&spec.label, |attempts, waited| {
                    CheckerError::SyncTimeout {
                        parameter: parameter.name().to_string(),
                        value: parameter.value().to_string(),
                        attempts,
                        waited,
                    }
                });
                if matches!(err, CheckerError::SyncTimeout { .. }) {
                    tracing::error!(
                        parameter = parameter.name(),
                        value = parameter.value(),
                        error = %err,
                        "parameter sync failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Returns how many nodes currently report a value other than
    /// `parameter.value()`, using the same query as the propagation check.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Query`] if the query fails or its result is
    /// not a single count.
    pub async fn read_back<S: SqlSession>(
        gateway: &mut QueryGateway<S>,
        parameter: &ClusterParameter,
    ) -> Result<i64, CheckerError> {
        let sql = Self::mismatch_statement(parameter);
        let rows = gateway.query(&sql).await?;
        single_int(&sql, &rows)
    }
}

impl Default for ParameterSynchronizer {
    fn default() -> Self {
        Self::new(PollPolicy::parameter_sync())
    }
}

fn no_mismatch(sql: &str, rows: &[ResultRow]) -> Result<bool, CheckerError> {
    Ok(single_int(sql, rows)? == 0)
}
