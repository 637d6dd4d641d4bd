//! Query gateway: the only path from the checker to the cluster.
//!
//! [`QueryGateway`] wraps one [`SqlSession`], logs every statement it runs,
//! and folds driver failures into [`CheckerError::Query`] together with the
//! offending statement. It never retries; retrying is the poller's job.
//!
//! A statement in flight races the gateway's [`CancellationToken`]; when the
//! token fires the statement is abandoned and [`CheckerError::Cancelled`] is
//! returned.

pub mod mysql;
pub mod row;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use mysql::MySqlSession;
pub use row::{Cell, ResultRow, single_int};
pub use session::SqlSession;

use tokio_util::sync::CancellationToken;

use crate::error::CheckerError;

/// Logging wrapper around a single open session.
#[derive(Debug)]
pub struct QueryGateway<S> {
    session: S,
    cancel: CancellationToken,
}

impl<S: SqlSession> QueryGateway<S> {
    /// Wraps an open session. Statements are never cancelled until a token
    /// is attached with [`QueryGateway::with_cancel`].
    #[must_use]
    pub fn new(session: S) -> Self {
        Self {
            session,
            cancel: CancellationToken::new(),
        }
    }

    /// Abandons any statement in flight once `cancel` fires.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs a statement and logs it with the affected row count.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Query`] if the session reports a failure, or
    /// [`CheckerError::Cancelled`] if the token fires first.
    pub async fn execute(&mut self, sql: &str) -> Result<u64, CheckerError> {
        self.run_execute(sql, true).await
    }

    /// Like [`QueryGateway::execute`] but without the success log line.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Query`] if the session reports a failure.
    pub async fn execute_quiet(&mut self, sql: &str) -> Result<u64, CheckerError> {
        self.run_execute(sql, false).await
    }

    /// Runs a query, logs it with the returned row count and returns the rows.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Query`] if the session reports a failure, or
    /// [`CheckerError::Cancelled`] if the token fires first.
    pub async fn query(&mut self, sql: &str) -> Result<Vec<ResultRow>, CheckerError> {
        self.run_query(sql, true).await
    }

    /// Like [`QueryGateway::query`] but without the success log line.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Query`] if the session reports a failure.
    pub async fn query_quiet(&mut self, sql: &str) -> Result<Vec<ResultRow>, CheckerError> {
        self.run_query(sql, false).await
    }

    /// Returns a reference to the wrapped session.
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Closes the wrapped session.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Query`] if the server-side teardown fails.
    pub async fn close(self) -> Result<(), CheckerError> {
        self.session.close().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to close session cleanly");
            CheckerError::driver("<close session>", e)
        })
    }

    async fn run_execute(&mut self, sql: &str, log_success: bool) -> Result<u64, CheckerError> {
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(abandoned(sql)),
            outcome = self.session.execute(sql) => outcome,
        };
        match outcome {
            Ok(rowcount) => {
                if log_success {
                    tracing::info!(statement = sql, rowcount, "succeed to execute sql");
                }
                Ok(rowcount)
            }
            Err(e) => {
                tracing::error!(statement = sql, error = %e, "fail to execute sql");
                Err(CheckerError::driver(sql, e))
            }
        }
    }

    async fn run_query(
        &mut self,
        sql: &str,
        log_success: bool,
    ) -> Result<Vec<ResultRow>, CheckerError> {
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(abandoned(sql)),
            outcome = self.session.fetch_all(sql) => outcome,
        };
        match outcome {
            Ok(rows) => {
                if log_success {
                    tracing::info!(statement = sql, rowcount = rows.len(), "succeed to execute query");
                }
                Ok(rows)
            }
            Err(e) => {
                tracing::error!(statement = sql, error = %e, "fail to execute query");
                Err(CheckerError::driver(sql, e))
            }
        }
    }
}

fn abandoned(sql: &str) -> CheckerError {
    tracing::warn!(statement = sql, "statement abandoned on cancellation");
    CheckerError::Cancelled {
        step: sql.to_string(),
        attempts: 0,
    }
}
