//! The seam between the checker and a live database connection.

use async_trait::async_trait;

use super::row::ResultRow;

/// One open database session with at most one statement in flight.
///
/// Implementors only move statements and rows; logging and error context
/// are added by [`super::QueryGateway`]. No implementation retries.
#[async_trait]
pub trait SqlSession: Send + Sized {
    /// Runs a statement that returns no rows and reports the affected row
    /// count.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the statement cannot be sent or the
    /// server rejects it.
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error>;

    /// Runs a query and returns every row.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the query cannot be sent, the server
    /// rejects it, or a row cannot be read.
    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<ResultRow>, sqlx::Error>;

    /// Closes the session, releasing the server-side connection.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the orderly shutdown fails; the
    /// connection is released either way.
    async fn close(self) -> Result<(), sqlx::Error>;
}
