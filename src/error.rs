//! Checker error types.
//!
//! [`CheckerError`] is the single, closed error type for the checker. Every
//! variant carries the context needed to diagnose the failure from the log
//! alone: the offending statement, the step or parameter involved, and how
//! many polling attempts were spent before giving up.

use std::time::Duration;

/// Underlying cause of a failed statement.
#[derive(Debug, thiserror::Error)]
pub enum QueryCause {
    /// The driver or the server rejected the statement.
    #[error(transparent)]
    Driver(#[from] sqlx::Error),

    /// The statement succeeded but returned rows of an unexpected shape.
    #[error("malformed result: {0}")]
    MalformedResult(String),
}

/// Checker error enum.
///
/// # Categories
///
/// | Variant            | Raised by            | Retried? |
/// |--------------------|----------------------|----------|
/// | `Connection`       | session setup        | no       |
/// | `Query`            | query gateway        | no       |
/// | `VersionMismatch`  | version check        | no       |
/// | `InspectionFailed` | inspection check     | no       |
/// | `SyncTimeout`      | parameter sync       | no       |
/// | `Cancelled`        | poll loop, gateway   | no       |
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    /// The cluster coordinator could not be reached.
    #[error("cannot connect to {host}:{port}: {cause}")]
    Connection {
        /// Coordinator host.
        host: String,
        /// Coordinator port.
        port: u16,
        /// Driver-level cause, or a timeout description.
        cause: String,
    },

    /// A single statement failed.
    #[error("statement failed: {statement}: {cause}")]
    Query {
        /// The SQL text that was sent.
        statement: String,
        /// Why it failed.
        #[source]
        cause: QueryCause,
    },

    /// The cluster never reported the target version on every node.
    #[error(
        "cluster version did not converge to {target_version} after {attempts} attempts ({waited:?} waited)"
    )]
    VersionMismatch {
        /// Expected `min_observer_version`.
        target_version: String,
        /// Number of checks performed.
        attempts: u32,
        /// Total time slept between checks.
        waited: Duration,
    },

    /// The self-inspection never reached zero unfinished items.
    #[error("upgrade inspection did not succeed after {attempts} attempts ({waited:?} waited)")]
    InspectionFailed {
        /// Number of checks performed.
        attempts: u32,
        /// Total time slept between checks.
        waited: Duration,
    },

    /// Some node never observed a parameter change.
    #[error(
        "parameter {parameter} did not sync to '{value}' after {attempts} attempts ({waited:?} waited)"
    )]
    SyncTimeout {
        /// Parameter name.
        parameter: String,
        /// Value that was written.
        value: String,
        /// Number of checks performed.
        attempts: u32,
        /// Total time slept between checks.
        waited: Duration,
    },

    /// Polling or a statement in flight was interrupted before the check
    /// converged.
    #[error("{step} cancelled after {attempts} attempts")]
    Cancelled {
        /// Label of the interrupted check, or the abandoned statement.
        step: String,
        /// Number of checks performed before cancellation.
        attempts: u32,
    },

    /// A poll policy violates `max_attempts >= 1` or `interval > 0`.
    #[error("invalid poll policy: {0}")]
    InvalidPolicy(String),

    /// A cluster parameter name or value is unusable.
    #[error("invalid cluster parameter: {0}")]
    InvalidParameter(String),

    /// The log file could not be opened or the subscriber installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl CheckerError {
    /// Builds a [`CheckerError::Query`] for a driver failure.
    #[must_use]
    pub fn driver(statement: &str, err: sqlx::Error) -> Self {
        Self::Query {
            statement: statement.to_string(),
            cause: QueryCause::Driver(err),
        }
    }

    /// Builds a [`CheckerError::Query`] for a result of unexpected shape.
    #[must_use]
    pub fn malformed(statement: &str, detail: impl Into<String>) -> Self {
        Self::Query {
            statement: statement.to_string(),
            cause: QueryCause::MalformedResult(detail.into()),
        }
    }

    /// Returns `true` for the variants raised when a bounded retry budget
    /// runs out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch { .. } | Self::InspectionFailed { .. } | Self::SyncTimeout { .. }
        )
    }

    /// Returns the statement attached to a [`CheckerError::Query`], if any.
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Query { statement, .. } => Some(statement),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_grouped() {
        let version = CheckerError::VersionMismatch {
            target_version: "4.1.0.0".to_string(),
            attempts: 30,
            waited: Duration::from_secs(29),
        };
        let inspection = CheckerError::InspectionFailed {
            attempts: 180,
            waited: Duration::from_secs(1790),
        };
        let sync = CheckerError::SyncTimeout {
            parameter: "enable_ddl".to_string(),
            value: "True".to_string(),
            attempts: 10,
            waited: Duration::from_secs(45),
        };
        assert!(version.is_timeout());
        assert!(inspection.is_timeout());
        assert!(sync.is_timeout());
        assert!(!CheckerError::InvalidPolicy("x".to_string()).is_timeout());
    }

    #[test]
    fn query_error_keeps_statement() {
        let err = CheckerError::malformed("select 1", "expected one row, got 0");
        assert_eq!(err.statement(), Some("select 1"));
        let msg = err.to_string();
        assert!(msg.contains("select 1"));
        assert!(msg.contains("expected one row"));
    }

    #[test]
    fn driver_error_wraps_sqlx() {
        let err = CheckerError::driver("alter system set x = 'y'", sqlx::Error::RowNotFound);
        let CheckerError::Query { cause, .. } = &err else {
            unreachable!("driver() always builds Query");
        };
        assert!(matches!(cause, QueryCause::Driver(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn sync_timeout_names_parameter_and_value() {
        let err = CheckerError::SyncTimeout {
            parameter: "enable_rebalance".to_string(),
            value: "True".to_string(),
            attempts: 10,
            waited: Duration::from_secs(45),
        };
        let msg = err.to_string();
        assert!(msg.contains("enable_rebalance"));
        assert!(msg.contains("'True'"));
        assert!(msg.contains("10 attempts"));
    }
}
