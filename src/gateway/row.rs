//! Driver-independent result rows.
//!
//! Every check the checker runs reads back a tiny result set (a count or a
//! boolean comparison), so rows are decoded into a small [`Cell`] enum
//! instead of being bound to typed structs.

use std::fmt;

use crate::error::CheckerError;

/// One column value of a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// SQL `NULL`.
    Null,
    /// Any integer column, including boolean comparisons (`0` / `1`).
    Int(i64),
    /// Any textual column.
    Text(String),
}

impl Cell {
    /// Returns the integer payload, if this is an [`Cell::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

/// A result row: one [`Cell`] per selected column.
pub type ResultRow = Vec<Cell>;

/// Extracts the single integer of a one-row, one-column result.
///
/// # Errors
///
/// Returns a [`CheckerError::Query`] with a malformed-result cause if the
/// result does not have exactly one row of exactly one integer column.
pub fn single_int(statement: &str, rows: &[ResultRow]) -> Result<i64, CheckerError> {
    let [row] = rows else {
        return Err(CheckerError::malformed(
            statement,
            format!("expected exactly one row, got {}", rows.len()),
        ));
    };
    let [cell] = row.as_slice() else {
        return Err(CheckerError::malformed(
            statement,
            format!("expected exactly one column, got {}", row.len()),
        ));
    };
    cell.as_int().ok_or_else(|| {
        CheckerError::malformed(statement, format!("expected an integer, got {cell}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_int_reads_count() {
        let rows = vec![vec![Cell::Int(3)]];
        let Ok(v) = single_int("select count(*)", &rows) else {
            unreachable!("well-formed result");
        };
        assert_eq!(v, 3);
    }

    #[test]
    fn zero_rows_is_malformed() {
        let result = single_int("select count(*)", &[]);
        let Err(err) = result else {
            unreachable!("empty result must fail");
        };
        assert_eq!(err.statement(), Some("select count(*)"));
        assert!(err.to_string().contains("got 0"));
    }

    #[test]
    fn two_rows_is_malformed() {
        let rows = vec![vec![Cell::Int(0)], vec![Cell::Int(0)]];
        assert!(single_int("q", &rows).is_err());
    }

    #[test]
    fn two_columns_is_malformed() {
        let rows = vec![vec![Cell::Int(0), Cell::Int(1)]];
        assert!(single_int("q", &rows).is_err());
    }

    #[test]
    fn text_or_null_is_malformed() {
        assert!(single_int("q", &[vec![Cell::Text("0".to_string())]]).is_err());
        assert!(single_int("q", &[vec![Cell::Null]]).is_err());
    }
}
