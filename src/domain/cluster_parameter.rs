//! Cluster-wide configuration keys.
//!
//! [`ClusterParameter`] is a validated `(name, value)` pair. The value is
//! always handled as text: the checker writes it and compares it back as a
//! string, never coercing it to a number or a boolean.

use std::fmt;

use crate::error::CheckerError;

/// A named cluster parameter and the value it should be set to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterParameter {
    name: String,
    value: String,
}

impl ClusterParameter {
    /// Creates a parameter after validating both parts.
    ///
    /// The name is spliced into SQL unquoted, so it is restricted to ASCII
    /// alphanumerics and `_`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::InvalidParameter`] if the name is empty or
    /// contains other characters, or if the value is empty.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, CheckerError> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() {
            return Err(CheckerError::InvalidParameter(
                "parameter name is empty".to_string(),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CheckerError::InvalidParameter(format!(
                "parameter name {name:?} contains characters outside [A-Za-z0-9_]"
            )));
        }
        if value.is_empty() {
            return Err(CheckerError::InvalidParameter(format!(
                "value for {name} is empty"
            )));
        }
        Ok(Self { name, value })
    }

    /// Boolean switch turned on, written as the literal `True`.
    ///
    /// # Errors
    ///
    /// Same as [`ClusterParameter::new`].
    pub fn enabled(name: &str) -> Result<Self, CheckerError> {
        Self::new(name, "True")
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target value, as text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Target value as a SQL string literal body (single quotes doubled).
    #[must_use]
    pub fn quoted_value(&self) -> String {
        self.value.replace('\'', "''")
    }
}

impl fmt::Display for ClusterParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = '{}'", self.name, self.value)
    }
}
