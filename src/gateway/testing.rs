//! In-memory cluster used by unit tests.
//!
//! [`ScriptedCluster`] answers the three checker queries from per-query
//! scripts and remembers every parameter written through
//! `alter system set`. A script replays its entries in order and then keeps
//! returning the last one.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use super::row::{Cell, ResultRow};
use super::session::SqlSession;

/// Nodes reported as lagging when an unscripted parameter has not been
/// written yet.
const UNSYNCED_NODES: i64 = 3;

#[derive(Debug, Default)]
struct Script<T> {
    replies: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    fn new(replies: Vec<T>) -> Self {
        Self {
            replies: replies.into(),
        }
    }

    fn next(&mut self) -> Option<T> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// Scripted stand-in for an OceanBase coordinator.
#[derive(Debug, Default)]
pub(crate) struct ScriptedCluster {
    version: Script<Vec<ResultRow>>,
    inspection: Script<Vec<ResultRow>>,
    sync: HashMap<String, Script<i64>>,
    params: HashMap<String, String>,
    statements: Vec<String>,
    fail_on: Option<String>,
}

impl ScriptedCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Version-check replies as `distinct value = target` results: `true`
    /// is a single converged row, `false` a single row reading 0.
    pub(crate) fn with_version(mut self, converged: Vec<bool>) -> Self {
        let replies = converged
            .into_iter()
            .map(|ok| vec![vec![Cell::Int(i64::from(ok))]])
            .collect();
        self.version = Script::new(replies);
        self
    }

    /// Raw version-check result sets.
    pub(crate) fn with_version_rows(mut self, replies: Vec<Vec<ResultRow>>) -> Self {
        self.version = Script::new(replies);
        self
    }

    /// Counts of inspection rows whose info is not `succeed`.
    pub(crate) fn with_inspection(mut self, counts: Vec<i64>) -> Self {
        let replies = counts.into_iter().map(|c| vec![vec![Cell::Int(c)]]).collect();
        self.inspection = Script::new(replies);
        self
    }

    /// Raw inspection result sets.
    pub(crate) fn with_inspection_rows(mut self, replies: Vec<Vec<ResultRow>>) -> Self {
        self.inspection = Script::new(replies);
        self
    }

    /// Per-node mismatch counts returned for `parameter`, overriding the
    /// stored value.
    pub(crate) fn with_sync(mut self, parameter: &str, mismatches: Vec<i64>) -> Self {
        self.sync
            .insert(parameter.to_string(), Script::new(mismatches));
        self
    }

    /// Fails any statement containing `needle` with a protocol error.
    pub(crate) fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Every statement received, in order.
    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.clone()
    }

    /// Number of statements containing `needle`.
    pub(crate) fn count_matching(&self, needle: &str) -> usize {
        self.statements.iter().filter(|s| s.contains(needle)).count()
    }

    /// Value last written for `parameter`.
    pub(crate) fn param(&self, parameter: &str) -> Option<&str> {
        self.params.get(parameter).map(String::as_str)
    }

    fn check_failure(&self, sql: &str) -> Result<(), sqlx::Error> {
        match &self.fail_on {
            Some(needle) if sql.contains(needle.as_str()) => Err(sqlx::Error::Protocol(format!(
                "scripted failure for {needle}"
            ))),
            _ => Ok(()),
        }
    }

    fn sync_count(&mut self, sql: &str) -> i64 {
        let name = quoted_after(sql, "name = ").unwrap_or_default();
        let value = quoted_after(sql, "value != ").unwrap_or_default();
        if let Some(script) = self.sync.get_mut(&name) {
            return script.next().unwrap_or(0);
        }
        match self.params.get(&name) {
            Some(current) if *current == value => 0,
            _ => UNSYNCED_NODES,
        }
    }
}

#[async_trait]
impl SqlSession for ScriptedCluster {
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        self.statements.push(sql.to_string());
        self.check_failure(sql)?;
        if let Some(rest) = sql.strip_prefix("alter system set ") {
            let name = rest.split('=').next().unwrap_or_default().trim().to_string();
            let value = quoted_after(rest, "=").unwrap_or_default();
            self.params.insert(name, value);
        }
        Ok(0)
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<ResultRow>, sqlx::Error> {
        self.statements.push(sql.to_string());
        self.check_failure(sql)?;
        let rows = if sql.contains("GV$OB_PARAMETERS") {
            self.version
                .next()
                .unwrap_or_else(|| vec![vec![Cell::Int(1)]])
        } else if sql.contains("__all_virtual_upgrade_inspection") {
            self.inspection
                .next()
                .unwrap_or_else(|| vec![vec![Cell::Int(0)]])
        } else if sql.contains("__all_virtual_sys_parameter_stat") {
            vec![vec![Cell::Int(self.sync_count(sql))]]
        } else {
            vec![vec![Cell::Int(1)]]
        };
        Ok(rows)
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// Reads the single-quoted literal that follows `marker`, undoing `''`
/// escapes.
fn quoted_after(sql: &str, marker: &str) -> Option<String> {
    let start = sql.find(marker)? + marker.len();
    let rest = sql.get(start..)?;
    let open = rest.find('\'')?;
    let mut chars = rest.get(open + 1..)?.chars().peekable();
    let mut out = String::new();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

/// A session whose statements never complete, as with a hung coordinator.
#[derive(Debug, Default)]
pub(crate) struct UnresponsiveSession;

#[async_trait]
impl SqlSession for UnresponsiveSession {
    async fn execute(&mut self, _sql: &str) -> Result<u64, sqlx::Error> {
        std::future::pending().await
    }

    async fn fetch_all(&mut self, _sql: &str) -> Result<Vec<ResultRow>, sqlx::Error> {
        std::future::pending().await
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
