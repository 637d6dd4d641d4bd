//! MySQL-protocol implementation of [`SqlSession`] for OceanBase.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Connection, Executor, MySqlConnection, Row};

use super::row::{Cell, ResultRow};
use super::session::SqlSession;
use crate::config::ConnectionSettings;
use crate::error::CheckerError;

/// Schema every statement runs against.
const DEFAULT_DATABASE: &str = "oceanbase";

/// A single `sqlx::MySqlConnection` to the cluster coordinator.
///
/// Statements carry no bind arguments, so the driver sends them over the
/// text protocol; `ALTER SYSTEM` cannot be prepared. The connection runs in
/// autocommit mode, which is the server default.
#[derive(Debug)]
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl MySqlSession {
    /// Opens a session to the coordinator described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Connection`] if the handshake fails or does
    /// not complete within the configured connect timeout.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, CheckerError> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(DEFAULT_DATABASE);

        let attempt = tokio::time::timeout(
            settings.connect_timeout,
            MySqlConnection::connect_with(&options),
        )
        .await;

        let conn = match attempt {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(CheckerError::Connection {
                    host: settings.host.clone(),
                    port: settings.port,
                    cause: e.to_string(),
                });
            }
            Err(_) => {
                return Err(CheckerError::Connection {
                    host: settings.host.clone(),
                    port: settings.port,
                    cause: format!("timed out after {:?}", settings.connect_timeout),
                });
            }
        };

        tracing::info!(host = %settings.host, port = settings.port, "connected to coordinator");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        let result = Executor::execute(&mut self.conn, sql).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<ResultRow>, sqlx::Error> {
        let rows = Executor::fetch_all(&mut self.conn, sql).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}

/// Decodes every column of a row into a [`Cell`].
fn decode_row(row: &MySqlRow) -> ResultRow {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

/// Integers first, then text. Columns of any other type (e.g. `DECIMAL`)
/// arrive as text over the text protocol and are read unchecked; numeric
/// text is promoted to [`Cell::Int`].
fn decode_cell(row: &MySqlRow, idx: usize) -> Cell {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or(Cell::Null, Cell::Int);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map_or(Cell::Null, Cell::Text);
    }
    match row.try_get_unchecked::<Option<String>, _>(idx) {
        Ok(Some(s)) => s.trim().parse::<i64>().map_or(Cell::Text(s), Cell::Int),
        Ok(None) | Err(_) => Cell::Null,
    }
}
