use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Row};
use tracing::{debug, info, warn};

use super::params::MysqlParams;
use super::query::build_fetched_rows;
use crate::engine::{Engine, EngineStatement, Modification, PrepareMode};
use crate::error::SqlDuetError;
use crate::results::FetchedRows;
use crate::types::DatabaseType;

/// A live `mysql_async` connection plus the database every call switches to.
pub struct MysqlEngine {
    conn: Conn,
    database: String,
}

impl MysqlEngine {
    pub(crate) fn new(conn: Conn, database: String) -> Self {
        Self { conn, database }
    }

    fn last_modification(&self) -> Modification {
        Modification {
            affected_rows: self.conn.affected_rows(),
            insert_id: insert_id_of(self.conn.last_insert_id()),
        }
    }
}

/// A table without AUTO_INCREMENT reports 0, which is passed through.
fn insert_id_of(last_insert_id: Option<u64>) -> Option<i64> {
    i64::try_from(last_insert_id.unwrap_or(0)).ok()
}

/// Combine the outcome of a statement with the result of closing it.
///
/// The statement's own error wins; a close failure behind it is only logged.
fn settle<T>(
    outcome: Result<T, SqlDuetError>,
    closed: Result<(), SqlDuetError>,
) -> Result<T, SqlDuetError> {
    match (outcome, closed) {
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "closing statement failed after an execute error");
            Err(err)
        }
        (outcome, closed) => {
            closed?;
            outcome
        }
    }
}

/// Server error code and message, or the client error text.
fn native_parts(err: &mysql_async::Error) -> (Option<String>, String) {
    match err {
        mysql_async::Error::Server(server) => {
            (Some(server.code.to_string()), server.message.clone())
        }
        other => (None, other.to_string()),
    }
}

fn prepare_error(sql: &str, err: &mysql_async::Error) -> SqlDuetError {
    let (code, message) = native_parts(err);
    SqlDuetError::PrepareError {
        sql: sql.to_string(),
        code,
        message,
    }
}

fn execution_error(sql: &str, err: &mysql_async::Error) -> SqlDuetError {
    let (code, message) = native_parts(err);
    SqlDuetError::ExecutionError {
        sql: sql.to_string(),
        code,
        message,
    }
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[async_trait]
impl Engine for MysqlEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mysql
    }

    async fn select_database(&mut self, _schema: Option<&str>) -> Result<(), SqlDuetError> {
        let sql = format!("USE {}", quote_identifier(&self.database));
        self.conn
            .query_drop(sql.as_str())
            .await
            .map_err(|e| execution_error(&sql, &e))
    }

    async fn fetch(&mut self, stmt: EngineStatement<'_>) -> Result<FetchedRows, SqlDuetError> {
        match stmt.mode {
            PrepareMode::Prepared => {
                let bound = MysqlParams::bind(stmt.params)?;
                debug!(type_tags = bound.type_tags(), "binding mysql parameters");
                let handle = self
                    .conn
                    .prep(stmt.sql)
                    .await
                    .map_err(|e| prepare_error(stmt.sql, &e))?;
                let outcome = self
                    .conn
                    .exec::<Row, _, _>(&handle, bound.into_params())
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e));
                let columns = handle.columns().to_vec();
                // release the statement before looking at the outcome
                let closed = self.conn.close(handle).await.map_err(SqlDuetError::from);
                let rows = settle(outcome, closed)?;
                build_fetched_rows(Some(&columns), &rows)
            }
            PrepareMode::Direct => {
                let rows = self
                    .conn
                    .query::<Row, _>(stmt.sql)
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e))?;
                build_fetched_rows(None, &rows)
            }
        }
    }

    async fn modify(&mut self, stmt: EngineStatement<'_>) -> Result<Modification, SqlDuetError> {
        match stmt.mode {
            PrepareMode::Prepared => {
                let bound = MysqlParams::bind(stmt.params)?;
                debug!(type_tags = bound.type_tags(), "binding mysql parameters");
                let handle = self
                    .conn
                    .prep(stmt.sql)
                    .await
                    .map_err(|e| prepare_error(stmt.sql, &e))?;
                let outcome = self
                    .conn
                    .exec_drop(&handle, bound.into_params())
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e));
                let modification = self.last_modification();
                let closed = self.conn.close(handle).await.map_err(SqlDuetError::from);
                settle(outcome, closed)?;
                Ok(modification)
            }
            PrepareMode::Direct => {
                self.conn
                    .query_drop(stmt.sql)
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e))?;
                Ok(self.last_modification())
            }
        }
    }

    async fn execute_script(&mut self, sql: &str) -> Result<(), SqlDuetError> {
        self.conn
            .query_drop(sql)
            .await
            .map_err(|e| execution_error(sql, &e))
    }

    async fn begin(&mut self) -> Result<(), SqlDuetError> {
        self.execute_script("SET autocommit=0").await
    }

    async fn commit(&mut self) -> Result<(), SqlDuetError> {
        self.execute_script("COMMIT").await?;
        self.execute_script("SET autocommit=1").await
    }

    async fn rollback(&mut self) -> Result<(), SqlDuetError> {
        self.execute_script("ROLLBACK").await?;
        self.execute_script("SET autocommit=1").await
    }

    async fn close(self: Box<Self>) -> Result<(), SqlDuetError> {
        let MysqlEngine { conn, database } = *self;
        conn.disconnect().await?;
        info!(database = %database, "disconnected from mysql");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_backticked() {
        assert_eq!(quote_identifier("shop"), "`shop`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn zero_insert_id_is_reported() {
        assert_eq!(insert_id_of(None), Some(0));
        assert_eq!(insert_id_of(Some(42)), Some(42));
        assert_eq!(insert_id_of(Some(u64::MAX)), None);
    }

    fn execute_failed() -> SqlDuetError {
        SqlDuetError::ExecutionError {
            sql: "UPDATE t SET a = ?".into(),
            code: Some("1054".into()),
            message: "Unknown column 'a'".into(),
        }
    }

    #[test]
    fn execute_error_wins_over_close_error() {
        let closed = Err(SqlDuetError::ConnectionError("broken pipe".into()));
        let err = settle::<()>(Err(execute_failed()), closed).unwrap_err();
        assert!(matches!(err, SqlDuetError::ExecutionError { .. }));
    }

    #[test]
    fn close_error_surfaces_after_success() {
        let closed = Err(SqlDuetError::ConnectionError("broken pipe".into()));
        assert!(matches!(
            settle(Ok(3), closed),
            Err(SqlDuetError::ConnectionError(_))
        ));
        assert_eq!(settle(Ok(3), Ok(())).unwrap(), 3);
    }
}
