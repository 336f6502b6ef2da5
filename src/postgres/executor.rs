use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::Client;
use tracing::{debug, info};

use super::params::Params;
use super::query::build_fetched_rows;
use crate::engine::{Engine, EngineStatement, Modification, PrepareMode};
use crate::error::SqlDuetError;
use crate::results::FetchedRows;
use crate::types::DatabaseType;

/// A `tokio_postgres` client plus the task driving its connection.
pub struct PostgresEngine {
    client: Client,
    connection_task: JoinHandle<()>,
}

impl PostgresEngine {
    pub(crate) fn new(client: Client, connection_task: JoinHandle<()>) -> Self {
        Self {
            client,
            connection_task,
        }
    }
}

/// SQLSTATE and message of a server-side error, or the client error text.
fn native_parts(err: &tokio_postgres::Error) -> (Option<String>, String) {
    match err.as_db_error() {
        Some(db) => (Some(db.code().code().to_string()), db.message().to_string()),
        None => (None, err.to_string()),
    }
}

fn prepare_error(sql: &str, err: &tokio_postgres::Error) -> SqlDuetError {
    let (code, message) = native_parts(err);
    SqlDuetError::PrepareError {
        sql: sql.to_string(),
        code,
        message,
    }
}

fn execution_error(sql: &str, err: &tokio_postgres::Error) -> SqlDuetError {
    let (code, message) = native_parts(err);
    SqlDuetError::ExecutionError {
        sql: sql.to_string(),
        code,
        message,
    }
}

#[async_trait]
impl Engine for PostgresEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn select_database(&mut self, schema: Option<&str>) -> Result<(), SqlDuetError> {
        // The database itself is fixed at connect time; only the schema can move.
        let Some(schema) = schema else {
            return Ok(());
        };
        let sql = format!("SET search_path TO {schema}");
        self.client
            .batch_execute(&sql)
            .await
            .map_err(|e| execution_error(&sql, &e))
    }

    async fn fetch(&mut self, stmt: EngineStatement<'_>) -> Result<FetchedRows, SqlDuetError> {
        match stmt.mode {
            PrepareMode::Prepared => {
                let prepared = self
                    .client
                    .prepare(stmt.sql)
                    .await
                    .map_err(|e| prepare_error(stmt.sql, &e))?;
                let params = Params::convert(stmt.params)?;
                let rows = self
                    .client
                    .query(&prepared, params.as_refs())
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e))?;
                build_fetched_rows(Some(prepared.columns()), &rows)
            }
            PrepareMode::Direct => {
                let rows = self
                    .client
                    .query(stmt.sql, &[])
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e))?;
                build_fetched_rows(None, &rows)
            }
        }
    }

    async fn modify(&mut self, stmt: EngineStatement<'_>) -> Result<Modification, SqlDuetError> {
        let affected_rows = match stmt.mode {
            PrepareMode::Prepared => {
                let prepared = self
                    .client
                    .prepare(stmt.sql)
                    .await
                    .map_err(|e| prepare_error(stmt.sql, &e))?;
                let params = Params::convert(stmt.params)?;
                self.client
                    .execute(&prepared, params.as_refs())
                    .await
                    .map_err(|e| execution_error(stmt.sql, &e))?
            }
            PrepareMode::Direct => self
                .client
                .execute(stmt.sql, &[])
                .await
                .map_err(|e| execution_error(stmt.sql, &e))?,
        };
        Ok(Modification {
            affected_rows,
            insert_id: None,
        })
    }

    async fn sequence_value(&mut self, sequence: &str) -> Result<i64, SqlDuetError> {
        const CURRVAL: &str = "SELECT currval($1::text::regclass)";
        debug!(sequence, "reading insert id");
        let row = self
            .client
            .query_one(CURRVAL, &[&sequence])
            .await
            .map_err(|e| execution_error(CURRVAL, &e))?;
        Ok(row.try_get::<_, i64>(0)?)
    }

    async fn execute_script(&mut self, sql: &str) -> Result<(), SqlDuetError> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| execution_error(sql, &e))
    }

    async fn begin(&mut self) -> Result<(), SqlDuetError> {
        self.execute_script("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), SqlDuetError> {
        self.execute_script("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), SqlDuetError> {
        self.execute_script("ROLLBACK").await
    }

    async fn close(self: Box<Self>) -> Result<(), SqlDuetError> {
        let PostgresEngine {
            client,
            connection_task,
        } = *self;
        // Dropping the last client handle ends the connection future.
        drop(client);
        connection_task
            .await
            .map_err(|e| SqlDuetError::ConnectionError(format!("connection task failed: {e}")))?;
        info!("disconnected from postgres");
        Ok(())
    }
}
