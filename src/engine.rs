use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::SqlDuetError;
use crate::results::FetchedRows;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "mysql")]
use crate::mysql;
#[cfg(feature = "postgres")]
use crate::postgres;

/// How a statement reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrepareMode {
    /// Prepare natively, bind parameters separately.
    #[default]
    Prepared,
    /// Inline parameter values as literals and run the text as-is.
    Direct,
}

/// A statement in native form, ready to run.
#[derive(Debug, Clone, Copy)]
pub struct EngineStatement<'a> {
    pub sql: &'a str,
    /// Empty in `Direct` mode; the values are already inlined.
    pub params: &'a [RowValues],
    pub mode: PrepareMode,
}

/// What an INSERT/UPDATE/DELETE reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modification {
    pub affected_rows: u64,
    /// Auto-increment id read off the connection, for engines that expose one.
    pub insert_id: Option<i64>,
}

/// One live native connection.
///
/// The query pipeline is written against this trait; each backend implements it once.
/// Statement and result handles opened by an implementation must be released before a
/// method returns, on success and on failure.
#[async_trait]
pub trait Engine: Send {
    fn database_type(&self) -> DatabaseType;

    /// Point the session at the configured database (MySQL family) or schema (`PostgreSQL`).
    async fn select_database(&mut self, schema: Option<&str>) -> Result<(), SqlDuetError>;

    /// Run a SELECT and fetch every row in cursor order.
    async fn fetch(&mut self, stmt: EngineStatement<'_>) -> Result<FetchedRows, SqlDuetError>;

    /// Run an INSERT, UPDATE or DELETE.
    async fn modify(&mut self, stmt: EngineStatement<'_>) -> Result<Modification, SqlDuetError>;

    /// Current value of a sequence in this session.
    async fn sequence_value(&mut self, sequence: &str) -> Result<i64, SqlDuetError> {
        Err(SqlDuetError::Unimplemented(format!(
            "{} has no sequence lookup (requested '{sequence}')",
            self.database_type()
        )))
    }

    /// Run a multi-statement script without parameters.
    async fn execute_script(&mut self, sql: &str) -> Result<(), SqlDuetError>;

    async fn begin(&mut self) -> Result<(), SqlDuetError>;

    async fn commit(&mut self) -> Result<(), SqlDuetError>;

    async fn rollback(&mut self) -> Result<(), SqlDuetError>;

    /// Close the native connection.
    async fn close(self: Box<Self>) -> Result<(), SqlDuetError>;
}

/// Open a native connection for `config.engine`.
///
/// # Errors
/// Returns `SqlDuetError::ConnectionError` (or `ConfigError` for settings the driver
/// cannot honour) when the connection cannot be established.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn Engine>, SqlDuetError> {
    match config.engine {
        #[cfg(feature = "mysql")]
        DatabaseType::Mysql => Ok(Box::new(mysql::connect(config).await?)),
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => Ok(Box::new(postgres::connect(config).await?)),
    }
}

/// Escape and quote `text` as a string literal for `db_type`.
#[must_use]
pub fn quote_literal(db_type: DatabaseType, text: &str) -> String {
    match db_type {
        #[cfg(feature = "mysql")]
        DatabaseType::Mysql => mysql::quote_literal(text),
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => postgres::quote_literal(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "postgres")]
    #[test]
    fn postgres_literal_doubles_quotes() {
        assert_eq!(
            quote_literal(DatabaseType::Postgres, "O'Hara"),
            "'O''Hara'"
        );
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn mysql_literal_escapes_quotes() {
        let quoted = quote_literal(DatabaseType::Mysql, "O'Hara");
        assert!(quoted.starts_with('\''));
        assert!(quoted.ends_with('\''));
        assert!(quoted.contains("O\\'Hara") || quoted.contains("O''Hara"));
    }
}
