use thiserror::Error;

#[cfg(feature = "memcached")]
use memcache;
#[cfg(feature = "mysql")]
use mysql_async;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum SqlDuetError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MysqlError(#[from] mysql_async::Error),

    #[cfg(feature = "memcached")]
    #[error(transparent)]
    MemcacheError(#[from] memcache::MemcacheError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(
        "Number of variables ({params}) doesn't match number of parameters in statement ({placeholders})"
    )]
    PlaceholderCountMismatch { placeholders: usize, params: usize },

    #[error("Unsupported parameter type '{type_name}' at position {index}")]
    UnsupportedParameter {
        index: usize,
        type_name: &'static str,
    },

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("SQL prepare error{}: {message} (sql: {sql})", code_suffix(.code.as_deref()))]
    PrepareError {
        sql: String,
        code: Option<String>,
        message: String,
    },

    #[error("SQL execution error{}: {message} (sql: {sql})", code_suffix(.code.as_deref()))]
    ExecutionError {
        sql: String,
        code: Option<String>,
        message: String,
    },

    #[error("Query does not return one row (returned {rows})")]
    InvalidRowCount { rows: usize },

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

fn code_suffix(code: Option<&str>) -> String {
    code.map(|c| format!(" [{c}]")).unwrap_or_default()
}

impl SqlDuetError {
    /// Native error code attached to a prepare/execute failure, if the driver reported one.
    #[must_use]
    pub fn native_code(&self) -> Option<&str> {
        match self {
            SqlDuetError::PrepareError { code, .. } | SqlDuetError::ExecutionError { code, .. } => {
                code.as_deref()
            }
            _ => None,
        }
    }

    /// SQL text attached to a prepare/execute failure.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            SqlDuetError::PrepareError { sql, .. } | SqlDuetError::ExecutionError { sql, .. } => {
                Some(sql)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_reports_both_counts() {
        let err = SqlDuetError::PlaceholderCountMismatch {
            placeholders: 1,
            params: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("(2)"));
        assert!(msg.contains("(1)"));
    }

    #[test]
    fn execution_error_carries_code_and_sql() {
        let err = SqlDuetError::ExecutionError {
            sql: "INSERT INTO t VALUES (?)".into(),
            code: Some("1062".into()),
            message: "Duplicate entry".into(),
        };
        assert_eq!(err.native_code(), Some("1062"));
        assert_eq!(err.sql(), Some("INSERT INTO t VALUES (?)"));
        assert!(err.to_string().contains("[1062]"));
    }
}
