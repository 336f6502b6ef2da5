use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder};
use tracing::info;

use super::executor::MysqlEngine;
use crate::config::ConnectionConfig;
use crate::error::SqlDuetError;

/// Open a connection, bounded by the configured connect timeout.
///
/// # Errors
/// Returns `SqlDuetError::ConnectionError` when the server cannot be reached, rejects the
/// login or does not answer in time, and `SqlDuetError::ConfigError` for a malformed charset.
pub async fn connect(config: &ConnectionConfig) -> Result<MysqlEngine, SqlDuetError> {
    let charset = config.charset.as_deref().map(checked_charset).transpose()?;

    let opts = build_opts(config);
    let connecting = Conn::new(opts);
    let result = match config.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connecting).await.map_err(|_| {
            SqlDuetError::ConnectionError(format!(
                "Timed out after {}s connecting to MySQL at {}",
                limit.as_secs(),
                config.server
            ))
        })?,
        None => connecting.await,
    };
    let mut conn = result.map_err(|e| {
        SqlDuetError::ConnectionError(format!(
            "Failed to connect to MySQL at {}: {e}",
            config.server
        ))
    })?;

    if let Some(charset) = charset {
        conn.query_drop(format!("SET NAMES {charset}")).await?;
    }

    info!(server = %config.server, database = %config.name, "connected to mysql");
    Ok(MysqlEngine::new(conn, config.name.clone()))
}

fn build_opts(config: &ConnectionConfig) -> OptsBuilder {
    let mut opts = OptsBuilder::default()
        .ip_or_hostname(config.server.clone())
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()))
        .db_name(Some(config.name.clone()));
    if let Some(port) = config.port {
        opts = opts.tcp_port(port);
    }
    opts
}

/// Charset names are spliced into `SET NAMES`, so only identifier characters pass.
fn checked_charset(charset: &str) -> Result<&str, SqlDuetError> {
    let valid = !charset.is_empty()
        && charset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(charset)
    } else {
        Err(SqlDuetError::ConfigError(format!(
            "invalid MySQL charset '{charset}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_must_be_identifier() {
        assert_eq!(checked_charset("utf8mb4").unwrap(), "utf8mb4");
        assert!(checked_charset("utf8; DROP TABLE t").is_err());
        assert!(checked_charset("").is_err());
    }
}
