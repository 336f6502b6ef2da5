use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{info, warn};

use super::executor::PostgresEngine;
use crate::config::ConnectionConfig;
use crate::error::SqlDuetError;

/// Open a connection and drive it on a background task.
///
/// # Errors
/// Returns `SqlDuetError::ConfigError` for a non-UTF-8 client encoding and
/// `SqlDuetError::ConnectionError` when the server cannot be reached or rejects the login.
pub async fn connect(config: &ConnectionConfig) -> Result<PostgresEngine, SqlDuetError> {
    if let Some(charset) = &config.charset {
        ensure_utf8(charset)?;
    }

    let pg_config = build_pg_config(config);
    let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
        SqlDuetError::ConnectionError(format!(
            "Failed to connect to Postgres at {}: {e}",
            config.server
        ))
    })?;

    let connection_task = tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(error = %e, "postgres connection task ended with an error");
        }
    });

    info!(server = %config.server, database = %config.name, "connected to postgres");
    Ok(PostgresEngine::new(client, connection_task))
}

fn build_pg_config(config: &ConnectionConfig) -> PgConfig {
    let mut pg_config = PgConfig::new();
    pg_config
        .host(&config.server)
        .dbname(&config.name)
        .user(&config.user)
        .password(&config.password);
    if let Some(port) = config.port {
        pg_config.port(port);
    }
    if let Some(timeout) = config.connect_timeout {
        pg_config.connect_timeout(timeout);
    }
    pg_config
}

/// The driver exchanges text as UTF-8 only.
fn ensure_utf8(charset: &str) -> Result<(), SqlDuetError> {
    let normalized = charset.to_ascii_lowercase().replace(['-', '_'], "");
    if matches!(normalized.as_str(), "utf8" | "unicode") {
        Ok(())
    } else {
        Err(SqlDuetError::ConfigError(format!(
            "Postgres client encoding must be UTF8, got '{charset}'"
        )))
    }
}
