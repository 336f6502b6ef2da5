use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlDuetError;
use crate::types::DatabaseType;

/// Database settings as supplied by the caller (code or a JSON file).
///
/// Credentials are optional here so a missing one is reported by [`DbSettings::validate`]
/// with its own message; keys written as `rdbms`/`db_server`/`db_name`/`db_user`/`db_passwd`/
/// `db_port` are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbSettings {
    #[serde(alias = "rdbms")]
    pub engine: DatabaseType,
    #[serde(default, alias = "db_server")]
    pub server: Option<String>,
    #[serde(default, alias = "db_name")]
    pub name: Option<String>,
    #[serde(default, alias = "db_user")]
    pub user: Option<String>,
    #[serde(default, alias = "db_passwd")]
    pub password: Option<String>,
    #[serde(default, alias = "db_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl DbSettings {
    #[must_use]
    pub fn new(
        engine: DatabaseType,
        server: Option<String>,
        name: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            engine,
            server,
            name,
            user,
            password,
            port: None,
            charset: None,
            connect_timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: Option<String>) -> Self {
        self.charset = charset;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, seconds: Option<u64>) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    /// Parse settings from JSON.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` for malformed JSON or an unsupported engine name.
    pub fn from_json(json: &str) -> Result<Self, SqlDuetError> {
        serde_json::from_str(json)
            .map_err(|e| SqlDuetError::ConfigError(format!("invalid database settings: {e}")))
    }

    /// Check that every required field is present.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<ConnectionConfig, SqlDuetError> {
        let server = required(&self.server, "Database server name or IP is required")?;
        let name = required(&self.name, "Database name is required")?;
        let user = required(&self.user, "Database user is required")?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| SqlDuetError::ConfigError("Database password is required".into()))?;

        Ok(ConnectionConfig {
            engine: self.engine,
            server,
            name,
            user,
            password,
            port: self.port,
            charset: self.charset.clone(),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
        })
    }
}

fn required(value: &Option<String>, message: &str) -> Result<String, SqlDuetError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(SqlDuetError::ConfigError(message.to_string())),
    }
}

/// Validated, fully-formed connection parameters handed to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub engine: DatabaseType,
    pub server: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub charset: Option<String>,
    pub connect_timeout: Option<Duration>,
}

/// One memcached server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheServer {
    #[serde(alias = "mc_server")]
    pub host: String,
    #[serde(alias = "mc_port")]
    pub port: u16,
}

impl CacheServer {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("memcache://{}:{}", self.host, self.port)
    }
}

/// Memcached pool; an empty pool disables the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default, alias = "mc_pool")]
    pub servers: Vec<CacheServer>,
}

impl CacheSettings {
    #[must_use]
    pub fn new(servers: Vec<CacheServer>) -> Self {
        Self { servers }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// Database and cache settings read together, e.g. by the `duet` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub database: DbSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Settings {
    /// Read settings from a JSON file.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SqlDuetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SqlDuetError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| SqlDuetError::ConfigError(format!("invalid settings file: {e}")))
    }
}
