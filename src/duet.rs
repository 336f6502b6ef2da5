use std::time::Duration;

use tracing::{info, warn};

#[cfg(feature = "memcached")]
use crate::cache::CacheClient;
use crate::config::{CacheSettings, ConnectionConfig, DbSettings};
use crate::engine::{self, Engine, PrepareMode};
use crate::error::SqlDuetError;
use crate::executor::{self, QueryOptions};
#[cfg(feature = "postgres")]
use crate::postgres::InsertSequence;
use crate::results::{ExecutionResult, QueryData, Row};
use crate::types::{DatabaseType, FetchMode, RowValues};

/// One database session plus an optional memcached pool.
///
/// The native connection opens on first use and stays open until [`Duet::disconnect`], a
/// connection setting changes, or the value is dropped. Every query call replaces the
/// previous [`ExecutionResult`]; a failed call leaves it empty.
///
/// ```rust,no_run
/// use sql_duet::prelude::*;
///
/// # async fn demo() -> Result<(), SqlDuetError> {
/// let settings = DbSettings::new(
///     DatabaseType::Postgres,
///     Some("localhost".into()),
///     Some("shop".into()),
///     Some("app".into()),
///     Some("secret".into()),
/// );
/// let mut db = Duet::new(settings, CacheSettings::default())?;
/// db.insert(
///     "INSERT INTO customers (lastname, firstname) VALUES (?, ?)",
///     &[RowValues::from("Robertson"), RowValues::from("Jerry")],
/// )
/// .await?;
/// let id = db.insert_id().unwrap_or_default();
///
/// db.set_fetch_single_row(true);
/// db.select("SELECT * FROM customers WHERE id = ?", &[RowValues::Int(id)]).await?;
/// assert_eq!(
///     db.row().and_then(|r| r.get("lastname")).and_then(RowValues::as_text),
///     Some("Robertson")
/// );
/// # Ok(())
/// # }
/// ```
pub struct Duet {
    settings: DbSettings,
    config: ConnectionConfig,
    cache_settings: CacheSettings,
    engine: Option<Box<dyn Engine>>,
    #[cfg(feature = "memcached")]
    cache: Option<CacheClient>,
    options: QueryOptions,
    result: ExecutionResult,
}

impl std::fmt::Debug for Duet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Duet")
            .field("engine", &self.config.engine)
            .field("server", &self.config.server)
            .field("database", &self.config.name)
            .field("connected", &self.engine.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Duet {
    /// Validate the settings; nothing is opened yet.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` when a required setting is missing.
    pub fn new(settings: DbSettings, cache_settings: CacheSettings) -> Result<Self, SqlDuetError> {
        let config = settings.validate()?;
        Ok(Self {
            settings,
            config,
            cache_settings,
            engine: None,
            #[cfg(feature = "memcached")]
            cache: None,
            options: QueryOptions::default(),
            result: ExecutionResult::default(),
        })
    }

    /// Use an already connected engine instead of opening one from the settings.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` when a required setting is missing or the engine
    /// speaks a different dialect than `settings.engine`.
    pub fn with_engine(
        settings: DbSettings,
        cache_settings: CacheSettings,
        engine: Box<dyn Engine>,
    ) -> Result<Self, SqlDuetError> {
        if engine.database_type() != settings.engine {
            return Err(SqlDuetError::ConfigError(format!(
                "engine is {} but settings name {}",
                engine.database_type(),
                settings.engine
            )));
        }
        let mut duet = Self::new(settings, cache_settings)?;
        duet.engine = Some(engine);
        Ok(duet)
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.config.engine
    }

    #[must_use]
    pub fn settings(&self) -> &DbSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    /// Open the native connection unless one is live.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConnectionError` when the server cannot be reached.
    pub async fn connect(&mut self) -> Result<(), SqlDuetError> {
        live_engine(&mut self.engine, &self.config).await?;
        Ok(())
    }

    /// Close the native connection, if any.
    ///
    /// # Errors
    /// Returns the driver error raised while closing.
    pub async fn disconnect(&mut self) -> Result<(), SqlDuetError> {
        if let Some(engine) = self.engine.take() {
            engine.close().await?;
        }
        Ok(())
    }

    fn drop_connection(&mut self, reason: &str) {
        if self.engine.take().is_some() {
            warn!(reason, "dropping live connection; the next call reconnects");
        }
    }

    // connection settings --------------------------------------------------

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.config.port
    }

    pub fn set_port(&mut self, port: Option<u16>) -> &mut Self {
        self.settings.port = port;
        self.config.port = port;
        self.drop_connection("port changed");
        self
    }

    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.config.charset.as_deref()
    }

    pub fn set_charset(&mut self, charset: Option<String>) -> &mut Self {
        self.settings.charset.clone_from(&charset);
        self.config.charset = charset;
        self.drop_connection("charset changed");
        self
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.config.connect_timeout
    }

    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.settings.connect_timeout_secs = timeout.map(|t| t.as_secs());
        self.config.connect_timeout = timeout;
        self.drop_connection("connect timeout changed");
        self
    }

    // query options --------------------------------------------------------

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.options.schema.as_deref()
    }

    /// `PostgreSQL` search path applied before every statement.
    pub fn set_schema(&mut self, schema: Option<String>) -> &mut Self {
        self.options.schema = schema;
        self
    }

    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.options.placeholder
    }

    /// Token callers write in SQL where a parameter goes.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` for an empty token.
    pub fn set_placeholder(&mut self, token: impl Into<String>) -> Result<&mut Self, SqlDuetError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SqlDuetError::ConfigError(
                "placeholder token must not be empty".to_string(),
            ));
        }
        self.options.placeholder = token;
        Ok(self)
    }

    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.options.fetch_mode
    }

    pub fn set_fetch_mode(&mut self, mode: FetchMode) -> &mut Self {
        self.options.fetch_mode = mode;
        self
    }

    pub fn set_fetch_assoc(&mut self) -> &mut Self {
        self.set_fetch_mode(FetchMode::Assoc)
    }

    pub fn set_fetch_num(&mut self) -> &mut Self {
        self.set_fetch_mode(FetchMode::Num)
    }

    pub fn set_fetch_both(&mut self) -> &mut Self {
        self.set_fetch_mode(FetchMode::Both)
    }

    #[must_use]
    pub fn fetch_single_row(&self) -> bool {
        self.options.single_row
    }

    /// When set, a SELECT must return exactly one row, exposed through [`Duet::row`].
    pub fn set_fetch_single_row(&mut self, single_row: bool) -> &mut Self {
        self.options.single_row = single_row;
        self
    }

    #[must_use]
    pub fn prepare_mode(&self) -> PrepareMode {
        self.options.prepare
    }

    pub fn set_prepare_mode(&mut self, mode: PrepareMode) -> &mut Self {
        self.options.prepare = mode;
        self
    }

    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn insert_sequence(&self) -> &InsertSequence {
        &self.options.insert_sequence
    }

    /// Where a `PostgreSQL` INSERT reads its new id from.
    #[cfg(feature = "postgres")]
    pub fn set_insert_sequence(&mut self, sequence: InsertSequence) -> &mut Self {
        self.options.insert_sequence = sequence;
        self
    }

    // queries --------------------------------------------------------------

    /// # Errors
    /// See [`Duet::query`].
    pub async fn select(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<&ExecutionResult, SqlDuetError> {
        self.query(sql, params).await
    }

    /// # Errors
    /// See [`Duet::query`].
    pub async fn insert(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<&ExecutionResult, SqlDuetError> {
        self.query(sql, params).await
    }

    /// # Errors
    /// See [`Duet::query`].
    pub async fn update(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<&ExecutionResult, SqlDuetError> {
        self.query(sql, params).await
    }

    /// # Errors
    /// See [`Duet::query`].
    pub async fn delete(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<&ExecutionResult, SqlDuetError> {
        self.query(sql, params).await
    }

    /// Run one SELECT, INSERT, UPDATE or DELETE. The statement kind comes from the SQL text.
    ///
    /// Placeholders are checked against `params` before anything is sent, so a mismatch
    /// never reaches the server.
    ///
    /// # Errors
    /// Returns `SqlDuetError::PlaceholderCountMismatch`, `UnsupportedParameter` or
    /// `UnsupportedQuery` for a malformed call, `ConnectionError` when the connection cannot
    /// be opened, `PrepareError`/`ExecutionError` with the native code and message when the
    /// server rejects the statement, and `InvalidRowCount` for a failed single-row fetch.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<&ExecutionResult, SqlDuetError> {
        self.result = ExecutionResult::default();
        let plan = executor::plan(self.config.engine, sql, params, &self.options)?;
        let engine = live_engine(&mut self.engine, &self.config).await?;
        self.result = executor::run(engine, &plan, params, &self.options).await?;
        Ok(&self.result)
    }

    /// Run a multi-statement script as-is, without parameters or preparation.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ExecutionError` with the native code and message on failure.
    pub async fn execute(&mut self, script: &str) -> Result<(), SqlDuetError> {
        self.result = ExecutionResult::default();
        let engine = live_engine(&mut self.engine, &self.config).await?;
        engine.select_database(self.options.schema.as_deref()).await?;
        engine.execute_script(script).await
    }

    // results --------------------------------------------------------------

    #[must_use]
    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// SQL last sent to the engine.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        self.result.sql()
    }

    #[must_use]
    pub fn data(&self) -> Option<&QueryData> {
        self.result.data()
    }

    #[must_use]
    pub fn rows(&self) -> Option<&[Row]> {
        self.result.rows()
    }

    #[must_use]
    pub fn row(&self) -> Option<&Row> {
        self.result.row()
    }

    #[must_use]
    pub fn num_rows(&self) -> Option<usize> {
        self.result.num_rows()
    }

    #[must_use]
    pub fn insert_id(&self) -> Option<i64> {
        self.result.insert_id()
    }

    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        self.result.affected_rows()
    }

    // transactions ---------------------------------------------------------

    /// Start a transaction on the session. Nesting is not supported.
    ///
    /// # Errors
    /// Returns the connection or driver error.
    pub async fn begin_transaction(&mut self) -> Result<(), SqlDuetError> {
        live_engine(&mut self.engine, &self.config).await?.begin().await
    }

    /// # Errors
    /// Returns the connection or driver error.
    pub async fn commit(&mut self) -> Result<(), SqlDuetError> {
        live_engine(&mut self.engine, &self.config).await?.commit().await
    }

    /// # Errors
    /// Returns the connection or driver error.
    pub async fn rollback(&mut self) -> Result<(), SqlDuetError> {
        live_engine(&mut self.engine, &self.config).await?.rollback().await
    }

    // SQL helpers ----------------------------------------------------------

    #[must_use]
    pub fn lower(&self, expr: &str) -> String {
        format!("LOWER({expr})")
    }

    #[must_use]
    pub fn limit(&self, row_count: u64, offset: u64) -> String {
        format!("LIMIT {row_count} OFFSET {offset}")
    }

    /// Quote `text` as a string literal for this engine.
    #[must_use]
    pub fn quote_literal(&self, text: &str) -> String {
        engine::quote_literal(self.config.engine, text)
    }

    // cache ----------------------------------------------------------------

    #[must_use]
    pub fn cache_settings(&self) -> &CacheSettings {
        &self.cache_settings
    }

    /// The memcached client, connecting on first use; `None` when no server is configured.
    ///
    /// # Errors
    /// Returns the driver error when a server cannot be reached.
    #[cfg(feature = "memcached")]
    pub fn cache(&mut self) -> Result<Option<&CacheClient>, SqlDuetError> {
        if self.cache_settings.is_empty() {
            return Ok(None);
        }
        if self.cache.is_none() {
            self.cache = Some(CacheClient::connect(&self.cache_settings)?);
        }
        Ok(self.cache.as_ref())
    }

    /// Cached value for `key`; `None` on a miss or when no cache is configured.
    ///
    /// # Errors
    /// Returns the driver error.
    #[cfg(feature = "memcached")]
    pub fn cache_get(&mut self, key: &str) -> Result<Option<String>, SqlDuetError> {
        match self.cache()? {
            Some(cache) => cache.get(key),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns `SqlDuetError::CacheError` when no cache is configured, or the driver error.
    #[cfg(feature = "memcached")]
    pub fn cache_set(&mut self, key: &str, value: &str, ttl_secs: u32) -> Result<(), SqlDuetError> {
        self.required_cache()?.set(key, value, ttl_secs)
    }

    /// Returns whether the key existed.
    ///
    /// # Errors
    /// Returns `SqlDuetError::CacheError` when no cache is configured, or the driver error.
    #[cfg(feature = "memcached")]
    pub fn cache_delete(&mut self, key: &str) -> Result<bool, SqlDuetError> {
        self.required_cache()?.delete(key)
    }

    /// # Errors
    /// Returns the driver error or a decoding error.
    #[cfg(feature = "memcached")]
    pub fn cache_get_json<T: serde::de::DeserializeOwned>(
        &mut self,
        key: &str,
    ) -> Result<Option<T>, SqlDuetError> {
        match self.cache()? {
            Some(cache) => cache.get_json(key),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns `SqlDuetError::CacheError` when no cache is configured or `value` cannot be
    /// serialized, or the driver error.
    #[cfg(feature = "memcached")]
    pub fn cache_set_json<T: serde::Serialize>(
        &mut self,
        key: &str,
        value: &T,
        ttl_secs: u32,
    ) -> Result<(), SqlDuetError> {
        self.required_cache()?.set_json(key, value, ttl_secs)
    }

    #[cfg(feature = "memcached")]
    fn required_cache(&mut self) -> Result<&CacheClient, SqlDuetError> {
        self.cache()?.ok_or_else(|| {
            SqlDuetError::CacheError("no memcached server configured".to_string())
        })
    }
}

/// The live engine in `slot`, opening it first when empty.
async fn live_engine<'a>(
    slot: &'a mut Option<Box<dyn Engine>>,
    config: &ConnectionConfig,
) -> Result<&'a mut (dyn Engine + 'static), SqlDuetError> {
    if slot.is_none() {
        let engine = engine::connect(config).await?;
        info!(engine = %config.engine, server = %config.server, "opened connection");
        *slot = Some(engine);
    }
    slot.as_deref_mut().ok_or_else(|| {
        SqlDuetError::ConnectionError("connection slot is empty after connect".to_string())
    })
}

#[cfg(all(test, feature = "postgres"))]
mod tests {
    use super::*;

    fn settings() -> DbSettings {
        DbSettings::new(
            DatabaseType::Postgres,
            Some("localhost".into()),
            Some("shop".into()),
            Some("app".into()),
            Some("secret".into()),
        )
    }

    #[test]
    fn helpers_render_sql() {
        let duet = Duet::new(settings(), CacheSettings::default()).unwrap();
        assert_eq!(duet.lower("lastname"), "LOWER(lastname)");
        assert_eq!(duet.limit(10, 20), "LIMIT 10 OFFSET 20");
        assert_eq!(duet.quote_literal("O'Hara"), "'O''Hara'");
    }

    #[test]
    fn empty_placeholder_is_rejected() {
        let mut duet = Duet::new(settings(), CacheSettings::default()).unwrap();
        assert!(duet.set_placeholder("").is_err());
        assert_eq!(duet.placeholder(), "?");
        duet.set_placeholder(":p").unwrap();
        assert_eq!(duet.placeholder(), ":p");
    }

    #[test]
    fn missing_password_fails_construction() {
        let mut s = settings();
        s.password = None;
        let err = Duet::new(s, CacheSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Database password is required");
    }

    #[cfg(feature = "memcached")]
    #[test]
    fn cache_without_servers() {
        let mut duet = Duet::new(settings(), CacheSettings::default()).unwrap();
        assert!(duet.cache().unwrap().is_none());
        assert_eq!(duet.cache_get("k").unwrap(), None);
        assert!(matches!(
            duet.cache_set("k", "v", 0),
            Err(SqlDuetError::CacheError(_))
        ));
    }
}
