use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::CacheSettings;
use crate::error::SqlDuetError;

/// Memcached client over the configured server pool.
///
/// Calls are synchronous and block the calling thread.
pub struct CacheClient {
    client: memcache::Client,
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient").finish_non_exhaustive()
    }
}

impl CacheClient {
    /// Connect to every server in `settings`.
    ///
    /// # Errors
    /// Returns `SqlDuetError::CacheError` when no server is configured, or the driver error
    /// when a server cannot be reached.
    pub fn connect(settings: &CacheSettings) -> Result<Self, SqlDuetError> {
        if settings.is_empty() {
            return Err(SqlDuetError::CacheError(
                "no memcached server configured".to_string(),
            ));
        }
        let urls: Vec<String> = settings.servers.iter().map(|s| s.url()).collect();
        let client = memcache::Client::connect(urls)?;
        info!(servers = settings.servers.len(), "connected to memcached");
        Ok(Self { client })
    }

    /// # Errors
    /// Returns the driver error when the lookup fails.
    pub fn get(&self, key: &str) -> Result<Option<String>, SqlDuetError> {
        Ok(self.client.get::<String>(key)?)
    }

    /// Store `value` under `key`; a `ttl_secs` of 0 never expires.
    ///
    /// # Errors
    /// Returns the driver error when the write fails.
    pub fn set(&self, key: &str, value: &str, ttl_secs: u32) -> Result<(), SqlDuetError> {
        Ok(self.client.set(key, value, ttl_secs)?)
    }

    /// Returns whether the key existed.
    ///
    /// # Errors
    /// Returns the driver error when the delete fails.
    pub fn delete(&self, key: &str) -> Result<bool, SqlDuetError> {
        Ok(self.client.delete(key)?)
    }

    /// # Errors
    /// Returns the driver error, or `SqlDuetError::CacheError` when the stored text is not
    /// valid JSON for `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SqlDuetError> {
        self.get(key)?
            .map(|text| {
                serde_json::from_str(&text).map_err(|e| {
                    SqlDuetError::CacheError(format!("cached value for '{key}' is not valid: {e}"))
                })
            })
            .transpose()
    }

    /// # Errors
    /// Returns `SqlDuetError::CacheError` when `value` cannot be serialized, or the driver
    /// error when the write fails.
    pub fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u32,
    ) -> Result<(), SqlDuetError> {
        let text = serde_json::to_string(value)
            .map_err(|e| SqlDuetError::CacheError(format!("cannot serialize '{key}': {e}")))?;
        self.set(key, &text, ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_rejected() {
        let err = CacheClient::connect(&CacheSettings::default()).unwrap_err();
        assert!(matches!(err, SqlDuetError::CacheError(_)));
    }
}
