#![cfg(all(feature = "postgres", feature = "mysql"))]

use std::io::Write;

use sql_duet::prelude::*;

#[test]
fn test05_settings_file_with_legacy_keys() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "database": {{
                "rdbms": "MYSQLI",
                "db_server": "db.internal",
                "db_name": "shop",
                "db_user": "app",
                "db_passwd": "secret",
                "db_port": 3307,
                "charset": "utf8mb4"
            }},
            "cache": {{
                "mc_pool": [{{"mc_server": "cache1", "mc_port": 11211}}]
            }}
        }}"#
    )?;

    let settings = Settings::from_file(file.path())?;
    assert_eq!(settings.database.engine.to_string(), "mysql");
    assert_eq!(settings.database.port, Some(3307));
    assert_eq!(settings.cache.servers, vec![CacheServer::new("cache1", 11211)]);

    let config = settings.database.validate()?;
    assert_eq!(config.server, "db.internal");
    assert_eq!(config.charset.as_deref(), Some("utf8mb4"));
    Ok(())
}

#[test]
fn test05_settings_file_without_cache() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{"database": {{"engine": "pg", "server": "localhost", "name": "shop",
             "user": "app", "password": "secret", "connect_timeout_secs": 5}}}}"#
    )?;

    let settings = Settings::from_file(file.path())?;
    assert!(settings.cache.is_empty());
    let duet = Duet::new(settings.database, settings.cache)?;
    assert_eq!(duet.database_type().to_string(), "postgres");
    assert_eq!(duet.connect_timeout(), Some(std::time::Duration::from_secs(5)));
    assert!(!duet.is_connected());
    Ok(())
}

#[test]
fn test05_unknown_engine_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{"database": {{"engine": "oracle", "server": "h", "name": "n", "user": "u", "password": "p"}}}}"#
    )?;
    let err = Settings::from_file(file.path()).unwrap_err();
    assert!(matches!(err, SqlDuetError::ConfigError(_)));
    assert!(err.to_string().contains("Database not supported"));
    Ok(())
}

#[test]
fn test05_missing_credentials_each_have_a_message() {
    let cases = [
        (r#"{"engine": "mysql", "name": "n", "user": "u", "password": "p"}"#, "Database server name or IP is required"),
        (r#"{"engine": "mysql", "server": "h", "user": "u", "password": "p"}"#, "Database name is required"),
        (r#"{"engine": "mysql", "server": "h", "name": "n", "password": "p"}"#, "Database user is required"),
        (r#"{"engine": "mysql", "server": "h", "name": "n", "user": "u"}"#, "Database password is required"),
    ];
    for (json, message) in cases {
        let settings = DbSettings::from_json(json).expect("parses");
        let err = Duet::new(settings, CacheSettings::default()).unwrap_err();
        assert!(
            err.to_string().ends_with(message),
            "expected '{message}', got '{err}'"
        );
    }
}

#[test]
fn test05_missing_file_is_a_config_error() {
    let err = Settings::from_file("/nonexistent/duet-settings.json").unwrap_err();
    assert!(matches!(err, SqlDuetError::ConfigError(_)));
}
