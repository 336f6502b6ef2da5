use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::SqlDuetError;

/// Values that can be bound as query parameters or read back from a fetched row.
///
/// Parameters are limited to the scalar variants (`Int`, `Float`, `Text`, `Bool`, `Null`);
/// `Timestamp` and `JSON` only appear in fetched rows and are rejected by the binder.
/// ```rust
/// use sql_duet::prelude::*;
///
/// let params = vec![
///     RowValues::Text("Robertson".into()),
///     RowValues::Int(1),
///     RowValues::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value, bound as an integer (1/0)
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "integer",
            RowValues::Float(_) => "double",
            RowValues::Text(_) => "string",
            RowValues::Bool(_) => "boolean",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::Null => "null",
            RowValues::JSON(_) => "json",
        }
    }

    /// Plain JSON rendering of the value (timestamps as `YYYY-MM-DD HH:MM:SS`).
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::from(s.as_str()),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Timestamp(dt) => {
                JsonValue::from(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(value) => value.clone(),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// The database engines behind the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// MySQL-family database (MySQL, `MariaDB`)
    #[cfg(feature = "mysql")]
    Mysql,
    /// `PostgreSQL` database
    #[cfg(feature = "postgres")]
    Postgres,
}

impl DatabaseType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            #[cfg(feature = "mysql")]
            DatabaseType::Mysql => "mysql",
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => "postgres",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = SqlDuetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            #[cfg(feature = "mysql")]
            "mysql" | "mysqli" | "mariadb" => Ok(DatabaseType::Mysql),
            #[cfg(feature = "postgres")]
            "postgres" | "postgresql" | "pg" => Ok(DatabaseType::Postgres),
            _ => Err(SqlDuetError::ConfigError(format!(
                "Database not supported: {s}"
            ))),
        }
    }
}

impl Serialize for DatabaseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DatabaseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Shape of fetched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FetchMode {
    /// Keyed by column name.
    #[default]
    Assoc,
    /// Keyed by zero-based column position.
    Num,
    /// Both keyings at once.
    Both,
}

impl FetchMode {
    #[must_use]
    pub fn by_name(self) -> bool {
        matches!(self, FetchMode::Assoc | FetchMode::Both)
    }

    #[must_use]
    pub fn by_index(self) -> bool {
        matches!(self, FetchMode::Num | FetchMode::Both)
    }
}

/// Statement kinds the query pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    /// Classify a statement by its leading keyword.
    ///
    /// # Errors
    /// Returns `SqlDuetError::UnsupportedQuery` when the first token is not one of
    /// `select`, `insert`, `update`, `delete`.
    pub fn classify(sql: &str) -> Result<Self, SqlDuetError> {
        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "select" => Ok(QueryKind::Select),
            "insert" => Ok(QueryKind::Insert),
            "update" => Ok(QueryKind::Update),
            "delete" => Ok(QueryKind::Delete),
            _ => Err(SqlDuetError::UnsupportedQuery(format!(
                "unsupported query type '{keyword}'"
            ))),
        }
    }

    /// True for INSERT, UPDATE and DELETE.
    #[must_use]
    pub fn is_dml(self) -> bool {
        !matches!(self, QueryKind::Select)
    }
}
