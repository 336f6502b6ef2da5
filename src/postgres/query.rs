use std::error::Error;
use std::net::IpAddr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};
use uuid::Uuid;

use crate::error::SqlDuetError;
use crate::results::FetchedRows;
use crate::types::RowValues;

/// Build fetched rows, taking column names from the statement metadata when available.
///
/// # Errors
/// Returns `SqlDuetError` if a column value cannot be read.
pub fn build_fetched_rows(
    columns: Option<&[tokio_postgres::Column]>,
    rows: &[Row],
) -> Result<FetchedRows, SqlDuetError> {
    let column_names: Vec<String> = match columns {
        Some(cols) => cols.iter().map(|c| c.name().to_string()).collect(),
        None => rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default(),
    };
    let column_count = column_names.len();

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        values.push(row_values);
    }

    Ok(FetchedRows::new(column_names, values))
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlDuetError` if the column cannot be retrieved.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlDuetError> {
    let type_info = row.columns()[idx].type_();

    match *type_info {
        Type::INT2 => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        Type::INT4 => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        Type::INT8 => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        Type::FLOAT4 => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))))
        }
        Type::FLOAT8 => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        Type::BOOL => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        Type::TIMESTAMP => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        Type::TIMESTAMPTZ => {
            let val: Option<chrono::DateTime<chrono::Utc>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())))
        }
        Type::DATE => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| {
                RowValues::Timestamp(v.and_time(chrono::NaiveTime::MIN))
            }))
        }
        Type::JSON | Type::JSONB => {
            let val: Option<Value> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        Type::BYTEA => Err(SqlDuetError::Unimplemented(format!(
            "binary column '{}' is not supported",
            row.columns()[idx].name()
        ))),
        _ => {
            let val: Option<RawCell<'_>> = row.try_get(idx)?;
            let Some(RawCell(raw)) = val else {
                return Ok(RowValues::Null);
            };
            let column = row.columns()[idx].name();
            match cell_text(type_info, raw) {
                Ok(Some(text)) => Ok(RowValues::Text(text)),
                Ok(None) => Err(SqlDuetError::Unimplemented(format!(
                    "column '{column}' has unsupported type {type_info}"
                ))),
                Err(e) => Err(SqlDuetError::Other(format!(
                    "cannot decode {type_info} column '{column}': {e}"
                ))),
            }
        }
    }
}

/// Undecoded binary cell.
struct RawCell<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawCell<'a> {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawCell(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Text form of a cell whose type has no dedicated `RowValues` variant.
///
/// `Ok(None)` means the type is not understood.
fn cell_text(ty: &Type, raw: &[u8]) -> Result<Option<String>, Box<dyn Error + Sync + Send>> {
    let text = match *ty {
        Type::NUMERIC => Decimal::from_sql(ty, raw)?.to_string(),
        Type::TIME => NaiveTime::from_sql(ty, raw)?.to_string(),
        Type::UUID => Uuid::from_sql(ty, raw)?.to_string(),
        Type::INET => IpAddr::from_sql(ty, raw)?.to_string(),
        Type::MONEY => money_text(i64::from_sql(ty, raw)?),
        Type::INTERVAL => interval_text(raw)?,
        _ if <&str as FromSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_)) => {
            <&str as FromSql>::from_sql(ty, raw)?.to_string()
        }
        _ => return Ok(None),
    };
    Ok(Some(text))
}

/// Money travels as an i64 count of cents.
fn money_text(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Render an interval the way the server's default `postgres` style does.
fn interval_text(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    let (Some(micros), Some(days), Some(months)) = (
        raw.get(0..8).and_then(|b| b.try_into().ok()).map(i64::from_be_bytes),
        raw.get(8..12).and_then(|b| b.try_into().ok()).map(i32::from_be_bytes),
        raw.get(12..16).and_then(|b| b.try_into().ok()).map(i32::from_be_bytes),
    ) else {
        return Err(format!("interval needs 16 bytes, got {}", raw.len()).into());
    };
    let unit = |n: i32, name: &str| format!("{n} {name}{}", if n == 1 { "" } else { "s" });

    let mut parts = Vec::new();
    if months / 12 != 0 {
        parts.push(unit(months / 12, "year"));
    }
    if months % 12 != 0 {
        parts.push(unit(months % 12, "mon"));
    }
    if days != 0 {
        parts.push(unit(days, "day"));
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let frac = abs % 1_000_000;
        if frac != 0 {
            clock.push_str(format!(".{frac:06}").trim_end_matches('0'));
        }
        parts.push(clock);
    }
    Ok(parts.join(" "))
}
