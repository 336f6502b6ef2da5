use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::consts::ColumnType;
use mysql_async::{Column, Row, Value};

use crate::error::SqlDuetError;
use crate::results::FetchedRows;
use crate::types::RowValues;

/// Build fetched rows, taking column names from the statement metadata when available.
///
/// # Errors
/// Returns `SqlDuetError` if a value cannot be represented.
pub fn build_fetched_rows(
    columns: Option<&[Column]>,
    rows: &[Row],
) -> Result<FetchedRows, SqlDuetError> {
    let column_names: Vec<String> = match columns {
        Some(cols) => cols.iter().map(|c| c.name_str().into_owned()).collect(),
        None => rows
            .first()
            .map(|row| {
                row.columns_ref()
                    .iter()
                    .map(|c| c.name_str().into_owned())
                    .collect()
            })
            .unwrap_or_default(),
    };

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let columns = row.columns_ref();
        let mut row_values = Vec::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = row.as_ref(idx).unwrap_or(&Value::NULL);
            row_values.push(mysql_extract_value(column, value)?);
        }
        values.push(row_values);
    }

    Ok(FetchedRows::new(column_names, values))
}

/// Convert one cell. Binary-protocol results arrive typed; text-protocol results arrive as
/// bytes and are parsed by the column type.
///
/// # Errors
/// Returns `SqlDuetError::Unimplemented` for binary (non-UTF-8) data.
pub fn mysql_extract_value(column: &Column, value: &Value) -> Result<RowValues, SqlDuetError> {
    Ok(match value {
        Value::NULL => RowValues::Null,
        Value::Int(i) => RowValues::Int(*i),
        Value::UInt(u) => match i64::try_from(*u) {
            Ok(i) => RowValues::Int(i),
            Err(_) => RowValues::Text(u.to_string()),
        },
        Value::Float(f) => RowValues::Float(f64::from(*f)),
        Value::Double(d) => RowValues::Float(*d),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                // zero dates have no calendar value
                .map_or(RowValues::Null, RowValues::Timestamp)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = u64::from(*days) * 24 + u64::from(*hours);
            let sign = if *negative { "-" } else { "" };
            let text = if *micros == 0 {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}")
            } else {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
            };
            RowValues::Text(text)
        }
        Value::Bytes(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                SqlDuetError::Unimplemented(format!(
                    "binary column '{}' is not supported",
                    column.name_str()
                ))
            })?;
            parse_text(column.column_type(), text)
        }
    })
}

fn parse_text(column_type: ColumnType, text: &str) -> RowValues {
    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => text
            .parse()
            .map_or_else(|_| RowValues::Text(text.to_string()), RowValues::Int),
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => text
            .parse()
            .map_or_else(|_| RowValues::Text(text.to_string()), RowValues::Float),
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_DATE => parse_datetime(text),
        ColumnType::MYSQL_TYPE_JSON => serde_json::from_str(text)
            .map_or_else(|_| RowValues::Text(text.to_string()), RowValues::JSON),
        // DECIMAL stays text to keep its precision
        _ => RowValues::Text(text.to_string()),
    }
}

fn parse_datetime(text: &str) -> RowValues {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return RowValues::Timestamp(dt);
    }
    match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(date) => RowValues::Timestamp(date.and_time(chrono::NaiveTime::MIN)),
        Err(_) if text.starts_with("0000-00-00") => RowValues::Null,
        Err(_) => RowValues::Text(text.to_string()),
    }
}
