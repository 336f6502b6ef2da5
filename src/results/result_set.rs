use std::sync::Arc;

use super::row::{Row, column_index};
use crate::error::SqlDuetError;
use crate::types::{FetchMode, RowValues};

/// Rows as an engine hands them over: shared column names plus raw values in cursor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRows {
    pub column_names: Arc<Vec<String>>,
    pub rows: Vec<Vec<RowValues>>,
}

impl FetchedRows {
    #[must_use]
    pub fn new(column_names: Vec<String>, rows: Vec<Vec<RowValues>>) -> Self {
        Self {
            column_names: Arc::new(column_names),
            rows,
        }
    }

    /// Shape every row for `mode`, keeping cursor order.
    #[must_use]
    pub fn into_rows(self, mode: FetchMode) -> Vec<Row> {
        let cache = Arc::new(column_index(&self.column_names));
        self.rows
            .into_iter()
            .map(|values| Row::with_cache(self.column_names.clone(), values, mode, cache.clone()))
            .collect()
    }
}

/// Data produced by a SELECT.
#[derive(Debug, Clone)]
pub enum QueryData {
    /// Every fetched row.
    Rows(Vec<Row>),
    /// The one row of a single-row fetch.
    Row(Row),
}

impl QueryData {
    /// Materialize fetched rows, enforcing the one-row postcondition when `single_row` is set.
    ///
    /// # Errors
    /// Returns `SqlDuetError::InvalidRowCount` when `single_row` is set and the result
    /// does not hold exactly one row.
    pub fn materialize(
        fetched: FetchedRows,
        mode: FetchMode,
        single_row: bool,
    ) -> Result<Self, SqlDuetError> {
        let mut rows = fetched.into_rows(mode);
        if !single_row {
            return Ok(QueryData::Rows(rows));
        }
        match rows.len() {
            1 => Ok(QueryData::Row(rows.remove(0))),
            n => Err(SqlDuetError::InvalidRowCount { rows: n }),
        }
    }
}

/// Unified outcome of one query call.
///
/// Reset at the start of every call and left reset when the call fails.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub(crate) sql: Option<String>,
    pub(crate) data: Option<QueryData>,
    pub(crate) num_rows: Option<usize>,
    pub(crate) insert_id: Option<i64>,
    pub(crate) affected_rows: Option<u64>,
}

impl ExecutionResult {
    /// The SQL sent to the engine (native markers or inlined values).
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    #[must_use]
    pub fn data(&self) -> Option<&QueryData> {
        self.data.as_ref()
    }

    /// All rows of a multi-row SELECT.
    #[must_use]
    pub fn rows(&self) -> Option<&[Row]> {
        match &self.data {
            Some(QueryData::Rows(rows)) => Some(rows),
            _ => None,
        }
    }

    /// The row of a single-row SELECT.
    #[must_use]
    pub fn row(&self) -> Option<&Row> {
        match &self.data {
            Some(QueryData::Row(row)) => Some(row),
            _ => None,
        }
    }

    /// Number of rows a SELECT returned.
    #[must_use]
    pub fn num_rows(&self) -> Option<usize> {
        self.num_rows
    }

    /// Generated key of an INSERT.
    #[must_use]
    pub fn insert_id(&self) -> Option<i64> {
        self.insert_id
    }

    /// Rows touched by an INSERT, UPDATE or DELETE.
    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(n: i64) -> FetchedRows {
        FetchedRows::new(
            vec!["id".into()],
            (1..=n).map(|i| vec![RowValues::Int(i)]).collect(),
        )
    }

    #[test]
    fn single_row_requires_exactly_one() {
        assert!(matches!(
            QueryData::materialize(fetched(0), FetchMode::Assoc, true),
            Err(SqlDuetError::InvalidRowCount { rows: 0 })
        ));
        assert!(matches!(
            QueryData::materialize(fetched(2), FetchMode::Assoc, true),
            Err(SqlDuetError::InvalidRowCount { rows: 2 })
        ));
        let data = QueryData::materialize(fetched(1), FetchMode::Assoc, true).unwrap();
        let QueryData::Row(row) = data else {
            panic!("expected a single row");
        };
        assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
    }

    #[test]
    fn rows_keep_cursor_order() {
        let data = QueryData::materialize(fetched(3), FetchMode::Num, false).unwrap();
        let QueryData::Rows(rows) = data else {
            panic!("expected rows");
        };
        let ids: Vec<_> = rows.iter().map(|r| r.get_by_index(0).cloned()).collect();
        assert_eq!(
            ids,
            vec![
                Some(RowValues::Int(1)),
                Some(RowValues::Int(2)),
                Some(RowValues::Int(3))
            ]
        );
    }
}
