use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::types::{FetchMode, RowValues};

/// A row from a query result
///
/// The fetch mode decides how values are reachable: by column name (`Assoc`), by
/// zero-based position (`Num`), or both (`Both`). Values keep column order either way.
#[derive(Debug, Clone)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    // shared across the rows of one result
    column_index_cache: Arc<HashMap<String, usize>>,
    mode: FetchMode,
}

impl Row {
    /// Create a row, building its own column lookup table.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>, mode: FetchMode) -> Self {
        let cache = Arc::new(column_index(&column_names));
        Self::with_cache(column_names, values, mode, cache)
    }

    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        values: Vec<RowValues>,
        mode: FetchMode,
        column_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
            mode,
        }
    }

    #[must_use]
    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Get a value by column name.
    ///
    /// Always `None` for rows fetched in `Num` mode.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        if !self.mode.by_name() {
            return None;
        }
        self.column_index_cache
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value by zero-based column position.
    ///
    /// Always `None` for rows fetched in `Assoc` mode.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        if !self.mode.by_index() {
            return None;
        }
        self.values.get(index)
    }

    /// Column names in result order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Values in column order, regardless of fetch mode.
    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render the row as JSON in its fetch shape: an object for `Assoc`, an array for
    /// `Num`, an object carrying positional and named keys for `Both`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self.mode {
            FetchMode::Num => JsonValue::Array(self.values.iter().map(RowValues::to_json).collect()),
            FetchMode::Assoc | FetchMode::Both => {
                let mut map = Map::new();
                for (idx, (name, value)) in self.column_names.iter().zip(&self.values).enumerate() {
                    if self.mode == FetchMode::Both {
                        map.insert(idx.to_string(), value.to_json());
                    }
                    map.insert(name.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
        }
    }
}

/// Column name to position; a repeated name maps to its last occurrence.
pub(crate) fn column_index(column_names: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        map.insert(name.clone(), i);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mode: FetchMode) -> Row {
        Row::new(
            Arc::new(vec!["id".into(), "lastname".into()]),
            vec![RowValues::Int(1), RowValues::Text("Robertson".into())],
            mode,
        )
    }

    #[test]
    fn assoc_is_name_only() {
        let row = sample(FetchMode::Assoc);
        assert_eq!(row.get("lastname").and_then(RowValues::as_text), Some("Robertson"));
        assert!(row.get_by_index(1).is_none());
        assert_eq!(row.to_json(), serde_json::json!({"id": 1, "lastname": "Robertson"}));
    }

    #[test]
    fn num_is_index_only() {
        let row = sample(FetchMode::Num);
        assert!(row.get("lastname").is_none());
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(1)));
        assert_eq!(row.to_json(), serde_json::json!([1, "Robertson"]));
    }

    #[test]
    fn both_has_both_keys() {
        let row = sample(FetchMode::Both);
        assert_eq!(row.get("id"), row.get_by_index(0));
        let json = row.to_json();
        assert_eq!(json["1"], "Robertson");
        assert_eq!(json["lastname"], "Robertson");
    }

    #[test]
    fn repeated_column_name_keeps_last_value() {
        // SELECT c.id, o.id FROM customers c JOIN orders o ...
        let row = Row::new(
            Arc::new(vec!["id".into(), "id".into()]),
            vec![RowValues::Int(1), RowValues::Int(7)],
            FetchMode::Both,
        );
        assert_eq!(row.get("id"), Some(&RowValues::Int(7)));
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(1)));
        assert_eq!(row.to_json()["id"], 7);
    }
}
