use mysql_async::{Params, Value};

use crate::error::SqlDuetError;
use crate::params::type_tags;
use crate::types::RowValues;

/// Bound parameters for one MySQL statement.
///
/// The type-tag string and the values are produced together from the same slice, so the
/// tags always describe exactly the values that are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct MysqlParams {
    type_tags: String,
    values: Vec<Value>,
}

impl MysqlParams {
    /// Build tags and native values for `params` in order.
    ///
    /// # Errors
    /// Returns `SqlDuetError::UnsupportedParameter` for a value outside the bindable set.
    pub fn bind(params: &[RowValues]) -> Result<Self, SqlDuetError> {
        let type_tags = type_tags(params)?;
        let values = params.iter().map(to_value).collect();
        Ok(Self { type_tags, values })
    }

    /// One character per parameter: `s` string, `i` integer, `d` double.
    #[must_use]
    pub fn type_tags(&self) -> &str {
        &self.type_tags
    }

    #[must_use]
    pub fn into_params(self) -> Params {
        if self.values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(self.values)
        }
    }
}

// Only called after `type_tags` accepted every value.
fn to_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Int(*i),
        RowValues::Bool(b) => Value::Int(i64::from(*b)),
        RowValues::Float(f) => Value::Double(*f),
        RowValues::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        RowValues::Null | RowValues::Timestamp(_) | RowValues::JSON(_) => Value::NULL,
    }
}

/// Escape and quote a string literal with backslash escapes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    Value::from(text).as_sql(false)
}
