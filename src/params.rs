//! Engine-neutral half of parameter binding.
//!
//! Every parameter must be one of the scalar [`RowValues`] variants. The MySQL-family
//! driver additionally needs one [`TypeTag`] per value; the `PostgreSQL` driver types
//! values itself from the prepared statement.

use crate::error::SqlDuetError;
use crate::types::RowValues;

/// Wire type of a bound MySQL-family parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// `s`
    Str,
    /// `i`
    Int,
    /// `d`
    Double,
}

impl TypeTag {
    /// Tag for a parameter value.
    ///
    /// Booleans bind as integers; NULL binds as a string.
    ///
    /// # Errors
    /// Returns `SqlDuetError::UnsupportedParameter` for non-scalar values.
    pub fn for_value(index: usize, value: &RowValues) -> Result<Self, SqlDuetError> {
        match value {
            RowValues::Text(_) | RowValues::Null => Ok(TypeTag::Str),
            RowValues::Int(_) | RowValues::Bool(_) => Ok(TypeTag::Int),
            RowValues::Float(_) => Ok(TypeTag::Double),
            RowValues::Timestamp(_) | RowValues::JSON(_) => {
                Err(SqlDuetError::UnsupportedParameter {
                    index,
                    type_name: value.type_name(),
                })
            }
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            TypeTag::Str => 's',
            TypeTag::Int => 'i',
            TypeTag::Double => 'd',
        }
    }
}

/// Build the tag string for a parameter list, one character per value.
///
/// # Errors
/// Returns `SqlDuetError::UnsupportedParameter` for the first non-scalar value.
pub fn type_tags(params: &[RowValues]) -> Result<String, SqlDuetError> {
    params
        .iter()
        .enumerate()
        .map(|(idx, value)| TypeTag::for_value(idx, value).map(TypeTag::as_char))
        .collect()
}

/// Reject parameter lists containing values outside the supported scalar set.
///
/// # Errors
/// Returns `SqlDuetError::UnsupportedParameter` for the first offending value.
pub fn validate_params(params: &[RowValues]) -> Result<(), SqlDuetError> {
    for (idx, value) in params.iter().enumerate() {
        TypeTag::for_value(idx, value)?;
    }
    Ok(())
}

/// Render one parameter as an SQL literal for direct (non-prepared) execution.
pub(crate) fn sql_literal(
    index: usize,
    value: &RowValues,
    quote: impl Fn(&str) -> String,
) -> Result<String, SqlDuetError> {
    match value {
        RowValues::Text(s) => Ok(quote(s)),
        RowValues::Int(i) => Ok(i.to_string()),
        RowValues::Float(f) if f.is_finite() => Ok(f.to_string()),
        RowValues::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        RowValues::Null => Ok("NULL".to_string()),
        RowValues::Float(_) | RowValues::Timestamp(_) | RowValues::JSON(_) => {
            Err(SqlDuetError::UnsupportedParameter {
                index,
                type_name: value.type_name(),
            })
        }
    }
}
