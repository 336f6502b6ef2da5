use std::error::Error;

use tokio_postgres::types::{Format, IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::SqlDuetError;
use crate::params::validate_params;
use crate::types::RowValues;

/// Container for Postgres parameters with lifetime tracking
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Check and convert a slice of `RowValues` to Postgres parameters.
    ///
    /// # Errors
    /// Returns `SqlDuetError::UnsupportedParameter` for non-scalar values.
    pub fn convert(params: &'a [RowValues]) -> Result<Params<'a>, SqlDuetError> {
        validate_params(params)?;
        let mut references = Vec::with_capacity(params.len());
        for p in params {
            references.push(p as &(dyn ToSql + Sync));
        }
        Ok(Params { references })
    }

    /// Get a reference to the underlying parameter array
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

/// Escape and quote a string literal the way the server expects it.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    postgres_protocol::escape::escape_literal(text)
}

// The prepared statement decides the wire type. Values the binary encoders cannot
// carry (numeric, date, uuid, ...) go over in text form and the server parses them.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if !self.binds_natively(ty) {
            return match self.text_form() {
                Some(text) => {
                    out.extend_from_slice(text.as_bytes());
                    Ok(IsNull::No)
                }
                None => Err(mismatch(self, ty)),
            };
        }
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => int_to_sql(*i, ty, out),
            RowValues::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ => int_to_sql(i64::from(*b), ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            RowValues::Text(s) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => int_to_sql(s.trim().parse()?, ty, out),
                Type::FLOAT4 | Type::FLOAT8 => RowValues::Float(s.trim().parse()?).to_sql(ty, out),
                Type::BOOL => parse_bool(s).ok_or_else(|| mismatch(self, ty))?.to_sql(ty, out),
                _ => s.as_str().to_sql(ty, out),
            },
            RowValues::Timestamp(dt) => dt.to_sql(ty, out),
            RowValues::JSON(value) => value.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // checked per value in `to_sql`
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if self.binds_natively(ty) {
            Format::Binary
        } else {
            Format::Text
        }
    }

    to_sql_checked!();
}

impl RowValues {
    /// Whether `to_sql` writes the binary encoding of `ty` for this value.
    fn binds_natively(&self, ty: &Type) -> bool {
        let numeric = matches!(
            *ty,
            Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8 | Type::BOOL
        );
        let textual = <&str as ToSql>::accepts(ty);
        match self {
            RowValues::Null | RowValues::Timestamp(_) | RowValues::JSON(_) => true,
            RowValues::Int(_) | RowValues::Bool(_) | RowValues::Text(_) => numeric || textual,
            RowValues::Float(_) => matches!(*ty, Type::FLOAT4 | Type::FLOAT8),
        }
    }

    /// Text-format rendering the server parses with the parameter type's input function.
    fn text_form(&self) -> Option<String> {
        match self {
            RowValues::Int(i) => Some(i.to_string()),
            RowValues::Float(f) => Some(f.to_string()),
            RowValues::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            RowValues::Text(s) => Some(s.clone()),
            RowValues::Null | RowValues::Timestamp(_) | RowValues::JSON(_) => None,
        }
    }
}

fn int_to_sql(
    value: i64,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        _ => value.to_string().as_str().to_sql(ty, out),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" | "on" => Some(true),
        "f" | "false" | "0" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn mismatch(value: &RowValues, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind a {} value to a {} parameter", value.type_name(), ty).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &RowValues, ty: &Type) -> Result<Vec<u8>, Box<dyn Error + Sync + Send>> {
        let mut buf = bytes::BytesMut::new();
        value.to_sql(ty, &mut buf)?;
        Ok(buf.to_vec())
    }

    #[test]
    fn ints_narrow_to_column_width() {
        assert_eq!(encode(&RowValues::Int(1), &Type::INT4).unwrap(), vec![0, 0, 0, 1]);
        assert!(encode(&RowValues::Int(i64::MAX), &Type::INT4).is_err());
    }

    #[test]
    fn bool_binds_as_integer() {
        assert_eq!(encode(&RowValues::Bool(true), &Type::INT2).unwrap(), vec![0, 1]);
        assert_eq!(encode(&RowValues::Bool(false), &Type::BOOL).unwrap(), vec![0]);
    }

    #[test]
    fn text_parses_into_numeric_columns() {
        assert_eq!(
            encode(&RowValues::Text(" 7 ".into()), &Type::INT8).unwrap(),
            7_i64.to_be_bytes().to_vec()
        );
        assert!(encode(&RowValues::Text("seven".into()), &Type::INT8).is_err());
    }

    fn is_text_format(value: &RowValues, ty: &Type) -> bool {
        matches!(value.encode_format(ty), Format::Text)
    }

    #[test]
    fn server_typed_parameters_take_text_form() {
        let cases = [
            (RowValues::Float(9.99), Type::NUMERIC, "9.99"),
            (RowValues::Int(10), Type::NUMERIC, "10"),
            (RowValues::Text("12.50".into()), Type::NUMERIC, "12.50"),
            (RowValues::Text("2024-05-01".into()), Type::DATE, "2024-05-01"),
            (
                RowValues::Text("2024-05-01 10:00:00".into()),
                Type::TIMESTAMP,
                "2024-05-01 10:00:00",
            ),
            (RowValues::Bool(true), Type::NUMERIC, "1"),
        ];
        for (value, ty, expected) in cases {
            assert!(is_text_format(&value, &ty), "{value:?} -> {ty}");
            assert_eq!(encode(&value, &ty).unwrap(), expected.as_bytes(), "{value:?} -> {ty}");
        }
    }

    #[test]
    fn float_into_text_column() {
        assert!(is_text_format(&RowValues::Float(1.5), &Type::TEXT));
        assert_eq!(encode(&RowValues::Float(1.5), &Type::TEXT).unwrap(), b"1.5");
    }

    #[test]
    fn native_types_stay_binary() {
        assert!(!is_text_format(&RowValues::Int(1), &Type::INT4));
        assert!(!is_text_format(&RowValues::Float(1.0), &Type::FLOAT8));
        assert!(!is_text_format(&RowValues::Text("x".into()), &Type::VARCHAR));
    }

    #[test]
    fn null_is_null_for_any_type() {
        let mut buf = bytes::BytesMut::new();
        assert!(matches!(
            RowValues::Null.to_sql(&Type::TIMESTAMP, &mut buf).unwrap(),
            IsNull::Yes
        ));
    }

    #[test]
    fn convert_rejects_json() {
        let params = [RowValues::JSON(serde_json::json!([1]))];
        assert!(Params::convert(&params).is_err());
    }
}
