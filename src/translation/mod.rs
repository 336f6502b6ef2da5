use std::borrow::Cow;
use std::fmt::Write;

mod parsers;
mod scanner;

use scanner::{Lexer, split_on_token};

use crate::error::SqlDuetError;
use crate::params::sql_literal;
use crate::types::{DatabaseType, RowValues};

/// Placeholder token callers write in engine-neutral SQL unless configured otherwise.
pub const DEFAULT_PLACEHOLDER: &str = "?";

/// Native prepared-statement marker style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Positional `?` markers (MySQL family).
    QuestionMark,
    /// Numbered `$1..$N` markers (`PostgreSQL`).
    Numbered,
}

impl PlaceholderStyle {
    #[must_use]
    pub fn for_database(db_type: DatabaseType) -> Self {
        match db_type {
            #[cfg(feature = "mysql")]
            DatabaseType::Mysql => PlaceholderStyle::QuestionMark,
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => PlaceholderStyle::Numbered,
        }
    }

    fn lexer(self) -> Lexer {
        match self {
            PlaceholderStyle::QuestionMark => Lexer::Mysql,
            PlaceholderStyle::Numbered => Lexer::Postgres,
        }
    }
}

/// A statement cut at its placeholder tokens.
///
/// Holds `N + 1` literal segments for `N` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitStatement<'a> {
    segments: Vec<&'a str>,
    style: PlaceholderStyle,
}

impl<'a> SplitStatement<'a> {
    /// Split `sql` on `token`, skipping quoted strings, quoted identifiers and comments
    /// according to the lexical rules of the engine behind `style`.
    ///
    /// # Errors
    /// Returns `SqlDuetError::ConfigError` when `token` is empty.
    pub fn new(sql: &'a str, token: &str, style: PlaceholderStyle) -> Result<Self, SqlDuetError> {
        if token.is_empty() {
            return Err(SqlDuetError::ConfigError(
                "placeholder token must not be empty".to_string(),
            ));
        }
        Ok(Self {
            segments: split_on_token(sql, token, style.lexer()),
            style,
        })
    }

    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.segments.len() - 1
    }

    #[must_use]
    pub fn segments(&self) -> &[&'a str] {
        &self.segments
    }

    /// Fail unless exactly one parameter is supplied per placeholder.
    ///
    /// # Errors
    /// Returns `SqlDuetError::PlaceholderCountMismatch` carrying both counts.
    pub fn check_param_count(&self, params: usize) -> Result<(), SqlDuetError> {
        let placeholders = self.placeholder_count();
        if placeholders == params {
            Ok(())
        } else {
            Err(SqlDuetError::PlaceholderCountMismatch {
                placeholders,
                params,
            })
        }
    }

    /// Rejoin the segments with native markers; `$n` numbering follows occurrence order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.segments.iter().map(|s| s.len() + 3).sum());
        for (idx, part) in self.segments.iter().enumerate() {
            if idx > 0 {
                match self.style {
                    PlaceholderStyle::QuestionMark => out.push('?'),
                    PlaceholderStyle::Numbered => {
                        let _ = write!(out, "${idx}");
                    }
                }
            }
            out.push_str(part);
        }
        out
    }

    /// Rejoin the segments with the parameter values written in as SQL literals.
    ///
    /// Only for statements that cannot be prepared; the result is as safe as `quote` is.
    ///
    /// # Errors
    /// Returns a count mismatch, or `SqlDuetError::UnsupportedParameter` for values with
    /// no literal form.
    pub fn inline(
        &self,
        params: &[RowValues],
        quote: impl Fn(&str) -> String,
    ) -> Result<String, SqlDuetError> {
        self.check_param_count(params.len())?;
        let mut out = String::new();
        for (idx, part) in self.segments.iter().enumerate() {
            if idx > 0 {
                out.push_str(&sql_literal(idx - 1, &params[idx - 1], &quote)?);
            }
            out.push_str(part);
        }
        Ok(out)
    }
}

/// Rewrite engine-neutral SQL into the native marker style after checking the parameter count.
///
/// Returns a borrowed `Cow` when the text already is in native form.
///
/// # Errors
/// Returns `SqlDuetError::PlaceholderCountMismatch` when `param_count` differs from the number
/// of placeholders, or `SqlDuetError::ConfigError` for an empty token.
///
/// ```rust
/// use sql_duet::translation::{PlaceholderStyle, translate_placeholders};
///
/// let sql = translate_placeholders(
///     "SELECT * FROM customers WHERE lastname = ? AND gender = ?",
///     "?",
///     PlaceholderStyle::Numbered,
///     2,
/// )
/// .unwrap();
/// assert_eq!(sql, "SELECT * FROM customers WHERE lastname = $1 AND gender = $2");
/// ```
pub fn translate_placeholders<'a>(
    sql: &'a str,
    token: &str,
    style: PlaceholderStyle,
    param_count: usize,
) -> Result<Cow<'a, str>, SqlDuetError> {
    let split = SplitStatement::new(sql, token, style)?;
    split.check_param_count(param_count)?;
    if style == PlaceholderStyle::QuestionMark && token == "?" {
        return Ok(Cow::Borrowed(sql));
    }
    Ok(Cow::Owned(split.render()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_markers_left_to_right() {
        let res = translate_placeholders(
            "insert into t (a, b, c) values (?, ?, ?)",
            "?",
            PlaceholderStyle::Numbered,
            3,
        )
        .unwrap();
        assert_eq!(res, "insert into t (a, b, c) values ($1, $2, $3)");
    }

    #[test]
    fn question_mark_passthrough_is_borrowed() {
        let sql = "select * from t where a = ? and b = ?";
        let res = translate_placeholders(sql, "?", PlaceholderStyle::QuestionMark, 2).unwrap();
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    #[test]
    fn custom_token_is_rewritten() {
        let res = translate_placeholders(
            "update t set a = :p where id = :p",
            ":p",
            PlaceholderStyle::QuestionMark,
            2,
        )
        .unwrap();
        assert_eq!(res, "update t set a = ? where id = ?");
    }

    #[test]
    fn mismatch_reports_both_counts() {
        let err =
            translate_placeholders("SELECT * FROM t WHERE id=?", "?", PlaceholderStyle::Numbered, 2)
                .unwrap_err();
        assert!(matches!(
            err,
            SqlDuetError::PlaceholderCountMismatch {
                placeholders: 1,
                params: 2
            }
        ));
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"a?\" -- ?\n/* ? */ from t where a = ?";
        let split = SplitStatement::new(sql, "?", PlaceholderStyle::Numbered).unwrap();
        assert_eq!(split.placeholder_count(), 1);
        assert_eq!(
            split.render(),
            "select '?', \"a?\" -- ?\n/* ? */ from t where a = $1"
        );
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$body$ select ? $body$ where a = ?";
        let split = SplitStatement::new(sql, "?", PlaceholderStyle::Numbered).unwrap();
        assert_eq!(split.render(), "$body$ select ? $body$ where a = $1");
    }

    #[test]
    fn mysql_backslash_escapes_and_backticks() {
        let sql = r"select 'it\'s ?', `col?` from t # ?
 where a = ?";
        let split = SplitStatement::new(sql, "?", PlaceholderStyle::QuestionMark).unwrap();
        assert_eq!(split.placeholder_count(), 1);
    }

    #[test]
    fn segments_count_is_placeholders_plus_one() {
        let split = SplitStatement::new("? ? ?", "?", PlaceholderStyle::Numbered).unwrap();
        assert_eq!(split.segments(), &["", " ", " ", ""]);
        assert_eq!(split.render(), "$1 $2 $3");
    }

    #[test]
    fn inline_renders_literals() {
        let split = SplitStatement::new(
            "insert into t values (?, ?, ?, ?, ?)",
            "?",
            PlaceholderStyle::QuestionMark,
        )
        .unwrap();
        let sql = split
            .inline(
                &[
                    RowValues::Text("O'Hara".into()),
                    RowValues::Int(3),
                    RowValues::Float(1.5),
                    RowValues::Bool(true),
                    RowValues::Null,
                ],
                |s| format!("'{}'", s.replace('\'', "''")),
            )
            .unwrap();
        assert_eq!(sql, "insert into t values ('O''Hara', 3, 1.5, 1, NULL)");
    }

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(
            SplitStatement::new("select 1", "", PlaceholderStyle::Numbered),
            Err(SqlDuetError::ConfigError(_))
        ));
    }

    #[test]
    fn multibyte_text_survives() {
        let res = translate_placeholders(
            "select 'Ελλάδα' as c where x = ?",
            "?",
            PlaceholderStyle::Numbered,
            1,
        )
        .unwrap();
        assert_eq!(res, "select 'Ελλάδα' as c where x = $1");
    }
}
