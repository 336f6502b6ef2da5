use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlDuetError;

/// Which sequence yields the id of an inserted row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InsertSequence {
    /// `<table>_id_seq`, with the table taken from the INSERT statement.
    #[default]
    Auto,
    /// An explicit sequence name.
    Named(String),
    /// The table has no sequence; no id is looked up.
    Disabled,
}

impl InsertSequence {
    /// Sequence to read after running `sql`, or `None` when disabled.
    ///
    /// # Errors
    /// Returns `SqlDuetError::UnsupportedQuery` when `Auto` cannot find the target table.
    pub fn resolve(&self, sql: &str) -> Result<Option<String>, SqlDuetError> {
        match self {
            InsertSequence::Auto => default_sequence_name(sql).map(Some),
            InsertSequence::Named(name) => Ok(Some(name.clone())),
            InsertSequence::Disabled => Ok(None),
        }
    }
}

static INSERT_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)^\s*insert\s+into\s+("(?:[^"]|"")+"|[^\s."(]+)(?:\s*\.\s*("(?:[^"]|"")+"|[^\s."(]+))?"#,
    )
    .expect("insert target pattern is valid")
});

/// Name of the serial sequence for the table an INSERT writes to.
///
/// Handles extra whitespace, `schema.table` and double-quoted identifiers; a quoted table
/// yields a quoted sequence name.
///
/// # Errors
/// Returns `SqlDuetError::UnsupportedQuery` if no `INSERT INTO <table>` prefix is found.
pub fn default_sequence_name(sql: &str) -> Result<String, SqlDuetError> {
    let caps = INSERT_TARGET.captures(sql).ok_or_else(|| {
        SqlDuetError::UnsupportedQuery(format!("cannot find the target table of: {sql}"))
    })?;
    let first = caps.get(1).map_or("", |m| m.as_str());
    let (schema, table) = match caps.get(2) {
        Some(second) => (Some(first), second.as_str()),
        None => (None, first),
    };

    let sequence = match table.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(quoted) => format!("\"{quoted}_id_seq\""),
        None => format!("{table}_id_seq"),
    };
    Ok(match schema {
        Some(schema) => format!("{schema}.{sequence}"),
        None => sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_table() {
        assert_eq!(
            default_sequence_name("INSERT INTO customers (lastname) VALUES ($1)").unwrap(),
            "customers_id_seq"
        );
    }

    #[test]
    fn tolerates_whitespace_and_case() {
        assert_eq!(
            default_sequence_name("  insert\n  into\tcustomers(lastname) values ($1)").unwrap(),
            "customers_id_seq"
        );
    }

    #[test]
    fn schema_qualified_and_quoted() {
        assert_eq!(
            default_sequence_name("INSERT INTO test.customers VALUES ($1)").unwrap(),
            "test.customers_id_seq"
        );
        assert_eq!(
            default_sequence_name(r#"INSERT INTO "Sales" . "Customers" VALUES ($1)"#).unwrap(),
            r#""Sales"."Customers_id_seq""#
        );
    }

    #[test]
    fn policy_resolution() {
        let sql = "INSERT INTO customers VALUES ($1)";
        assert_eq!(
            InsertSequence::Named("cust_seq".into()).resolve(sql).unwrap(),
            Some("cust_seq".into())
        );
        assert_eq!(InsertSequence::Disabled.resolve(sql).unwrap(), None);
        assert!(InsertSequence::Auto.resolve("INSERT customers VALUES (1)").is_err());
    }
}
