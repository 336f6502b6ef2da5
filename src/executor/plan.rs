use tracing::debug;

use crate::engine::{PrepareMode, quote_literal};
use crate::error::SqlDuetError;
use crate::params::validate_params;
#[cfg(feature = "postgres")]
use crate::postgres::InsertSequence;
use crate::translation::{DEFAULT_PLACEHOLDER, PlaceholderStyle, SplitStatement};
use crate::types::{DatabaseType, FetchMode, QueryKind, RowValues};

/// Per-call knobs. The facade keeps one of these and hands it to every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub placeholder: String,
    pub fetch_mode: FetchMode,
    pub single_row: bool,
    pub prepare: PrepareMode,
    /// `PostgreSQL` search path; ignored by the MySQL family.
    pub schema: Option<String>,
    #[cfg(feature = "postgres")]
    pub insert_sequence: InsertSequence,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            fetch_mode: FetchMode::default(),
            single_row: false,
            prepare: PrepareMode::default(),
            schema: None,
            #[cfg(feature = "postgres")]
            insert_sequence: InsertSequence::default(),
        }
    }
}

impl QueryOptions {
    #[must_use]
    pub fn placeholder(mut self, token: impl Into<String>) -> Self {
        self.placeholder = token.into();
        self
    }

    #[must_use]
    pub fn fetch_mode(mut self, mode: FetchMode) -> Self {
        self.fetch_mode = mode;
        self
    }

    #[must_use]
    pub fn single_row(mut self, single_row: bool) -> Self {
        self.single_row = single_row;
        self
    }

    #[must_use]
    pub fn prepare(mut self, mode: PrepareMode) -> Self {
        self.prepare = mode;
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn insert_sequence(mut self, sequence: InsertSequence) -> Self {
        self.insert_sequence = sequence;
        self
    }
}

/// Everything decided about a call before the engine is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub kind: QueryKind,
    /// Native SQL: markers for prepared mode, inlined literals for direct mode.
    pub sql: String,
    pub mode: PrepareMode,
    /// Sequence holding the new id of a `PostgreSQL` INSERT.
    pub sequence: Option<String>,
}

/// Classify, translate and check a call.
///
/// Runs no native call, so every failure here leaves the connection untouched.
///
/// # Errors
/// Returns `SqlDuetError::UnsupportedQuery` for statements other than SELECT, INSERT, UPDATE
/// and DELETE, `SqlDuetError::PlaceholderCountMismatch` when the counts differ,
/// `SqlDuetError::UnsupportedParameter` for unbindable values, and
/// `SqlDuetError::ConfigError` for an empty placeholder token.
pub fn plan(
    db_type: DatabaseType,
    sql: &str,
    params: &[RowValues],
    opts: &QueryOptions,
) -> Result<QueryPlan, SqlDuetError> {
    let kind = QueryKind::classify(sql)?;
    let split = SplitStatement::new(sql, &opts.placeholder, PlaceholderStyle::for_database(db_type))?;
    split.check_param_count(params.len())?;

    let native_sql = match opts.prepare {
        PrepareMode::Prepared => {
            validate_params(params)?;
            split.render()
        }
        PrepareMode::Direct => split.inline(params, |text| quote_literal(db_type, text))?,
    };

    let sequence = insert_sequence(db_type, kind, sql, opts)?;

    debug!(
        engine = %db_type,
        ?kind,
        placeholders = split.placeholder_count(),
        mode = ?opts.prepare,
        sql = %native_sql,
        "translated statement"
    );

    Ok(QueryPlan {
        kind,
        sql: native_sql,
        mode: opts.prepare,
        sequence,
    })
}

#[cfg(feature = "postgres")]
fn insert_sequence(
    db_type: DatabaseType,
    kind: QueryKind,
    sql: &str,
    opts: &QueryOptions,
) -> Result<Option<String>, SqlDuetError> {
    if kind == QueryKind::Insert && db_type == DatabaseType::Postgres {
        opts.insert_sequence.resolve(sql)
    } else {
        Ok(None)
    }
}

#[cfg(not(feature = "postgres"))]
fn insert_sequence(
    _db_type: DatabaseType,
    _kind: QueryKind,
    _sql: &str,
    _opts: &QueryOptions,
) -> Result<Option<String>, SqlDuetError> {
    Ok(None)
}

#[cfg(all(test, feature = "postgres", feature = "mysql"))]
mod tests {
    use super::*;

    #[test]
    fn postgres_insert_gets_numbered_markers_and_sequence() {
        let params = [RowValues::Text("Robertson".into()), RowValues::Int(1)];
        let plan = plan(
            DatabaseType::Postgres,
            "INSERT INTO customers (lastname, gender) VALUES (?, ?)",
            &params,
            &QueryOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.kind, QueryKind::Insert);
        assert_eq!(plan.sql, "INSERT INTO customers (lastname, gender) VALUES ($1, $2)");
        assert_eq!(plan.sequence.as_deref(), Some("customers_id_seq"));
    }

    #[test]
    fn mysql_insert_has_no_sequence() {
        let plan = plan(
            DatabaseType::Mysql,
            "INSERT INTO customers (lastname) VALUES (?)",
            &[RowValues::Text("Robertson".into())],
            &QueryOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.sql, "INSERT INTO customers (lastname) VALUES (?)");
        assert_eq!(plan.sequence, None);
    }

    #[test]
    fn direct_mode_inlines_literals() {
        let opts = QueryOptions::default().prepare(PrepareMode::Direct);
        let plan = plan(
            DatabaseType::Postgres,
            "SELECT * FROM customers WHERE lastname = ? AND gender = ?",
            &[RowValues::Text("O'Hara".into()), RowValues::Bool(true)],
            &opts,
        )
        .unwrap();
        assert_eq!(
            plan.sql,
            "SELECT * FROM customers WHERE lastname = 'O''Hara' AND gender = 1"
        );
    }

    #[test]
    fn mismatch_is_rejected_before_anything_else() {
        let err = plan(
            DatabaseType::Mysql,
            "SELECT * FROM t WHERE a = ? AND b = ?",
            &[RowValues::Int(1)],
            &QueryOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SqlDuetError::PlaceholderCountMismatch {
                placeholders: 2,
                params: 1
            }
        ));
    }

    #[test]
    fn unknown_statement_kind() {
        assert!(matches!(
            plan(DatabaseType::Mysql, "SHOW TABLES", &[], &QueryOptions::default()),
            Err(SqlDuetError::UnsupportedQuery(_))
        ));
    }

    #[test]
    fn disabled_sequence_skips_lookup() {
        let opts = QueryOptions::default().insert_sequence(InsertSequence::Disabled);
        let plan = plan(
            DatabaseType::Postgres,
            "INSERT INTO audit_log VALUES (?)",
            &[RowValues::Int(1)],
            &opts,
        )
        .unwrap();
        assert_eq!(plan.sequence, None);
    }
}
