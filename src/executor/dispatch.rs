use crate::engine::{Engine, EngineStatement, PrepareMode};
use crate::error::SqlDuetError;
use crate::results::{ExecutionResult, QueryData};
use crate::types::{QueryKind, RowValues};

use super::plan::{QueryOptions, QueryPlan};

/// Run a planned call against a live engine and collect its result.
///
/// Order: select database/schema, execute (prepared or direct), then fetch rows for a
/// SELECT or read affected rows and the insert id otherwise.
///
/// # Errors
/// Returns the first engine failure, or `SqlDuetError::InvalidRowCount` when a single-row
/// fetch does not return exactly one row.
pub async fn run(
    engine: &mut dyn Engine,
    plan: &QueryPlan,
    params: &[RowValues],
    opts: &QueryOptions,
) -> Result<ExecutionResult, SqlDuetError> {
    engine.select_database(opts.schema.as_deref()).await?;

    let stmt = EngineStatement {
        sql: &plan.sql,
        params: match plan.mode {
            PrepareMode::Prepared => params,
            PrepareMode::Direct => &[],
        },
        mode: plan.mode,
    };

    let mut result = ExecutionResult {
        sql: Some(plan.sql.clone()),
        ..ExecutionResult::default()
    };

    if plan.kind == QueryKind::Select {
        let fetched = engine.fetch(stmt).await?;
        let row_count = fetched.rows.len();
        result.data = Some(QueryData::materialize(
            fetched,
            opts.fetch_mode,
            opts.single_row,
        )?);
        result.num_rows = Some(row_count);
    } else {
        let modification = engine.modify(stmt).await?;
        result.affected_rows = Some(modification.affected_rows);
        if plan.kind == QueryKind::Insert {
            result.insert_id = match &plan.sequence {
                Some(sequence) => Some(engine.sequence_value(sequence).await?),
                None => modification.insert_id,
            };
        }
    }

    Ok(result)
}
