mod result_set;
mod row;

pub use result_set::{ExecutionResult, FetchedRows, QueryData};
pub use row::Row;
