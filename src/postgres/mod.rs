// PostgreSQL engine
//
// - config: connection setup and client encoding checks
// - params: binding `RowValues` to statement parameter types
// - query: row extraction, with text renderings for numeric, interval and friends
// - executor: the `Engine` implementation
// - sequence: insert-id sequence naming

pub mod config;
pub mod executor;
pub mod params;
pub mod query;
pub mod sequence;

pub use config::connect;
pub use executor::PostgresEngine;
pub use params::{Params, quote_literal};
pub use query::build_fetched_rows;
pub use sequence::{InsertSequence, default_sequence_name};
