// MySQL-family engine (MySQL, MariaDB)
//
// - config: connection options, connect timeout, charset
// - params: binding with type tags and literal quoting
// - query: row extraction
// - executor: the `Engine` implementation

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::connect;
pub use executor::MysqlEngine;
pub use params::{MysqlParams, quote_literal};
pub use query::build_fetched_rows;
