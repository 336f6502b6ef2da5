//! A small facade over a MySQL-family and a `PostgreSQL` driver.
//!
//! Callers write SQL with one placeholder token (`?` by default) and pass parameters as
//! [`RowValues`]. The crate checks the placeholder count, rewrites the statement into the
//! engine's native marker style (or inlines literals in direct mode), binds the values,
//! runs the statement and materializes rows as name-keyed, index-keyed or both.
//!
//! ```rust,no_run
//! use sql_duet::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlDuetError> {
//! let settings = DbSettings::from_json(
//!     r#"{"engine": "mysql", "server": "localhost", "name": "shop",
//!         "user": "app", "password": "secret"}"#,
//! )?;
//! let mut db = Duet::new(settings, CacheSettings::default())?;
//! db.set_fetch_num();
//! db.select("SELECT id, lastname FROM customers WHERE gender = ?", &[RowValues::Int(1)])
//!     .await?;
//! for row in db.rows().unwrap_or_default() {
//!     println!("{:?}", row.get_by_index(1));
//! }
//! # Ok(())
//! # }
//! ```

pub mod prelude;

#[cfg(feature = "memcached")]
pub mod cache;
pub mod config;
pub mod duet;
pub mod engine;
pub mod error;
pub mod executor;
pub mod params;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "memcached")]
pub use cache::CacheClient;
pub use config::{CacheServer, CacheSettings, ConnectionConfig, DbSettings, Settings};
pub use duet::Duet;
pub use engine::{Engine, EngineStatement, Modification, PrepareMode};
pub use error::SqlDuetError;
pub use executor::QueryOptions;
pub use params::{TypeTag, type_tags};
pub use results::{ExecutionResult, FetchedRows, QueryData, Row};
pub use translation::{PlaceholderStyle, translate_placeholders};
pub use types::{DatabaseType, FetchMode, QueryKind, RowValues};

#[cfg(feature = "postgres")]
pub use postgres::InsertSequence;
