//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{CacheServer, CacheSettings, DbSettings, Settings};
pub use crate::duet::Duet;
pub use crate::engine::{Engine, PrepareMode};
pub use crate::error::SqlDuetError;
pub use crate::results::{ExecutionResult, QueryData, Row};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{DatabaseType, FetchMode, RowValues};

#[cfg(feature = "memcached")]
pub use crate::cache::CacheClient;
#[cfg(feature = "postgres")]
pub use crate::postgres::InsertSequence;
