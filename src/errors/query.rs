//! Query error types
//!
//! Errors raised at the engine boundary. They are always recovered at the
//! call site and rendered into the result pane of the demo that issued the
//! query.
//!
//! # Examples
//!
//! ```rust
//! use geodemo::errors::QueryError;
//!
//! let err = QueryError::from_engine_message(
//!     "Catalog Error: Table with name temples_osm does not exist!",
//! );
//! assert!(err.is_missing_table());
//! ```

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors returned by a [`crate::engine::QueryEngine`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed SQL, unsupported function, or any other runtime failure
    #[error("{0}")]
    Engine(String),

    /// A referenced table was never created
    #[error("Table '{table}' does not exist")]
    MissingTable {
        /// Name of the table the engine could not resolve
        table: String,
    },

    /// The blocking task running the query did not complete
    #[error("Query task failed: {0}")]
    Task(String),
}

impl QueryError {
    /// Classify a raw engine message, recognising missing-table failures
    pub fn from_engine_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match missing_table_pattern().and_then(|re| re.captures(&message)) {
            Some(caps) => QueryError::MissingTable {
                table: caps[1].to_string(),
            },
            None => QueryError::Engine(message),
        }
    }

    pub fn is_missing_table(&self) -> bool {
        matches!(self, QueryError::MissingTable { .. })
    }
}

fn missing_table_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"Table with name "?([A-Za-z0-9_.]+)"? does not exist"#).ok())
        .as_ref()
}
