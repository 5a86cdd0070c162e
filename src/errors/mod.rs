//! Domain-specific error types for geodemo
//!
//! # Error Categories
//!
//! - **QueryError**: engine failures (malformed SQL, missing tables). Always
//!   recovered and rendered as text in the result pane.
//! - **NetworkError**: ingestion fetch failures. Logged, the table is skipped.
//! - **MapError**: renderer contract violations (duplicate ids, removing a
//!   source that still has layers).
//! - **UiStateError**: requests for unregistered datasets or demos. Fatal to
//!   the action.
//! - **ConfigError**: configuration loading.
//!
//! # Examples
//!
//! ```rust
//! use geodemo::errors::{SessionError, UiStateError};
//!
//! let err: SessionError = UiStateError::UnknownDataset("castles".to_string()).into();
//! assert!(err.is_ui_state());
//! assert_eq!(err.to_string(), "Unknown dataset 'castles'");
//! ```

pub mod map;
pub mod network;
pub mod query;
pub mod ui_state;

pub use map::MapError;
pub use network::NetworkError;
pub use query::QueryError;
pub use ui_state::UiStateError;

use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid template for '{name}': {reason}")]
    Template { name: String, reason: String },
}

/// Errors surfaced by session-level operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    UiState(#[from] UiStateError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub fn is_ui_state(&self) -> bool {
        matches!(self, SessionError::UiState(_))
    }
}

/// Result type alias for engine operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type alias for renderer operations
pub type MapResult<T> = Result<T, MapError>;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_alias() {
        let result: QueryResult<()> = Err(QueryError::Engine("boom".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_map_error_converts_into_session_error() {
        let err: SessionError = MapError::UnknownLayer("x".to_string()).into();
        assert!(!err.is_ui_state());
        assert_eq!(err.to_string(), "Layer 'x' does not exist");
    }
}
