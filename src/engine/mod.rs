//! Engine boundary
//!
//! The catalog and executor only ever talk to a [`QueryEngine`]: SQL text in,
//! a [`ResultSet`] out. The production engine is DuckDB with the `spatial`
//! and `h3` extensions; [`ScriptedEngine`] answers from canned rows.

#[cfg(feature = "duckdb")]
pub mod duckdb;
pub mod scripted;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbEngine;
pub use scripted::ScriptedEngine;

use crate::errors::QueryResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a JSON value for feature properties
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(v) => serde_json::Value::from(*v),
            Scalar::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// One result row, keyed by column name in select-list order
pub type Row = IndexMap<String, Scalar>;

/// Read a numeric column, `None` when absent, null or non-numeric
pub fn row_f64(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Scalar::as_f64)
}

/// Read a column as display text, `None` when absent or null
pub fn row_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        None | Some(Scalar::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}

/// Keys under which each column is stored in a [`Row`]. A repeated column
/// name gets a `:<n>` suffix from its second occurrence on (`a`, `a:2`), so
/// `SELECT 1 AS a, 2 AS a` keeps both cells.
pub fn row_keys(columns: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    columns
        .iter()
        .map(|column| {
            let count = seen.entry(column.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                column.clone()
            } else {
                format!("{}:{}", column, count)
            }
        })
        .collect()
}

/// Materialized query result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a result set from positional values, zipping them with `columns`
    pub fn from_values(columns: &[&str], values: Vec<Vec<Scalar>>) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let keys = row_keys(&columns);
        let rows = values
            .into_iter()
            .map(|cells| keys.iter().cloned().zip(cells).collect::<Row>())
            .collect();
        Self { columns, rows }
    }

    /// Row keys of this result's columns, see [`row_keys`]
    pub fn keys(&self) -> Vec<String> {
        row_keys(&self.columns)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// SQL executor the demos run against
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run a statement and materialize its rows
    async fn query(&self, sql: &str) -> QueryResult<ResultSet>;

    /// Run one or more statements, discarding any rows
    async fn execute(&self, sql: &str) -> QueryResult<()>;

    /// Return the subset of `candidates` that exist in the catalog
    async fn existing_tables(&self, candidates: &[&str]) -> QueryResult<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let quoted = candidates
            .iter()
            .map(|name| format!("'{}'", name.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT table_name FROM information_schema.tables WHERE table_name IN ({})",
            quoted
        );
        let result = self.query(&sql).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row_text(row, "table_name"))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_keeps_column_order() {
        let result = ResultSet::from_values(
            &["name", "distance_m"],
            vec![vec!["東寺".into(), 1523.0.into()]],
        );
        let row = &result.rows[0];
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "distance_m"]);
        assert_eq!(row_f64(row, "distance_m"), Some(1523.0));
        assert_eq!(row_text(row, "name").as_deref(), Some("東寺"));
    }

    #[test]
    fn test_repeated_columns_keep_every_cell() {
        let result = ResultSet::from_values(
            &["a", "a", "b"],
            vec![vec![1i64.into(), 2i64.into(), 3i64.into()]],
        );
        assert_eq!(result.keys(), vec!["a", "a:2", "b"]);
        let row = &result.rows[0];
        assert_eq!(row_f64(row, "a"), Some(1.0));
        assert_eq!(row_f64(row, "a:2"), Some(2.0));
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_null_scalar_reads_as_missing() {
        let result = ResultSet::from_values(&["lng"], vec![vec![Scalar::Null]]);
        assert_eq!(row_f64(&result.rows[0], "lng"), None);
        assert_eq!(row_text(&result.rows[0], "lng"), None);
    }

    #[test]
    fn test_scalar_to_json() {
        assert_eq!(Scalar::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(Scalar::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(Scalar::from(None::<String>), Scalar::Null);
    }
}
