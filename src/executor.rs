//! Query executor
//!
//! Runs SQL against the engine and renders results as a pipe-delimited text
//! table. Failures are never propagated past [`QueryExecutor::execute_and_show`];
//! they become an error line in the pane.

use crate::engine::{QueryEngine, ResultSet, Scalar};
use crate::errors::QueryResult;
use crate::output::PaneContent;
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum width of a separator segment
const MIN_SEPARATOR_WIDTH: usize = 10;

pub struct QueryExecutor<E: QueryEngine + ?Sized> {
    engine: Arc<E>,
}

impl<E: QueryEngine + ?Sized> Clone for QueryExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<E: QueryEngine + ?Sized> QueryExecutor<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub async fn run(&self, sql: &str) -> QueryResult<ResultSet> {
        debug!("Running query:\n{}", sql);
        match self.engine.query(sql).await {
            Ok(result) => {
                debug!("Query returned {} rows", result.len());
                Ok(result)
            }
            Err(e) => {
                warn!("Query failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run `sql` and render whatever happens
    pub async fn execute_and_show(&self, sql: &str) -> PaneContent {
        match self.run(sql).await {
            Ok(result) => render(&result),
            Err(e) => PaneContent::Error(e.to_string()),
        }
    }
}

pub fn render(result: &ResultSet) -> PaneContent {
    if result.is_empty() {
        PaneContent::Empty
    } else {
        PaneContent::Table(render_table(result))
    }
}

pub fn format_cell(value: &Scalar) -> String {
    match value {
        Scalar::Null => "NULL".to_string(),
        Scalar::Int(i) => format!("{:.2}", *i as f64),
        Scalar::Float(f) => format!("{:.2}", f),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Text(s) => s.clone(),
    }
}

pub fn render_table(result: &ResultSet) -> String {
    let mut output = String::new();

    output.push_str(&result.columns.join(" | "));
    output.push('\n');
    output.push_str(
        &result
            .columns
            .iter()
            .map(|c| "-".repeat(c.chars().count().max(MIN_SEPARATOR_WIDTH)))
            .collect::<Vec<_>>()
            .join("-|-"),
    );
    output.push('\n');

    let keys = result.keys();
    for row in &result.rows {
        let cells = keys
            .iter()
            .map(|c| row.get(c).map(format_cell).unwrap_or_else(|| "NULL".to_string()))
            .collect::<Vec<_>>();
        output.push_str(&cells.join(" | "));
        output.push('\n');
    }

    output
}
