//! DuckDB-backed engine
//!
//! The `duckdb` connection is synchronous, so every call runs on the blocking
//! pool behind a mutex.

use super::{row_keys, QueryEngine, ResultSet, Row, Scalar};
use crate::errors::{QueryError, QueryResult};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub struct DuckDbEngine {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbEngine {
    pub fn open_in_memory() -> QueryResult<Self> {
        let conn = Connection::open_in_memory().map_err(engine_error)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open(path: &str) -> QueryResult<Self> {
        let conn = Connection::open(path).map_err(engine_error)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Install and load the given extensions, e.g. `spatial` or
    /// `h3 FROM community`
    pub async fn load_extensions(&self, extensions: &[String]) -> QueryResult<()> {
        for extension in extensions {
            let name = extension
                .split_whitespace()
                .next()
                .unwrap_or(extension.as_str());
            info!("Loading DuckDB extension: {}", extension);
            self.execute(&format!("INSTALL {}; LOAD {};", extension, name))
                .await?;
        }
        Ok(())
    }

    async fn with_connection<T, F>(&self, f: F) -> QueryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> QueryResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| QueryError::Task(format!("connection lock poisoned: {}", e)))?;
            f(&guard)
        })
        .await
        .map_err(|e| QueryError::Task(e.to_string()))?
    }
}

#[async_trait]
impl QueryEngine for DuckDbEngine {
    async fn query(&self, sql: &str) -> QueryResult<ResultSet> {
        debug!("query:\n{}", sql);
        let sql = sql.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(engine_error)?;
            let mut rows = stmt.query([]).map_err(engine_error)?;
            let columns = rows
                .as_ref()
                .map(|stmt| stmt.column_names())
                .unwrap_or_default();
            let keys = row_keys(&columns);

            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(engine_error)? {
                let mut record = Row::with_capacity(keys.len());
                for (idx, key) in keys.iter().enumerate() {
                    let value: Value = row.get(idx).map_err(engine_error)?;
                    record.insert(key.clone(), to_scalar(value));
                }
                out.push(record);
            }
            Ok(ResultSet::new(columns, out))
        })
        .await
    }

    async fn execute(&self, sql: &str) -> QueryResult<()> {
        debug!("execute:\n{}", sql);
        let sql = sql.to_string();
        self.with_connection(move |conn| conn.execute_batch(&sql).map_err(engine_error))
            .await
    }
}

fn engine_error(err: duckdb::Error) -> QueryError {
    QueryError::from_engine_message(err.to_string())
}

fn to_scalar(value: Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Boolean(b) => Scalar::Bool(b),
        Value::TinyInt(v) => Scalar::Int(v.into()),
        Value::SmallInt(v) => Scalar::Int(v.into()),
        Value::Int(v) => Scalar::Int(v.into()),
        Value::BigInt(v) => Scalar::Int(v),
        Value::UTinyInt(v) => Scalar::Int(v.into()),
        Value::USmallInt(v) => Scalar::Int(v.into()),
        Value::UInt(v) => Scalar::Int(v.into()),
        Value::UBigInt(v) => i64::try_from(v)
            .map(Scalar::Int)
            .unwrap_or_else(|_| Scalar::Text(v.to_string())),
        Value::HugeInt(v) => i64::try_from(v)
            .map(Scalar::Int)
            .unwrap_or_else(|_| Scalar::Text(v.to_string())),
        Value::Float(v) => Scalar::Float(v.into()),
        Value::Double(v) => Scalar::Float(v),
        Value::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(Scalar::Float)
                .unwrap_or(Scalar::Text(text))
        }
        Value::Text(s) => Scalar::Text(s),
        other => Scalar::Text(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, Demo, DemoConfig, TableAliases};
    use crate::engine::{row_f64, row_text};
    use crate::ingest;

    /// Seeded in-memory engine, `None` when the spatial extension cannot be
    /// installed in this environment
    async fn seeded_engine() -> Option<DuckDbEngine> {
        let engine = DuckDbEngine::open_in_memory().unwrap();
        if let Err(e) = engine.load_extensions(&["spatial".to_string()]).await {
            eprintln!("spatial extension unavailable, skipping: {}", e);
            return None;
        }
        ingest::seed(&engine).await.unwrap();
        Some(engine)
    }

    #[tokio::test]
    async fn test_query_materializes_columns_and_rows() {
        let engine = DuckDbEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE t AS SELECT * FROM (VALUES ('a', 1.5), ('b', NULL)) AS v(name, score)")
            .await
            .unwrap();

        let result = engine
            .query("SELECT name, score, COUNT(*) OVER () AS n FROM t ORDER BY name")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["name", "score", "n"]);
        assert_eq!(result.rows[0]["name"], Scalar::Text("a".to_string()));
        assert_eq!(result.rows[0]["score"].as_f64(), Some(1.5));
        assert_eq!(result.rows[1]["score"], Scalar::Null);
        assert_eq!(result.rows[1]["n"], Scalar::Int(2));
    }

    #[tokio::test]
    async fn test_missing_table_is_reported() {
        let engine = DuckDbEngine::open_in_memory().unwrap();
        let err = engine.query("SELECT * FROM temples_osm").await.unwrap_err();
        assert!(err.is_missing_table(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_existing_tables_probe() {
        let engine = DuckDbEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE temples (name VARCHAR)")
            .await
            .unwrap();
        let found = engine
            .existing_tables(&["temples", "temples_osm"])
            .await
            .unwrap();
        assert!(found.contains("temples"));
        assert!(!found.contains("temples_osm"));
    }

    #[tokio::test]
    async fn test_distance_demo_on_seeded_temples() {
        let Some(engine) = seeded_engine().await else {
            return;
        };
        let tables = TableAliases::default().probe(&engine).await.unwrap();
        let query = catalog::build(Demo::Distance, &DemoConfig::default(), &tables);

        let first = engine.query(&query.display_sql).await.unwrap();
        let second = engine.query(&query.display_sql).await.unwrap();
        assert_eq!(first, second);

        let names: Vec<String> = first
            .rows
            .iter()
            .filter_map(|row| row_text(row, "name"))
            .collect();
        assert_eq!(names, vec!["東寺", "伏見稲荷大社", "清水寺", "二条城", "知恩院"]);

        let distances: Vec<f64> = first
            .rows
            .iter()
            .filter_map(|row| row_f64(row, "distance_m"))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_same_named_temples_each_get_a_nearest_station() {
        let Some(engine) = seeded_engine().await else {
            return;
        };
        engine
            .execute("INSERT INTO temples VALUES ('東寺', ST_Point(135.6800, 35.0100))")
            .await
            .unwrap();
        let tables = TableAliases::default().probe(&engine).await.unwrap();
        let query = catalog::build(Demo::Nearest, &DemoConfig::default(), &tables);

        let result = engine.query(&query.display_sql).await.unwrap();
        let stations: Vec<String> = result
            .rows
            .iter()
            .filter(|row| row_text(row, "temple").as_deref() == Some("東寺"))
            .filter_map(|row| row_text(row, "station"))
            .collect();
        assert_eq!(stations, vec!["嵐山駅", "京都駅"]);
        assert_eq!(result.len(), 11);
    }
}
