//! Canned-response engine
//!
//! Answers queries from registered responses and tracks which tables exist,
//! so a query that names a table known to be absent fails the same way
//! DuckDB would. Used for offline runs and throughout the tests.

use super::{QueryEngine, ResultSet};
use crate::errors::{QueryError, QueryResult};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tracing::debug;

struct Response {
    needle: String,
    outcome: QueryResult<ResultSet>,
    delay: Option<Duration>,
}

#[derive(Default)]
pub struct ScriptedEngine {
    present: Mutex<HashSet<String>>,
    absent: HashSet<String>,
    responses: Vec<Response>,
    log: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables that exist from the start
    pub fn with_tables<I, S>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut present) = self.present.lock() {
            present.extend(tables.into_iter().map(Into::into));
        }
        self
    }

    /// Tables a query may name but which were never created
    pub fn with_absent_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.absent.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Answer every query containing `needle` with `result`. The first
    /// matching registration wins.
    pub fn respond(mut self, needle: impl Into<String>, result: ResultSet) -> Self {
        self.responses.push(Response {
            needle: needle.into(),
            outcome: Ok(result),
            delay: None,
        });
        self
    }

    /// Fail every query containing `needle` with an engine error
    pub fn fail(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.push(Response {
            needle: needle.into(),
            outcome: Err(QueryError::Engine(message.into())),
            delay: None,
        });
        self
    }

    /// Like [`ScriptedEngine::respond`], but the answer arrives after `delay`
    pub fn respond_after(
        mut self,
        needle: impl Into<String>,
        result: ResultSet,
        delay: Duration,
    ) -> Self {
        self.responses.push(Response {
            needle: needle.into(),
            outcome: Ok(result),
            delay: Some(delay),
        });
        self
    }

    /// Every statement seen so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.present
            .lock()
            .map(|present| present.contains(name))
            .unwrap_or(false)
    }

    fn record(&self, sql: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(sql.to_string());
        }
    }

    fn check_tables(&self, sql: &str) -> QueryResult<()> {
        let present = self
            .present
            .lock()
            .map_err(|e| QueryError::Task(e.to_string()))?;
        let code = strip_comments(sql);
        for word in identifier_pattern().find_iter(&code) {
            let word = word.as_str();
            if self.absent.contains(word) && !present.contains(word) {
                return Err(QueryError::MissingTable {
                    table: word.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn query(&self, sql: &str) -> QueryResult<ResultSet> {
        self.record(sql);
        self.check_tables(sql)?;

        let Some(response) = self.responses.iter().find(|r| sql.contains(&r.needle)) else {
            debug!("no scripted response, returning empty result");
            return Ok(ResultSet::default());
        };
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        response.outcome.clone()
    }

    async fn execute(&self, sql: &str) -> QueryResult<()> {
        self.record(sql);
        let created = create_table_pattern()
            .captures_iter(sql)
            .map(|caps| caps[1].to_string())
            .collect::<Vec<_>>();
        if created.is_empty() {
            self.check_tables(sql)?;
        }
        let mut present = self
            .present
            .lock()
            .map_err(|e| QueryError::Task(e.to_string()))?;
        present.extend(created);
        Ok(())
    }

    async fn existing_tables(&self, candidates: &[&str]) -> QueryResult<HashSet<String>> {
        self.record(&format!("-- probe {}", candidates.join(", ")));
        let present = self
            .present
            .lock()
            .map_err(|e| QueryError::Task(e.to_string()))?;
        Ok(candidates
            .iter()
            .filter(|name| present.contains(**name))
            .map(|name| name.to_string())
            .collect())
    }
}

fn strip_comments(sql: &str) -> String {
    sql.lines()
        .map(|line| match line.find("--") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern"))
}

fn create_table_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)CREATE\s+(?:OR\s+REPLACE\s+)?TABLE\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("create table pattern")
    })
}
