//! Result panes
//!
//! One named text sink per demo plus `custom` for free-form SQL. A pane
//! records the SQL that was shown and what the query produced.

use crate::catalog::Demo;
use indexmap::IndexMap;
use std::fmt;

/// Pane used by free-form SQL
pub const CUSTOM_PANE: &str = "custom";

#[derive(Debug, Clone, PartialEq)]
pub enum PaneContent {
    /// Pipe-delimited text table
    Table(String),
    Empty,
    Error(String),
}

impl PaneContent {
    pub fn is_error(&self) -> bool {
        matches!(self, PaneContent::Error(_))
    }
}

impl fmt::Display for PaneContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneContent::Table(text) => write!(f, "{}", text),
            PaneContent::Empty => write!(f, "No results"),
            PaneContent::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pane {
    pub sql: Option<String>,
    pub content: Option<PaneContent>,
}

impl Pane {
    pub fn is_blank(&self) -> bool {
        self.sql.is_none() && self.content.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ResultPanes {
    panes: IndexMap<String, Pane>,
}

impl Default for ResultPanes {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultPanes {
    pub fn new() -> Self {
        let mut panes = IndexMap::new();
        for demo in Demo::all() {
            panes.insert(demo.pane(), Pane::default());
        }
        panes.insert(CUSTOM_PANE.to_string(), Pane::default());
        Self { panes }
    }

    pub fn get(&self, name: &str) -> Option<&Pane> {
        self.panes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.panes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pane)> {
        self.panes.iter().map(|(name, pane)| (name.as_str(), pane))
    }

    fn pane_mut(&mut self, name: &str) -> &mut Pane {
        self.panes.entry(name.to_string()).or_default()
    }

    pub fn reset(&mut self, name: &str) {
        *self.pane_mut(name) = Pane::default();
    }

    pub fn show_sql(&mut self, name: &str, sql: &str) {
        self.pane_mut(name).sql = Some(sql.to_string());
    }

    pub fn set_content(&mut self, name: &str, content: PaneContent) {
        self.pane_mut(name).content = Some(content);
    }
}
