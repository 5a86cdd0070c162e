//! Declarative table aliases
//!
//! Maps a logical dataset name to the table that backs it. Enriched tables
//! loaded from remote GeoJSON are preferred; when one is missing the seeded
//! fallback is used instead. Both the demos and the toggle manager resolve
//! tables through here.

use crate::common::get_handlebars;
use crate::engine::QueryEngine;
use crate::errors::{ConfigError, QueryResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tracing::debug;

/// Template used when an alias has no lookup of its own
pub const DEFAULT_LOOKUP: &str =
    "SELECT name, ST_X(geom) AS lng, ST_Y(geom) AS lat FROM {{table}} WHERE geom IS NOT NULL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableAlias {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Handlebars template producing `name`, `lng`, `lat` rows; `{{table}}`
    /// is the resolved table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<String>,
}

impl TableAlias {
    pub fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: None,
            lookup: None,
        }
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = Some(fallback.to_string());
        self
    }

    fn tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallback.as_deref())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct TableAliases(IndexMap<String, TableAlias>);

impl Default for TableAliases {
    fn default() -> Self {
        let mut aliases = IndexMap::new();
        aliases.insert(
            "temples".to_string(),
            TableAlias::new("temples_osm").with_fallback("temples"),
        );
        aliases.insert(
            "stations".to_string(),
            TableAlias::new("transport").with_fallback("stations"),
        );
        aliases.insert(
            "convenience".to_string(),
            TableAlias::new("convenience_stores"),
        );
        for same in [
            "restaurants",
            "accommodation",
            "parks",
            "souvenirs",
            "supermarkets",
            "plateau_shelters",
            "plateau_landmarks",
            "plateau_parks",
            "plateau_emergency",
        ] {
            aliases.insert(same.to_string(), TableAlias::new(same));
        }
        Self(aliases)
    }
}

impl TableAliases {
    pub fn get(&self, logical: &str) -> Option<&TableAlias> {
        self.0.get(logical)
    }

    pub fn insert(&mut self, logical: &str, alias: TableAlias) {
        self.0.insert(logical.to_string(), alias);
    }

    /// Alias for `logical`, or the same-named table when none is configured
    pub fn alias(&self, logical: &str) -> TableAlias {
        self.get(logical)
            .cloned()
            .unwrap_or_else(|| TableAlias::new(logical))
    }

    /// Every table name any alias can resolve to
    pub fn candidate_tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.0
            .values()
            .flat_map(TableAlias::tables)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Render the lookup query of `logical` against `table`
    pub fn lookup_sql(&self, logical: &str, table: &str) -> Result<String, ConfigError> {
        let alias = self.alias(logical);
        let template = alias.lookup.as_deref().unwrap_or(DEFAULT_LOOKUP);
        get_handlebars()
            .render_template(template, &json!({ "table": table, "dataset": logical }))
            .map_err(|e| ConfigError::Template {
                name: logical.to_string(),
                reason: e.to_string(),
            })
    }

    /// Probe the engine once for every candidate table
    pub async fn probe<E: QueryEngine + ?Sized>(&self, engine: &E) -> QueryResult<TableResolution> {
        let candidates = self.candidate_tables();
        let present = engine.existing_tables(&candidates).await?;
        debug!("table probe found {:?}", present);
        Ok(TableResolution {
            aliases: self.clone(),
            present,
        })
    }
}

/// Outcome of one table probe
#[derive(Debug, Clone)]
pub struct TableResolution {
    aliases: TableAliases,
    present: HashSet<String>,
}

impl TableResolution {
    pub fn new(aliases: TableAliases, present: HashSet<String>) -> Self {
        Self { aliases, present }
    }

    pub fn is_present(&self, table: &str) -> bool {
        self.present.contains(table)
    }

    /// Table to query for `logical`: the primary when it exists, otherwise
    /// the fallback. With neither present the primary is returned so the
    /// failure surfaces from the engine.
    pub fn table(&self, logical: &str) -> String {
        let alias = self.aliases.alias(logical);
        if self.is_present(&alias.primary) {
            return alias.primary;
        }
        match alias.fallback {
            Some(fallback) => fallback,
            None => alias.primary,
        }
    }

    /// Like [`TableResolution::table`], but `None` when neither the primary
    /// nor the fallback exists
    pub fn optional(&self, logical: &str) -> Option<String> {
        let alias = self.aliases.alias(logical);
        let found = alias.tables().find(|t| self.is_present(t)).map(str::to_string);
        found
    }

    /// Lookup query of `logical`, rendered against `table`
    pub fn lookup_sql(&self, logical: &str, table: &str) -> Result<String, ConfigError> {
        self.aliases.lookup_sql(logical, table)
    }
}
