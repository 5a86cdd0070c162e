//! Data acquisition
//!
//! Seeds the three fixed tables from literal values, then loads the remote
//! GeoJSON files listed in the configuration. A remote file that cannot be
//! fetched, decoded or inserted is skipped with a warning; the demos fall
//! back to the seeded tables.

use crate::common::sql_string;
use crate::config::{DataConfig, RemoteFile};
use crate::engine::QueryEngine;
use crate::errors::{NetworkError, QueryResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rows per INSERT statement
const INSERT_BATCH: usize = 500;

pub const SEED_SQL: &str = "\
CREATE OR REPLACE TABLE temples AS
SELECT * FROM (VALUES
    ('清水寺', ST_Point(135.7850, 34.9948)),
    ('金閣寺', ST_Point(135.7294, 35.0394)),
    ('銀閣寺', ST_Point(135.7984, 35.0270)),
    ('伏見稲荷大社', ST_Point(135.7727, 34.9671)),
    ('東寺', ST_Point(135.7477, 34.9804)),
    ('龍安寺', ST_Point(135.7183, 35.0345)),
    ('二条城', ST_Point(135.7483, 35.0142)),
    ('平安神宮', ST_Point(135.7823, 35.0160)),
    ('知恩院', ST_Point(135.7826, 35.0053)),
    ('南禅寺', ST_Point(135.7931, 35.0107))
) AS t(name, geom);

CREATE OR REPLACE TABLE stations AS
SELECT * FROM (VALUES
    ('京都駅', ST_Point(135.758767, 34.985458)),
    ('嵐山駅', ST_Point(135.6772, 35.0094)),
    ('祇園四条駅', ST_Point(135.7726, 35.0036)),
    ('河原町駅', ST_Point(135.7690, 35.0090)),
    ('二条駅', ST_Point(135.7413, 35.0106)),
    ('東山駅', ST_Point(135.7760, 35.0094)),
    ('烏丸御池駅', ST_Point(135.7595, 35.0103))
) AS t(name, geom);

CREATE OR REPLACE TABLE areas AS
SELECT * FROM (VALUES
    ('中京区', ST_GeomFromText('POLYGON((135.74 35.00, 135.77 35.00, 135.77 35.02, 135.74 35.02, 135.74 35.00))')),
    ('東山区', ST_GeomFromText('POLYGON((135.77 34.98, 135.80 34.98, 135.80 35.02, 135.77 35.02, 135.77 34.98))')),
    ('下京区', ST_GeomFromText('POLYGON((135.74 34.98, 135.77 34.98, 135.77 35.00, 135.74 35.00, 135.74 34.98))'))
) AS t(name, geom);
";

/// Row counts of the seeded tables
pub const SEED_SUMMARY_SQL: &str = "\
SELECT 'temples' AS table_name, COUNT(*) AS row_count FROM temples
UNION ALL
SELECT 'stations', COUNT(*) FROM stations
UNION ALL
SELECT 'areas', COUNT(*) FROM areas";

pub async fn seed<E: QueryEngine + ?Sized>(engine: &E) -> QueryResult<()> {
    info!("Creating seed tables");
    engine.execute(SEED_SQL).await
}

/// Retrieves the body of a remote file
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, NetworkError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DataFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| NetworkError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// One point feature ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    /// 1-based position in the source file
    pub id: usize,
    pub name: String,
    pub lng: f64,
    pub lat: f64,
}

fn feature_name(properties: Option<&Map<String, Value>>) -> Option<String> {
    let properties = properties?;
    ["name", "name_ja", "name_en"].iter().find_map(|key| {
        properties
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Point features of a GeoJSON document. Other geometry types are skipped
/// but still count towards the ids of later features.
pub fn point_records(table: &str, body: &str, url: &str) -> Result<Vec<PointRecord>, NetworkError> {
    let collection: RawCollection = serde_json::from_str(body).map_err(|e| NetworkError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(i, feature)| {
            let geometry = feature.geometry.as_ref()?;
            if geometry.kind != "Point" {
                return None;
            }
            let coords = geometry.coordinates.as_array()?;
            let lng = coords.first()?.as_f64()?;
            let lat = coords.get(1)?.as_f64()?;
            let id = i + 1;
            let name = feature_name(feature.properties.as_ref())
                .unwrap_or_else(|| format!("{}_{}", table, id));
            Some(PointRecord { id, name, lng, lat })
        })
        .collect())
}

pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE OR REPLACE TABLE {} (\n    id INTEGER,\n    name VARCHAR,\n    geom GEOMETRY\n)",
        table
    )
}

/// INSERT statements for `records`, batched
pub fn insert_sql(table: &str, records: &[PointRecord]) -> Vec<String> {
    records
        .chunks(INSERT_BATCH)
        .map(|chunk| {
            let values = chunk
                .iter()
                .map(|r| {
                    format!(
                        "({}, {}, ST_Point({}, {}))",
                        r.id,
                        sql_string(&r.name),
                        r.lng,
                        r.lat
                    )
                })
                .collect::<Vec<_>>()
                .join(",\n    ");
            format!("INSERT INTO {} VALUES\n    {}", table, values)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Table and number of rows inserted
    pub loaded: Vec<(String, usize)>,
    /// Table and the reason it was skipped
    pub skipped: Vec<(String, String)>,
}

impl IngestReport {
    pub fn is_loaded(&self, table: &str) -> bool {
        self.loaded.iter().any(|(t, _)| t == table)
    }
}

async fn load_file<E, F>(
    engine: &E,
    fetcher: &F,
    base_url: &str,
    remote: &RemoteFile,
) -> Result<usize, String>
where
    E: QueryEngine + ?Sized,
    F: DataFetcher + ?Sized,
{
    let url = format!("{}/{}", base_url.trim_end_matches('/'), remote.file);
    debug!("Fetching {}", url);
    let body = fetcher.fetch(&url).await.map_err(|e| e.to_string())?;
    let records = point_records(&remote.table, &body, &url).map_err(|e| e.to_string())?;

    engine
        .execute(&create_table_sql(&remote.table))
        .await
        .map_err(|e| e.to_string())?;
    for statement in insert_sql(&remote.table, &records) {
        engine.execute(&statement).await.map_err(|e| e.to_string())?;
    }
    Ok(records.len())
}

/// Load every configured remote file; failures are reported, never raised
pub async fn ingest_remote<E, F>(engine: &E, fetcher: &F, config: &DataConfig) -> IngestReport
where
    E: QueryEngine + ?Sized,
    F: DataFetcher + ?Sized,
{
    let mut report = IngestReport::default();
    for remote in &config.files {
        match load_file(engine, fetcher, &config.base_url, remote).await {
            Ok(count) => {
                info!("Loaded {} items into {}", count, remote.table);
                report.loaded.push((remote.table.clone(), count));
            }
            Err(reason) => {
                warn!("Could not load {}: {}", remote.file, reason);
                report.skipped.push((remote.table.clone(), reason));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedEngine;
    use std::collections::HashMap;

    struct FakeFetcher {
        bodies: HashMap<String, String>,
    }

    #[async_trait]
    impl DataFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String, NetworkError> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| NetworkError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    const PARKS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [135.77, 35.01]},
             "properties": {"name": "円山公園"}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[135.7, 35.0], [135.8, 35.1]]},
             "properties": {"name": "鴨川"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [135.76, 35.02]},
             "properties": {"name_en": "Kyoto Gyoen"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [135.75, 35.03]},
             "properties": {}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [135.74, 35.04]},
             "properties": {"name": "Ma'am's Garden"}}
        ]
    }"#;

    #[test]
    fn test_point_records_names_and_ids() {
        let records = point_records("parks", PARKS, "test").unwrap();
        let names = records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["円山公園", "Kyoto Gyoen", "parks_4", "Ma'am's Garden"]);
        let ids = records.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_insert_escapes_quotes() {
        let records = point_records("parks", PARKS, "test").unwrap();
        let statements = insert_sql("parks", &records);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("(5, 'Ma''am''s Garden', ST_Point(135.74, 35.04))"));
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = point_records("parks", "<html>", "https://example.invalid/parks.geojson").unwrap_err();
        assert!(matches!(err, NetworkError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let config = DataConfig {
            base_url: "https://data.test/kyoto/".to_string(),
            files: vec![
                RemoteFile {
                    file: "osm/parks_gardens.geojson".to_string(),
                    table: "parks".to_string(),
                },
                RemoteFile {
                    file: "osm/restaurants.geojson".to_string(),
                    table: "restaurants".to_string(),
                },
            ],
        };
        let fetcher = FakeFetcher {
            bodies: HashMap::from([(
                "https://data.test/kyoto/osm/parks_gardens.geojson".to_string(),
                PARKS.to_string(),
            )]),
        };
        let engine = ScriptedEngine::new();

        let report = ingest_remote(&engine, &fetcher, &config).await;
        assert_eq!(report.loaded, vec![("parks".to_string(), 4)]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "restaurants");
        assert!(engine.has_table("parks"));
        assert!(!engine.has_table("restaurants"));
    }

    #[tokio::test]
    async fn test_seed_creates_fixed_tables() {
        let engine = ScriptedEngine::new();
        seed(&engine).await.unwrap();
        for table in ["temples", "stations", "areas"] {
            assert!(engine.has_table(table), "{} missing", table);
        }
    }
}
