use crate::catalog::{DemoConfig, TableAliases};
use crate::errors::ConfigError;
use crate::viz::Coord;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ## Structure
/// Configuration file layout (`geodemo.yaml`). Every field has a default, so
/// an empty file is a valid configuration.
///
/// ```text
/// AppConfig
///   ├── database: DatabaseConfig
///   │   ├── path: Option<String>      (in-memory when absent)
///   │   └── extensions: Vec<String>
///   ├── data: DataConfig
///   │   ├── base_url: String
///   │   └── files: Vec<RemoteFile>
///   │       ├── file: String
///   │       └── table: String
///   ├── map: MapConfig
///   │   ├── center: [lng, lat]
///   │   └── zoom: f64
///   ├── demos: DemoConfig
///   └── tables: TableAliases
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub data: DataConfig,
    pub map: MapConfig,
    pub demos: DemoConfig,
    pub tables: TableAliases,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
    /// Each entry is installed then loaded, e.g. `h3 FROM community`
    pub extensions: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            extensions: vec!["spatial".to_string(), "h3 FROM community".to_string()],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub file: String,
    pub table: String,
}

impl RemoteFile {
    fn new(file: &str, table: &str) -> Self {
        Self {
            file: file.to_string(),
            table: table.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub base_url: String,
    pub files: Vec<RemoteFile>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://raw.githubusercontent.com/kiwamizamurai/chirichiri/main/data/kyoto"
                .to_string(),
            files: vec![
                RemoteFile::new("osm/tourism_temples.geojson", "temples_osm"),
                RemoteFile::new("osm/restaurants.geojson", "restaurants"),
                RemoteFile::new("osm/accommodation.geojson", "accommodation"),
                RemoteFile::new("osm/convenience_stores.geojson", "convenience_stores"),
                RemoteFile::new("osm/parks_gardens.geojson", "parks"),
                RemoteFile::new("osm/souvenir_shops.geojson", "souvenirs"),
                RemoteFile::new("osm/supermarkets.geojson", "supermarkets"),
                RemoteFile::new("osm/transport.geojson", "transport"),
                RemoteFile::new("plateau/shelters.geojson", "plateau_shelters"),
                RemoteFile::new("plateau/landmarks.geojson", "plateau_landmarks"),
                RemoteFile::new("plateau/parks.geojson", "plateau_parks"),
                RemoteFile::new("plateau/emergency_routes.geojson", "plateau_emergency"),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub center: Coord,
    pub zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [135.758767, 34.985458],
            zoom: 12.0,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` when it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("extensions"));
        assert!(yaml.contains("h3 FROM community"));
        assert!(yaml.contains("temples_osm"));
    }

    #[test]
    fn test_round_trip() {
        let config = AppConfig::default();
        let parsed = AppConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let yaml = r#"
demos:
  buffer_radius_m: 750
map:
  zoom: 14
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.demos.buffer_radius_m, 750.0);
        assert_eq!(config.demos.origin.name, "Kyoto Station");
        assert_eq!(config.map.zoom, 14.0);
        assert_eq!(config.map.center, [135.758767, 34.985458]);
        assert_eq!(config.data.files.len(), 12);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_table_aliases_override() {
        let yaml = r#"
tables:
  temples:
    primary: shrines
    fallback: temples
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.tables.alias("temples").primary, "shrines");
        assert_eq!(config.tables.alias("restaurants").primary, "restaurants");
    }
}
