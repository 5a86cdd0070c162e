use geodemo::catalog::TableAlias;
use geodemo::AppConfig;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_config_round_trips_through_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("geodemo.yaml");

    let config = AppConfig::default();
    fs::write(&path, config.to_yaml().unwrap()).unwrap();

    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::load_or_default(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_custom_alias_survives_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("geodemo.yaml");

    let mut config = AppConfig::default();
    let mut alias = TableAlias::new("shrines").with_fallback("temples");
    alias.lookup = Some("SELECT title AS name, x AS lng, y AS lat FROM {{table}}".to_string());
    config.tables.insert("temples", alias.clone());
    fs::write(&path, config.to_yaml().unwrap()).unwrap();

    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded.tables.get("temples"), Some(&alias));
    assert_eq!(
        loaded.tables.lookup_sql("temples", "shrines").unwrap(),
        "SELECT title AS name, x AS lng, y AS lat FROM shrines"
    );
}

#[test]
fn test_invalid_yaml_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "demos: [not, a, map]").unwrap();

    let err = AppConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("broken.yaml"));
}
