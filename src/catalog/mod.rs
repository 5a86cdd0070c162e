//! Query catalog
//!
//! A fixed set of named demos. Each one builds a display query for the text
//! result pane and, when it draws something, a map query carrying raw
//! coordinates, then shapes the map rows into a [`DemoVisual`].
//!
//! All distances are computed in degrees and converted with the uniform
//! [`METERS_PER_DEGREE`] constant. This is a deliberate simplification of
//! the demos, not a projection.

mod aggregate;
mod proximity;
pub mod tables;

pub use tables::{TableAlias, TableAliases, TableResolution};

use crate::engine::Row;
use crate::errors::UiStateError;
use crate::registry::DemoVisual;
use crate::viz::Coord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Meters per degree, applied uniformly to both axes
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Grid factor of the density aggregation (1/200 degree cells)
pub const AGG_GRID_FACTOR: f64 = 200.0;
/// Grid factor of the drawn grid (1/400 degree cells)
pub const CELL_GRID_FACTOR: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Demo {
    Distance,
    Buffer,
    Nearest,
    Centroid,
    SpatialJoin,
    ServiceArea,
    Within,
    SpatialAgg,
    Grid,
    Predicates,
    HexGrid,
    ConvexHull,
    Voronoi,
    Outliers,
    Route,
    Cluster,
}

impl Demo {
    pub fn all() -> Vec<Demo> {
        Demo::iter().collect()
    }

    pub fn parse(name: &str) -> Result<Demo, UiStateError> {
        Demo::from_str(name).map_err(|_| UiStateError::UnknownDemo(name.to_string()))
    }

    pub fn title(self) -> &'static str {
        match self {
            Demo::Distance => "Distance from the origin",
            Demo::Buffer => "Buffer around the origin",
            Demo::Nearest => "Nearest station per temple",
            Demo::Centroid => "Geographic center",
            Demo::SpatialJoin => "Spatial join",
            Demo::ServiceArea => "Station service areas",
            Demo::Within => "Containment",
            Demo::SpatialAgg => "Grid density",
            Demo::Grid => "Grid cells",
            Demo::Predicates => "Distance predicates",
            Demo::HexGrid => "Hexagonal grid",
            Demo::ConvexHull => "Extent outline",
            Demo::Voronoi => "Station catchments",
            Demo::Outliers => "Isolated points",
            Demo::Route => "Sightseeing route",
            Demo::Cluster => "Density clustering",
        }
    }

    /// Name of the result pane this demo writes to
    pub fn pane(self) -> String {
        self.to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Origin {
    pub name: String,
    pub lng: f64,
    pub lat: f64,
}

impl Origin {
    pub fn coord(&self) -> Coord {
        [self.lng, self.lat]
    }

    fn sql_point(&self) -> String {
        format!("ST_Point({}, {})", self.lng, self.lat)
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            name: "Kyoto Station".to_string(),
            lng: 135.758767,
            lat: 34.985458,
        }
    }
}

/// Demo parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub origin: Origin,
    pub buffer_radius_m: f64,
    pub join_radius_m: f64,
    pub service_radius_m: f64,
    pub cluster_radius_m: f64,
    pub within_area: String,
    pub route_stops: Vec<String>,
    pub hex_resolution: u8,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            origin: Origin::default(),
            buffer_radius_m: 1000.0,
            join_radius_m: 500.0,
            service_radius_m: 500.0,
            cluster_radius_m: 500.0,
            within_area: "東山区".to_string(),
            route_stops: ["清水寺", "伏見稲荷大社", "東寺", "二条城", "平安神宮"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hex_resolution: 8,
        }
    }
}

/// Where a demo's map rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum MapSource {
    /// Nothing is drawn from rows
    None,
    /// Shape the display query's own rows
    Display,
    /// A separate query carrying coordinates
    Query(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoQuery {
    pub demo: Demo,
    pub display_sql: String,
    pub map: MapSource,
}

impl DemoQuery {
    fn display_only(demo: Demo, display_sql: String) -> Self {
        Self {
            demo,
            display_sql,
            map: MapSource::None,
        }
    }

    fn with_map(demo: Demo, display_sql: String, map_sql: String) -> Self {
        Self {
            demo,
            display_sql,
            map: MapSource::Query(map_sql),
        }
    }
}

/// Build the SQL for `demo` against the probed tables
pub fn build(demo: Demo, config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    match demo {
        Demo::Distance => proximity::distance(config, tables),
        Demo::Buffer => proximity::buffer(config, tables),
        Demo::Nearest => proximity::nearest(tables),
        Demo::Centroid => aggregate::centroid(tables),
        Demo::SpatialJoin => proximity::spatial_join(config, tables),
        Demo::ServiceArea => proximity::service_area(config, tables),
        Demo::Within => proximity::within(config, tables),
        Demo::SpatialAgg => aggregate::spatial_agg(tables),
        Demo::Grid => aggregate::grid(tables),
        Demo::Predicates => proximity::predicates(config, tables),
        Demo::HexGrid => aggregate::hex_grid(config, tables),
        Demo::ConvexHull => aggregate::convex_hull(tables),
        Demo::Voronoi => aggregate::voronoi(tables),
        Demo::Outliers => aggregate::outliers(tables),
        Demo::Route => proximity::route(config, tables),
        Demo::Cluster => aggregate::cluster(config, tables),
    }
}

/// Turn map rows into layers and markers
pub fn shape(demo: Demo, config: &DemoConfig, rows: &[Row]) -> DemoVisual {
    match demo {
        Demo::Distance => proximity::distance_visual(config, rows),
        Demo::Buffer => proximity::buffer_visual(config),
        Demo::Nearest => proximity::nearest_visual(rows),
        Demo::Centroid => aggregate::centroid_visual(rows),
        Demo::Grid => aggregate::grid_visual(rows),
        Demo::HexGrid => aggregate::hex_visual(rows),
        Demo::ConvexHull => aggregate::hull_visual(rows),
        Demo::Voronoi => aggregate::voronoi_visual(rows),
        Demo::Outliers => aggregate::outlier_visual(rows),
        Demo::Route => proximity::route_visual(config, rows),
        Demo::Cluster => aggregate::cluster_visual(rows),
        Demo::SpatialJoin
        | Demo::ServiceArea
        | Demo::Within
        | Demo::SpatialAgg
        | Demo::Predicates => DemoVisual::none(),
    }
}

/// `expr` (degrees) converted to meters
fn meters(expr: &str) -> String {
    format!("{} * {}", expr, METERS_PER_DEGREE)
}

/// Meters converted to degrees, as a SQL literal
fn degrees(meters: f64) -> String {
    format!("{}", meters / METERS_PER_DEGREE)
}

/// Kilometres per degree, for extents reported in km
fn km_per_degree() -> f64 {
    METERS_PER_DEGREE / 1000.0
}

/// `expr` snapped to a grid of `1/factor` degree
fn snap(expr: &str, factor: f64) -> String {
    format!("ROUND({} * {}) / {}", expr, factor, factor)
}

/// CTE `name` ranking, for every row of `source` (alias `a`), the rows of
/// `target` (alias `b`) by ascending distance. Rows are partitioned by
/// name and geometry, so same-named rows each get a nearest. Keep `rn = 1`
/// for the nearest. With `exclude_self` a row never matches a same-named row.
fn nearest_neighbor_cte(
    name: &str,
    source: &str,
    target: &str,
    columns: &[String],
    exclude_self: bool,
) -> String {
    let self_filter = if exclude_self {
        "\n      AND a.name != b.name"
    } else {
        ""
    };
    format!(
        "{name} AS (
    SELECT
        {columns},
        ROW_NUMBER() OVER (PARTITION BY a.name, ST_AsText(a.geom) ORDER BY ST_Distance(a.geom, b.geom), b.name) AS rn
    FROM {source} a, {target} b
    WHERE a.geom IS NOT NULL
      AND b.geom IS NOT NULL{self_filter}
)",
        name = name,
        columns = columns.join(",\n        "),
        source = source,
        target = target,
        self_filter = self_filter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seeded() -> TableResolution {
        TableResolution::new(
            TableAliases::default(),
            ["temples", "stations", "areas"]
                .iter()
                .map(|s| s.to_string())
                .collect::<HashSet<_>>(),
        )
    }

    fn enriched() -> TableResolution {
        TableResolution::new(
            TableAliases::default(),
            [
                "temples",
                "stations",
                "areas",
                "temples_osm",
                "transport",
                "restaurants",
                "accommodation",
                "plateau_shelters",
                "plateau_landmarks",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect::<HashSet<_>>(),
        )
    }

    fn all_sql(query: &DemoQuery) -> String {
        match &query.map {
            MapSource::Query(map) => format!("{}\n{}", query.display_sql, map),
            _ => query.display_sql.clone(),
        }
    }

    fn words(sql: &str) -> HashSet<String> {
        sql.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_demo_names_round_trip() {
        for demo in Demo::all() {
            assert_eq!(Demo::parse(&demo.to_string()).unwrap(), demo);
        }
        assert_eq!(Demo::parse("hex-grid").unwrap(), Demo::HexGrid);
        assert_eq!(
            Demo::parse("dbscan"),
            Err(UiStateError::UnknownDemo("dbscan".to_string()))
        );
    }

    #[test]
    fn test_seeded_tables_never_reference_enriched_ones() {
        let tables = seeded();
        let config = DemoConfig::default();
        for demo in Demo::all() {
            let sql = all_sql(&build(demo, &config, &tables));
            let words = words(&sql);
            for optional in [
                "temples_osm",
                "transport",
                "restaurants",
                "accommodation",
                "plateau_shelters",
                "plateau_landmarks",
            ] {
                assert!(
                    !words.contains(optional),
                    "{} references {} without it being present",
                    demo,
                    optional
                );
            }
        }
    }

    #[test]
    fn test_enriched_tables_are_preferred() {
        let sql = all_sql(&build(Demo::Nearest, &DemoConfig::default(), &enriched()));
        assert!(sql.contains("FROM temples_osm a, transport b"));
    }

    #[test]
    fn test_display_and_map_queries_share_ordering() {
        let query = build(Demo::Distance, &DemoConfig::default(), &seeded());
        let MapSource::Query(map_sql) = &query.map else {
            panic!("distance draws from a map query");
        };
        assert!(map_sql.contains("ST_X(t.geom) AS lng"));
        assert!(!query.display_sql.contains("AS lng"));
        for sql in [map_sql, &query.display_sql] {
            assert!(sql.contains("* 111000, 0) AS distance_m"));
            assert!(sql.contains("ORDER BY distance_m, t.name\nLIMIT 5"));
            assert!(!sql.contains("RANDOM()"));
        }
    }

    #[test]
    fn test_buffer_radius_converted_to_degrees() {
        let config = DemoConfig {
            buffer_radius_m: 1110.0,
            ..DemoConfig::default()
        };
        let query = build(Demo::Buffer, &config, &seeded());
        assert!(query.display_sql.contains(&format!(
            "ST_Buffer(ST_Point(135.758767, 34.985458), {})",
            1110.0 / METERS_PER_DEGREE
        )));
        assert_eq!(query.map, MapSource::None);
    }

    #[test]
    fn test_nearest_neighbor_pattern() {
        let query = build(Demo::Nearest, &DemoConfig::default(), &seeded());
        assert!(query
            .display_sql
            .contains("ROW_NUMBER() OVER (PARTITION BY a.name, ST_AsText(a.geom) ORDER BY ST_Distance(a.geom, b.geom), b.name) AS rn"));
        assert!(query.display_sql.contains("WHERE rn = 1"));

        let outliers = build(Demo::Outliers, &DemoConfig::default(), &seeded());
        assert!(outliers.display_sql.contains("AND a.name != b.name"));
        assert!(outliers.display_sql.contains("STDDEV_POP(nearest_m)"));
    }

    #[test]
    fn test_grid_rounding() {
        let agg = build(Demo::SpatialAgg, &DemoConfig::default(), &seeded());
        assert!(agg.display_sql.contains("ROUND(ST_X(geom) * 200) / 200"));
        let grid = build(Demo::Grid, &DemoConfig::default(), &seeded());
        let MapSource::Query(map_sql) = &grid.map else {
            panic!("grid draws cells");
        };
        assert!(map_sql.contains("ROUND(ST_Y(geom) * 400) / 400"));
    }

    #[test]
    fn test_hex_grid_skips_missing_optional_tables() {
        let sql = all_sql(&build(Demo::HexGrid, &DemoConfig::default(), &seeded()));
        assert!(sql.contains("h3_latlng_to_cell(ST_Y(geom), ST_X(geom), 8)"));
        assert!(!sql.contains("restaurants"));

        let sql = all_sql(&build(Demo::HexGrid, &DemoConfig::default(), &enriched()));
        assert!(sql.contains("FROM restaurants"));
        assert!(sql.contains("FROM plateau_landmarks"));
    }

    #[test]
    fn test_route_names_are_quoted() {
        let config = DemoConfig {
            route_stops: vec!["O'Hara".to_string(), "東寺".to_string()],
            ..DemoConfig::default()
        };
        let query = build(Demo::Route, &config, &seeded());
        assert!(query.display_sql.contains("name IN ('O''Hara', '東寺')"));
        assert!(query.display_sql.contains("SUM(segment_distance) OVER (ORDER BY order_num)"));
    }

    #[test]
    fn test_cluster_neighborhood_in_meters() {
        let query = build(Demo::Cluster, &DemoConfig::default(), &seeded());
        assert!(query
            .display_sql
            .contains("ST_Distance(p1.geom, p2.geom) * 111000 < 500"));
        assert!(query.display_sql.contains("WHEN neighbors >= 3 THEN 'core'"));
    }

    #[test]
    fn test_every_drawing_demo_has_a_map_source() {
        let tables = seeded();
        let config = DemoConfig::default();
        for demo in [
            Demo::Distance,
            Demo::Nearest,
            Demo::Centroid,
            Demo::Grid,
            Demo::HexGrid,
            Demo::ConvexHull,
            Demo::Voronoi,
            Demo::Outliers,
            Demo::Route,
            Demo::Cluster,
        ] {
            assert_ne!(build(demo, &config, &tables).map, MapSource::None, "{}", demo);
        }
    }
}
