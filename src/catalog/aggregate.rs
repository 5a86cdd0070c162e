//! Demos aggregating points into cells, groups and statistics

use super::{
    km_per_degree, meters, nearest_neighbor_cte, snap, Demo, DemoConfig, DemoQuery, MapSource,
    TableResolution, AGG_GRID_FACTOR, CELL_GRID_FACTOR,
};
use crate::classify::{classify_isolation, ClusterRole, Density, Isolation};
use crate::engine::{row_f64, row_text, Row};
use crate::map::{ClickHandler, LayerSpec, Marker, SourceSpec};
use crate::registry::{DemoVisual, LayerSet};
use crate::viz::{
    extreme_point_ring, grid_cells, hex_cells, row_coord, Feature, FeatureCollection, Geometry,
    Properties,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Marker colors assigned to stations in name order
const CATCHMENT_PALETTE: [&str; 7] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8",
];

/// Per-table row cap of the hex-grid and cluster inputs
const SAMPLE_LIMIT: usize = 50;

pub(super) fn centroid(tables: &TableResolution) -> DemoQuery {
    let sql = format!(
        "-- Geographic center of all temples
SELECT
    'Center of all temples' AS description,
    ROUND(AVG(ST_X(geom)), 4) AS lng,
    ROUND(AVG(ST_Y(geom)), 4) AS lat,
    COUNT(*) AS temple_count
FROM {temples}
WHERE geom IS NOT NULL",
        temples = tables.table("temples"),
    );
    DemoQuery {
        demo: Demo::Centroid,
        display_sql: sql,
        map: MapSource::Display,
    }
}

pub(super) fn centroid_visual(rows: &[Row]) -> DemoVisual {
    let Some(at) = rows.first().and_then(|row| row_coord(row, "lng", "lat")) else {
        return DemoVisual::none();
    };
    DemoVisual {
        centroid: Some(Marker {
            at,
            color: "#FF0000".to_string(),
            size: 20,
            popup: format!("Geographic center ({:.4}, {:.4})", at[1], at[0]),
        }),
        ..DemoVisual::none()
    }
}

/// Temples and stations, unioned as one point set
fn all_points(tables: &TableResolution) -> String {
    format!(
        "SELECT geom FROM {}\n        UNION ALL\n        SELECT geom FROM {}",
        tables.table("temples"),
        tables.table("stations"),
    )
}

pub(super) fn spatial_agg(tables: &TableResolution) -> DemoQuery {
    let sql = format!(
        "-- Point density on a 1/{factor} degree grid
WITH grid_data AS (
    SELECT
        {lng} AS grid_lng,
        {lat} AS grid_lat,
        COUNT(*) AS poi_count
    FROM (
        {points}
    ) all_points
    WHERE geom IS NOT NULL
    GROUP BY grid_lng, grid_lat
)
SELECT
    CONCAT('Grid[', ROUND(grid_lng, 3), ',', ROUND(grid_lat, 3), ']') AS grid_id,
    poi_count,
    {density} AS density_level
FROM grid_data
ORDER BY poi_count DESC, grid_id",
        factor = AGG_GRID_FACTOR,
        lng = snap("ST_X(geom)", AGG_GRID_FACTOR),
        lat = snap("ST_Y(geom)", AGG_GRID_FACTOR),
        points = all_points(tables),
        density = Density::sql_case("poi_count"),
    );
    DemoQuery::display_only(Demo::SpatialAgg, sql)
}

pub(super) fn grid(tables: &TableResolution) -> DemoQuery {
    let cells = format!(
        "grid_analysis AS (
    SELECT
        {lng} AS grid_lng,
        {lat} AS grid_lat,
        kind,
        COUNT(*) AS poi_count
    FROM (
        SELECT geom, 'temple' AS kind FROM {temples}
        UNION ALL
        SELECT geom, 'station' AS kind FROM {stations}
    ) all_poi
    WHERE geom IS NOT NULL
    GROUP BY grid_lng, grid_lat, kind
)",
        lng = snap("ST_X(geom)", CELL_GRID_FACTOR),
        lat = snap("ST_Y(geom)", CELL_GRID_FACTOR),
        temples = tables.table("temples"),
        stations = tables.table("stations"),
    );
    let display = format!(
        "-- Points per 1/{factor} degree grid cell
WITH {cells}
SELECT
    ROUND(grid_lng, 4) AS grid_lng,
    ROUND(grid_lat, 4) AS grid_lat,
    kind,
    poi_count
FROM grid_analysis
ORDER BY poi_count DESC, grid_lng, grid_lat, kind
LIMIT 10",
        factor = CELL_GRID_FACTOR,
        cells = cells,
    );
    let map = format!(
        "WITH {cells}
SELECT grid_lng, grid_lat, SUM(poi_count) AS poi_count
FROM grid_analysis
GROUP BY grid_lng, grid_lat
ORDER BY poi_count DESC, grid_lng, grid_lat",
        cells = cells,
    );
    DemoQuery::with_map(Demo::Grid, display, map)
}

pub(super) fn grid_visual(rows: &[Row]) -> DemoVisual {
    let cells = grid_cells(rows, "grid_lng", "grid_lat", "poi_count", 1.0 / CELL_GRID_FACTOR);
    if cells.is_empty() {
        return DemoVisual::none();
    }
    DemoVisual::none().layer(LayerSet::new(
        SourceSpec::new("grid-cells", cells),
        vec![
            LayerSpec::fill("grid-cells", "grid-cells")
                .paint("fill-color", "#FF6B6B")
                .paint("fill-opacity", json!(["get", "opacity"])),
            LayerSpec::line("grid-lines", "grid-cells")
                .paint("line-color", "#666666")
                .paint("line-width", 1)
                .paint("line-opacity", 0.5),
        ],
    ))
}

fn hex_cte(config: &DemoConfig, tables: &TableResolution) -> String {
    let mut parts = vec![
        (tables.table("temples"), SAMPLE_LIMIT),
        (tables.table("stations"), SAMPLE_LIMIT),
    ];
    for (logical, limit) in [
        ("restaurants", 30),
        ("accommodation", 20),
        ("plateau_shelters", 20),
        ("plateau_landmarks", 20),
    ] {
        if let Some(table) = tables.optional(logical) {
            parts.push((table, limit));
        }
    }
    let union = parts
        .iter()
        .map(|(table, limit)| {
            format!(
                "    (SELECT name, geom FROM {} WHERE geom IS NOT NULL ORDER BY name LIMIT {})",
                table, limit
            )
        })
        .collect::<Vec<_>>()
        .join("\n    UNION ALL\n");

    format!(
        "all_pois AS (
{union}
),
poi_cells AS (
    SELECT name, h3_latlng_to_cell(ST_Y(geom), ST_X(geom), {resolution}) AS h3_index
    FROM all_pois
),
cells AS (
    SELECT
        h3_index,
        COUNT(*) AS poi_count,
        h3_cell_to_lat(h3_index) AS lat,
        h3_cell_to_lng(h3_index) AS lng,
        STRING_AGG(name, ', ' ORDER BY name) AS poi_names
    FROM poi_cells
    GROUP BY h3_index
)",
        union = union,
        resolution = config.hex_resolution,
    )
}

pub(super) fn hex_grid(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let display = format!(
        "-- Points per hexagonal cell (resolution {resolution})
WITH {cells}
SELECT
    h3_h3_to_string(h3_index) AS cell,
    ROUND(lng, 4) AS lng,
    ROUND(lat, 4) AS lat,
    poi_count,
    {density} AS density_level,
    poi_names
FROM cells
ORDER BY poi_count DESC, cell
LIMIT 10",
        resolution = config.hex_resolution,
        cells = hex_cte(config, tables),
        density = Density::sql_case("poi_count"),
    );
    let map = format!(
        "WITH {cells}
SELECT h3_index, poi_count, lat, lng
FROM cells
ORDER BY poi_count DESC, h3_index",
        cells = hex_cte(config, tables),
    );
    DemoQuery::with_map(Demo::HexGrid, display, map)
}

pub(super) fn hex_visual(rows: &[Row]) -> DemoVisual {
    let cells = hex_cells(rows, "lng", "lat", "poi_count");
    if cells.is_empty() {
        return DemoVisual::none();
    }
    DemoVisual::none().layer(LayerSet::new(
        SourceSpec::new("hex-cells", cells),
        vec![
            LayerSpec::fill("hex-cells", "hex-cells")
                .paint("fill-color", json!(["get", "fillColor"]))
                .paint("fill-opacity", json!(["get", "opacity"]))
                .paint("fill-outline-color", "#4A148C"),
            LayerSpec::line("hex-outline", "hex-cells")
                .paint("line-color", "#4A148C")
                .paint("line-width", 2),
        ],
    ))
}

pub(super) fn convex_hull(tables: &TableResolution) -> DemoQuery {
    let temples = tables.table("temples");
    let km = km_per_degree();
    let display = format!(
        "-- Extent of all temples
WITH temple_points AS (
    SELECT
        COUNT(*) AS point_count,
        MIN(ST_X(geom)) AS min_lng,
        MAX(ST_X(geom)) AS max_lng,
        MIN(ST_Y(geom)) AS min_lat,
        MAX(ST_Y(geom)) AS max_lat,
        AVG(ST_X(geom)) AS center_lng,
        AVG(ST_Y(geom)) AS center_lat
    FROM {temples}
    WHERE geom IS NOT NULL
)
SELECT
    'All temples' AS group_name,
    point_count,
    ROUND((max_lng - min_lng) * {km}, 2) AS width_km,
    ROUND((max_lat - min_lat) * {km}, 2) AS height_km,
    ROUND((max_lng - min_lng) * {km} * (max_lat - min_lat) * {km}, 2) AS area_km2,
    ROUND(center_lng, 4) AS center_lng,
    ROUND(center_lat, 4) AS center_lat
FROM temple_points",
        temples = temples,
        km = km,
    );
    let map = format!(
        "SELECT ST_X(geom) AS lng, ST_Y(geom) AS lat
FROM {temples}
WHERE geom IS NOT NULL
ORDER BY lng, lat",
        temples = temples,
    );
    DemoQuery::with_map(Demo::ConvexHull, display, map)
}

pub(super) fn hull_visual(rows: &[Row]) -> DemoVisual {
    let points = rows
        .iter()
        .filter_map(|row| row_coord(row, "lng", "lat"))
        .collect::<Vec<_>>();
    let Some(ring) = extreme_point_ring(&points) else {
        return DemoVisual::none();
    };
    let outline = Feature::new(Geometry::Polygon(vec![ring]))
        .with_property("point_count", points.len() as i64);
    DemoVisual::none().layer(LayerSet::new(
        SourceSpec::new("convex-hull", FeatureCollection::single(outline)),
        vec![LayerSpec::line("convex-hull", "convex-hull")
            .paint("line-color", "#E91E63")
            .paint("line-width", 3)
            .paint("line-dasharray", json!([5, 5]))],
    ))
}

fn catchment_cte(tables: &TableResolution) -> String {
    nearest_neighbor_cte(
        "assignments",
        &tables.table("temples"),
        &tables.table("stations"),
        &[
            "a.name AS temple".to_string(),
            "ST_X(a.geom) AS lng".to_string(),
            "ST_Y(a.geom) AS lat".to_string(),
            "b.name AS station".to_string(),
            format!("{} AS distance_m", meters("ST_Distance(a.geom, b.geom)")),
        ],
        false,
    )
}

pub(super) fn voronoi(tables: &TableResolution) -> DemoQuery {
    let display = format!(
        "-- Temples grouped by their nearest station
WITH {assignments},
catchments AS (
    SELECT
        station,
        COUNT(*) AS temple_count,
        AVG(distance_m) AS avg_distance_m,
        MIN(distance_m) AS min_distance_m,
        MAX(distance_m) AS max_distance_m
    FROM assignments
    WHERE rn = 1
    GROUP BY station
)
SELECT
    station,
    temple_count,
    ROUND(avg_distance_m, 0) AS avg_dist_m,
    ROUND(min_distance_m, 0) AS min_dist_m,
    ROUND(max_distance_m, 0) AS max_dist_m
FROM catchments
ORDER BY temple_count DESC, station",
        assignments = catchment_cte(tables),
    );
    let map = format!(
        "WITH {assignments}
SELECT temple, lng, lat, station
FROM assignments
WHERE rn = 1
ORDER BY station, temple",
        assignments = catchment_cte(tables),
    );
    DemoQuery::with_map(Demo::Voronoi, display, map)
}

/// One marker per temple, colored by its nearest station
pub(super) fn voronoi_visual(rows: &[Row]) -> DemoVisual {
    let stations = rows
        .iter()
        .filter_map(|row| row_text(row, "station"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let markers = rows
        .iter()
        .filter_map(|row| {
            let at = row_coord(row, "lng", "lat")?;
            let station = row_text(row, "station")?;
            let slot = stations.iter().position(|s| *s == station)?;
            Some(Marker {
                at,
                color: CATCHMENT_PALETTE[slot % CATCHMENT_PALETTE.len()].to_string(),
                size: 10,
                popup: format!(
                    "{}\nnearest station: {}",
                    row_text(row, "temple").unwrap_or_default(),
                    station
                ),
            })
        })
        .collect();
    DemoVisual {
        markers,
        ..DemoVisual::none()
    }
}

fn isolation_cte(tables: &TableResolution) -> String {
    let temples = tables.table("temples");
    format!(
        "{nearest},
nearest_distances AS (
    SELECT name, lng, lat, nearest_m
    FROM nearest
    WHERE rn = 1
),
stats AS (
    SELECT
        AVG(nearest_m) AS avg_dist,
        STDDEV_POP(nearest_m) AS std_dist
    FROM nearest_distances
)",
        nearest = nearest_neighbor_cte(
            "nearest",
            &temples,
            &temples,
            &[
                "a.name AS name".to_string(),
                "ST_X(a.geom) AS lng".to_string(),
                "ST_Y(a.geom) AS lat".to_string(),
                format!("{} AS nearest_m", meters("ST_Distance(a.geom, b.geom)")),
            ],
            true,
        ),
    )
}

pub(super) fn outliers(tables: &TableResolution) -> DemoQuery {
    let display = format!(
        "-- Temples far from any other temple
WITH {cte}
SELECT
    nd.name,
    ROUND(nd.lng, 4) AS lng,
    ROUND(nd.lat, 4) AS lat,
    ROUND(nd.nearest_m, 0) AS nearest_neighbor_m,
    {status} AS status
FROM nearest_distances nd, stats s
ORDER BY nd.nearest_m DESC, nd.name",
        cte = isolation_cte(tables),
        status = Isolation::sql_case("nd.nearest_m", "s"),
    );
    let map = format!(
        "WITH {cte}
SELECT name, lng, lat, nearest_m
FROM nearest_distances
ORDER BY name",
        cte = isolation_cte(tables),
    );
    DemoQuery::with_map(Demo::Outliers, display, map)
}

/// Markers for isolated and somewhat isolated points. The statistics are
/// recomputed over the map rows with the same rule as the SQL.
pub(super) fn outlier_visual(rows: &[Row]) -> DemoVisual {
    let measured = rows
        .iter()
        .filter_map(|row| {
            let at = row_coord(row, "lng", "lat")?;
            let distance = row_f64(row, "nearest_m")?;
            Some((row, at, distance))
        })
        .collect::<Vec<_>>();
    let distances = measured.iter().map(|(_, _, d)| *d).collect::<Vec<_>>();

    let markers = measured
        .iter()
        .zip(classify_isolation(&distances))
        .filter_map(|((row, at, distance), status)| {
            let (color, size) = match status {
                Isolation::Isolated => ("#FFC107", 20),
                Isolation::SomewhatIsolated => ("#FFE082", 14),
                Isolation::Normal => return None,
            };
            Some(Marker {
                at: *at,
                color: color.to_string(),
                size,
                popup: format!(
                    "{}\n{}\nnearest neighbor: {:.0} m",
                    row_text(row, "name").unwrap_or_default(),
                    status,
                    distance
                ),
            })
        })
        .collect();
    DemoVisual {
        markers,
        ..DemoVisual::none()
    }
}

fn cluster_cte(config: &DemoConfig, tables: &TableResolution) -> String {
    format!(
        "pois AS (
    (SELECT name, geom FROM {temples} WHERE geom IS NOT NULL ORDER BY name LIMIT {limit})
    UNION ALL
    (SELECT name, geom FROM {stations} WHERE geom IS NOT NULL ORDER BY name LIMIT {limit})
),
density_analysis AS (
    SELECT
        p1.name,
        ST_X(p1.geom) AS lng,
        ST_Y(p1.geom) AS lat,
        COUNT(p2.name) AS neighbors
    FROM pois p1
    LEFT JOIN pois p2
        ON p1.name != p2.name
        AND {distance} < {radius}
    GROUP BY p1.name, p1.geom
),
classified AS (
    SELECT
        name,
        lng,
        lat,
        neighbors,
        {role} AS cluster_type
    FROM density_analysis
)",
        temples = tables.table("temples"),
        stations = tables.table("stations"),
        limit = SAMPLE_LIMIT,
        distance = meters("ST_Distance(p1.geom, p2.geom)"),
        radius = config.cluster_radius_m,
        role = ClusterRole::sql_case("neighbors"),
    )
}

pub(super) fn cluster(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let km = km_per_degree();
    let display = format!(
        "-- Density-based classification ({radius}m neighborhood)
WITH {cte}
SELECT
    cluster_type,
    COUNT(*) AS points,
    ROUND(AVG(neighbors), 1) AS avg_neighbors,
    ROUND((MAX(lng) - MIN(lng)) * {km}, 2) AS east_west_km,
    ROUND((MAX(lat) - MIN(lat)) * {km}, 2) AS north_south_km
FROM classified
GROUP BY cluster_type
ORDER BY AVG(neighbors) DESC, cluster_type",
        radius = config.cluster_radius_m,
        cte = cluster_cte(config, tables),
        km = km,
    );
    let map = format!(
        "WITH {cte}
SELECT name, lng, lat, neighbors, cluster_type
FROM classified
ORDER BY name",
        cte = cluster_cte(config, tables),
    );
    DemoQuery::with_map(Demo::Cluster, display, map)
}

fn cluster_popup() -> ClickHandler {
    Arc::new(|props: &Properties| {
        let text = |key: &str| match props.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        format!(
            "{}\ncluster type: {}\nneighbors: {}",
            text("name"),
            text("cluster_type"),
            text("neighbors")
        )
    })
}

/// Points colored and sized by their role. The role is derived from the
/// neighbor count so it always agrees with the SQL classification.
pub(super) fn cluster_visual(rows: &[Row]) -> DemoVisual {
    let points = rows
        .iter()
        .filter_map(|row| {
            let at = row_coord(row, "lng", "lat")?;
            let neighbors = row_f64(row, "neighbors").unwrap_or(0.0) as i64;
            let role = ClusterRole::from_neighbors(neighbors);
            Some(
                Feature::new(Geometry::Point(at))
                    .with_property("name", row_text(row, "name").unwrap_or_default())
                    .with_property("neighbors", neighbors)
                    .with_property("cluster_type", role.to_string())
                    .with_property("color", role.color())
                    .with_property("radius", role.radius()),
            )
        })
        .collect::<Vec<_>>();
    if points.is_empty() {
        return DemoVisual::none();
    }
    DemoVisual::none().layer(
        LayerSet::new(
            SourceSpec::new("cluster-points", FeatureCollection::new(points)),
            vec![LayerSpec::circle("cluster-points", "cluster-points")
                .paint("circle-radius", json!(["get", "radius"]))
                .paint("circle-color", json!(["get", "color"]))
                .paint("circle-stroke-color", "#FFFFFF")
                .paint("circle-stroke-width", 2)],
        )
        .on_click("cluster-points", cluster_popup()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ResultSet, Scalar};

    #[test]
    fn test_centroid_marker_from_display_row() {
        let rows = ResultSet::from_values(
            &["description", "lng", "lat", "temple_count"],
            vec![vec![
                "Center of all temples".into(),
                135.7681.into(),
                34.9946.into(),
                12i64.into(),
            ]],
        );
        let visual = centroid_visual(&rows.rows);
        let marker = visual.centroid.expect("a centroid marker");
        assert_eq!(marker.at, [135.7681, 34.9946]);
        assert_eq!(marker.size, 20);

        let empty = ResultSet::from_values(
            &["description", "lng", "lat", "temple_count"],
            vec![vec!["x".into(), Scalar::Null, Scalar::Null, 0i64.into()]],
        );
        assert!(centroid_visual(&empty.rows).is_empty());
    }

    #[test]
    fn test_hull_outline_is_closed() {
        let rows = ResultSet::from_values(
            &["lng", "lat"],
            vec![
                vec![135.70.into(), 35.00.into()],
                vec![135.75.into(), 34.95.into()],
                vec![135.80.into(), 35.00.into()],
                vec![135.75.into(), 35.05.into()],
                vec![135.76.into(), 35.01.into()],
            ],
        );
        let visual = hull_visual(&rows.rows);
        let geometry = &visual.layers[0].source.data.features[0].geometry;
        assert!(geometry.rings_closed());
        assert_eq!(geometry.coord_count(), 5);
        assert!(hull_visual(&[]).is_empty());
    }

    #[test]
    fn test_catchment_colors_follow_station_order() {
        let rows = ResultSet::from_values(
            &["temple", "lng", "lat", "station"],
            vec![
                vec!["a".into(), 135.70.into(), 35.00.into(), "B station".into()],
                vec!["b".into(), 135.71.into(), 35.01.into(), "A station".into()],
                vec!["c".into(), 135.72.into(), 35.02.into(), "B station".into()],
            ],
        );
        let visual = voronoi_visual(&rows.rows);
        let colors = visual
            .markers
            .iter()
            .map(|m| m.color.as_str())
            .collect::<Vec<_>>();
        assert_eq!(colors, vec!["#4ECDC4", "#FF6B6B", "#4ECDC4"]);
    }

    #[test]
    fn test_isolated_point_gets_large_marker() {
        let rows = ResultSet::from_values(
            &["name", "lng", "lat", "nearest_m"],
            ["a", "b", "c", "d", "far"]
                .iter()
                .zip([100.0, 100.0, 100.0, 100.0, 1000.0])
                .enumerate()
                .map(|(i, (name, d))| {
                    vec![
                        (*name).into(),
                        (135.7 + i as f64 * 0.01).into(),
                        35.0.into(),
                        d.into(),
                    ]
                })
                .collect(),
        );
        let visual = outlier_visual(&rows.rows);
        assert_eq!(visual.markers.len(), 1);
        assert_eq!(visual.markers[0].size, 20);
        assert!(visual.markers[0].popup.starts_with("far\nisolated"));
    }

    #[test]
    fn test_cluster_roles_and_popup() {
        let rows = ResultSet::from_values(
            &["name", "lng", "lat", "neighbors", "cluster_type"],
            vec![
                vec!["core".into(), 135.70.into(), 35.0.into(), 4i64.into(), "core".into()],
                vec!["edge".into(), 135.71.into(), 35.0.into(), 2i64.into(), "border".into()],
                vec!["alone".into(), 135.72.into(), 35.0.into(), 0i64.into(), "noise".into()],
            ],
        );
        let visual = cluster_visual(&rows.rows);
        let set = &visual.layers[0];
        let colors = set
            .source
            .data
            .features
            .iter()
            .map(|f| f.properties["color"].clone())
            .collect::<Vec<_>>();
        assert_eq!(colors, vec![json!("#FF5722"), json!("#FFC107"), json!("#9E9E9E")]);

        let (layer, handler) = set.click.as_ref().expect("a click handler");
        assert_eq!(layer, "cluster-points");
        let popup = handler(&set.source.data.features[1].properties);
        assert_eq!(popup, "edge\ncluster type: border\nneighbors: 2");
    }

    #[test]
    fn test_grid_visual_cell_size() {
        let rows = ResultSet::from_values(
            &["grid_lng", "grid_lat", "poi_count"],
            vec![vec![135.76.into(), 35.0.into(), 3i64.into()]],
        );
        let visual = grid_visual(&rows.rows);
        let layer_ids = visual.layers[0]
            .layers
            .iter()
            .map(|l| l.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(layer_ids, vec!["grid-cells", "grid-lines"]);
        match &visual.layers[0].source.data.features[0].geometry {
            Geometry::Polygon(rings) => {
                let width = rings[0][1][0] - rings[0][0][0];
                assert!((width - 1.0 / CELL_GRID_FACTOR).abs() < 1e-12);
            }
            other => panic!("expected a polygon, got {:?}", other),
        }
    }
}
