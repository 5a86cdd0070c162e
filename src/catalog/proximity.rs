//! Demos measuring distance from a point or between two tables

use super::{
    degrees, meters, nearest_neighbor_cte, Demo, DemoConfig, DemoQuery, Origin,
    TableResolution,
};
use crate::common::sql_string;
use crate::engine::Row;
use crate::map::{LayerSpec, SourceSpec};
use crate::registry::{DemoVisual, LayerSet};
use crate::viz::{
    buffer_circle, lines_between, lines_from_origin, point_features, route_line, row_coord,
    FeatureCollection,
};
use serde_json::json;

/// Walking-time bands of the predicate demo, in meters
const WALK_BANDS: [(f64, &str); 3] = [
    (500.0, "5 min walk"),
    (1000.0, "10 min walk"),
    (2000.0, "20 min walk"),
];

fn distance_sql(origin: &Origin, temples: &str, with_coords: bool) -> String {
    let coords = if with_coords {
        "\n    ST_X(t.geom) AS lng,\n    ST_Y(t.geom) AS lat,"
    } else {
        ""
    };
    format!(
        "-- Distance from {name} to each temple (meters)
SELECT
    t.name,{coords}
    ROUND({distance}, 0) AS distance_m
FROM {temples} t
WHERE t.geom IS NOT NULL
ORDER BY distance_m, t.name
LIMIT 5",
        name = origin.name,
        coords = coords,
        distance = meters(&format!("ST_Distance(t.geom, {})", origin.sql_point())),
        temples = temples,
    )
}

pub(super) fn distance(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let temples = tables.table("temples");
    DemoQuery::with_map(
        Demo::Distance,
        distance_sql(&config.origin, &temples, false),
        distance_sql(&config.origin, &temples, true),
    )
}

pub(super) fn distance_visual(config: &DemoConfig, rows: &[Row]) -> DemoVisual {
    let lines = lines_from_origin(
        config.origin.coord(),
        rows,
        "lng",
        "lat",
        &[("name", "name"), ("distance_m", "distance_m")],
    );
    let points = point_features(rows, "lng", "lat", &[("name", "name")]);

    DemoVisual::none()
        .layer(LayerSet::new(
            SourceSpec::new("distance-lines", lines),
            vec![LayerSpec::line("distance-lines", "distance-lines")
                .paint("line-color", "#FF0000")
                .paint("line-width", 2)
                .paint("line-opacity", 0.6)],
        ))
        .layer(LayerSet::new(
            SourceSpec::new("distance-circles", points),
            vec![LayerSpec::circle("distance-circles", "distance-circles")
                .paint("circle-radius", 5)
                .paint("circle-color", "#FF0000")
                .paint("circle-stroke-color", "#FFFFFF")
                .paint("circle-stroke-width", 1)],
        ))
}

pub(super) fn buffer(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let sql = format!(
        "-- Temples within {radius}m of {name}
SELECT
    t.name,
    CASE
        WHEN ST_Within(t.geom, ST_Buffer({point}, {deg})) THEN 'inside'
        ELSE 'outside'
    END AS status
FROM {temples} t
WHERE t.geom IS NOT NULL
ORDER BY status, t.name
LIMIT 20",
        radius = config.buffer_radius_m,
        name = config.origin.name,
        point = config.origin.sql_point(),
        deg = degrees(config.buffer_radius_m),
        temples = tables.table("temples"),
    );
    DemoQuery::display_only(Demo::Buffer, sql)
}

/// The buffer is drawn from the parameters alone
pub(super) fn buffer_visual(config: &DemoConfig) -> DemoVisual {
    let circle = buffer_circle(config.origin.coord(), config.buffer_radius_m);
    DemoVisual::none()
        .layer(LayerSet::new(
            SourceSpec::new("buffer-fill", FeatureCollection::single(circle.clone())),
            vec![LayerSpec::fill("buffer-fill", "buffer-fill")
                .paint("fill-color", "#4CAF50")
                .paint("fill-opacity", 0.2)],
        ))
        .layer(LayerSet::new(
            SourceSpec::new("buffer-circle", FeatureCollection::single(circle)),
            vec![LayerSpec::line("buffer-circle", "buffer-circle")
                .paint("line-color", "#4CAF50")
                .paint("line-width", 2)],
        ))
}

fn nearest_sql(temples: &str, stations: &str, with_coords: bool) -> String {
    let mut columns = vec!["a.name AS temple".to_string()];
    if with_coords {
        columns.push("ST_X(a.geom) AS temple_lng".to_string());
        columns.push("ST_Y(a.geom) AS temple_lat".to_string());
    }
    columns.push("b.name AS station".to_string());
    if with_coords {
        columns.push("ST_X(b.geom) AS station_lng".to_string());
        columns.push("ST_Y(b.geom) AS station_lat".to_string());
    }
    columns.push(format!(
        "ROUND({}, 0) AS distance_m",
        meters("ST_Distance(a.geom, b.geom)")
    ));

    let selected = if with_coords {
        "temple, temple_lng, temple_lat, station, station_lng, station_lat, distance_m"
    } else {
        "temple, station, distance_m"
    };
    format!(
        "-- Nearest station to each temple
WITH {cte}
SELECT {selected}
FROM distances
WHERE rn = 1
ORDER BY temple, distance_m, station",
        cte = nearest_neighbor_cte("distances", temples, stations, &columns, false),
        selected = selected,
    )
}

pub(super) fn nearest(tables: &TableResolution) -> DemoQuery {
    let temples = tables.table("temples");
    let stations = tables.table("stations");
    DemoQuery::with_map(
        Demo::Nearest,
        nearest_sql(&temples, &stations, false),
        nearest_sql(&temples, &stations, true),
    )
}

pub(super) fn nearest_visual(rows: &[Row]) -> DemoVisual {
    let lines = lines_between(
        rows,
        ("temple_lng", "temple_lat"),
        ("station_lng", "station_lat"),
        &[
            ("temple", "temple"),
            ("station", "station"),
            ("distance_m", "distance_m"),
        ],
    );
    DemoVisual::none().layer(LayerSet::new(
        SourceSpec::new("nearest-lines", lines),
        vec![LayerSpec::line("nearest-lines", "nearest-lines")
            .paint("line-color", "#2196F3")
            .paint("line-width", 2)
            .paint("line-dasharray", json!([2, 2]))],
    ))
}

pub(super) fn spatial_join(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let sql = format!(
        "-- Temples within {radius}m of each station
SELECT
    s.name AS station,
    t.name AS temple,
    ROUND({distance}, 0) AS distance_m
FROM {stations} s
JOIN {temples} t ON ST_Distance(s.geom, t.geom) < {deg}
ORDER BY s.name, distance_m, t.name
LIMIT 10",
        radius = config.join_radius_m,
        distance = meters("ST_Distance(s.geom, t.geom)"),
        stations = tables.table("stations"),
        temples = tables.table("temples"),
        deg = degrees(config.join_radius_m),
    );
    DemoQuery::display_only(Demo::SpatialJoin, sql)
}

pub(super) fn service_area(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let sql = format!(
        "-- Overlap of {radius}m station service areas
WITH station_pairs AS (
    SELECT
        s1.name AS station1,
        s2.name AS station2,
        {distance} AS d
    FROM {stations} s1, {stations} s2
    WHERE s1.name < s2.name
      AND s1.geom IS NOT NULL
      AND s2.geom IS NOT NULL
)
SELECT
    station1,
    station2,
    CASE WHEN d < {overlap} THEN 'overlapping' ELSE 'separate' END AS overlap_status,
    ROUND(d, 0) AS distance_m
FROM station_pairs
ORDER BY d, station1, station2
LIMIT 5",
        radius = config.service_radius_m,
        distance = meters("ST_Distance(s1.geom, s2.geom)"),
        stations = tables.table("stations"),
        overlap = config.service_radius_m * 2.0,
    );
    DemoQuery::display_only(Demo::ServiceArea, sql)
}

pub(super) fn within(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let sql = format!(
        "-- Temples inside {area}
SELECT
    t.name AS temple,
    a.name AS area,
    CASE WHEN ST_Within(t.geom, a.geom) THEN 'inside' ELSE 'outside' END AS status
FROM {temples} t, {areas} a
WHERE a.name = {area_literal}
  AND t.geom IS NOT NULL
ORDER BY status, t.name",
        area = config.within_area,
        temples = tables.table("temples"),
        areas = tables.table("areas"),
        area_literal = sql_string(&config.within_area),
    );
    DemoQuery::display_only(Demo::Within, sql)
}

pub(super) fn predicates(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let bands = WALK_BANDS
        .iter()
        .map(|(limit, label)| format!("        WHEN d <= {} THEN '{}'", limit, label))
        .collect::<Vec<_>>()
        .join("\n");
    let sql = format!(
        "-- Distance predicates relative to {name}
WITH measured AS (
    SELECT
        t.name,
        {distance} AS d
    FROM {temples} t
    WHERE t.geom IS NOT NULL
)
SELECT
    name,
    ROUND(d, 0) AS distance_m,
    CASE WHEN d <= {radius} THEN 'inside' ELSE 'outside' END AS status,
    CASE
{bands}
        ELSE 'bus or train'
    END AS access
FROM measured
ORDER BY d, name
LIMIT 10",
        name = config.origin.name,
        distance = meters(&format!("ST_Distance(t.geom, {})", config.origin.sql_point())),
        temples = tables.table("temples"),
        radius = config.buffer_radius_m,
        bands = bands,
    );
    DemoQuery::display_only(Demo::Predicates, sql)
}

/// Stops are visited in order of distance from the origin
fn route_cte(config: &DemoConfig, temples: &str) -> String {
    let names = config
        .route_stops
        .iter()
        .map(|stop| sql_string(stop))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "route_points AS (
    SELECT
        ROW_NUMBER() OVER (ORDER BY ST_Distance({point}, geom), name) AS order_num,
        name,
        ST_X(geom) AS lng,
        ST_Y(geom) AS lat
    FROM {temples}
    WHERE name IN ({names})
      AND geom IS NOT NULL
)",
        point = config.origin.sql_point(),
        temples = temples,
        names = names,
    )
}

pub(super) fn route(config: &DemoConfig, tables: &TableResolution) -> DemoQuery {
    let temples = tables.table("temples");
    let display = format!(
        "-- Sightseeing route from {name}
WITH {points},
route_segments AS (
    SELECT
        p1.order_num,
        p1.name AS from_place,
        p2.name AS to_place,
        {distance} AS segment_distance
    FROM route_points p1
    JOIN route_points p2 ON p1.order_num = p2.order_num - 1
)
SELECT
    order_num AS \"Order\",
    from_place || ' -> ' || to_place AS \"Segment\",
    ROUND(segment_distance, 0) AS \"Distance (m)\",
    ROUND(SUM(segment_distance) OVER (ORDER BY order_num), 0) AS \"Cumulative (m)\"
FROM route_segments
ORDER BY order_num",
        name = config.origin.name,
        points = route_cte(config, &temples),
        distance = meters("ST_Distance(ST_Point(p1.lng, p1.lat), ST_Point(p2.lng, p2.lat))"),
    );
    let map = format!(
        "WITH {points}
SELECT order_num, name, lng, lat
FROM route_points
ORDER BY order_num",
        points = route_cte(config, &temples),
    );
    DemoQuery::with_map(Demo::Route, display, map)
}

pub(super) fn route_visual(config: &DemoConfig, rows: &[Row]) -> DemoVisual {
    let stops = rows
        .iter()
        .filter_map(|row| row_coord(row, "lng", "lat"))
        .collect::<Vec<_>>();
    if stops.is_empty() {
        return DemoVisual::none();
    }
    let line = route_line(config.origin.coord(), &stops);
    DemoVisual::none().layer(LayerSet::new(
        SourceSpec::new("tourist-route", FeatureCollection::single(line)),
        vec![LayerSpec::line("tourist-route", "tourist-route")
            .paint("line-color", "#2196F3")
            .paint("line-width", 3)
            .paint("line-opacity", 0.7)],
    ))
}
