//! Row set → feature collection syntheses
//!
//! Every function here is pure. Rows that lack the coordinate columns a
//! synthesis needs are skipped.

use super::{Coord, Feature, FeatureCollection, Geometry};
use crate::classify::Density;
use crate::engine::{row_f64, Row};
use std::f64::consts::PI;

/// Samples taken around a buffer circle before closing the ring
pub const CIRCLE_SAMPLES: usize = 64;
/// Kilometres per degree of longitude at the equator
pub const KM_PER_DEGREE_LNG: f64 = 111.320;
/// Kilometres per degree of latitude
pub const KM_PER_DEGREE_LAT: f64 = 110.574;
/// Angular radius of a synthesized display hexagon
pub const HEX_RADIUS_DEG: f64 = 0.002;
/// Longitude stretch applied to display hexagons
pub const HEX_LNG_STRETCH: f64 = 1.5;

/// Maps a property name on the feature to the column it is read from
pub type PropertyMap<'a> = &'a [(&'a str, &'a str)];

pub fn row_coord(row: &Row, lng: &str, lat: &str) -> Option<Coord> {
    Some([row_f64(row, lng)?, row_f64(row, lat)?])
}

fn with_properties(mut feature: Feature, row: &Row, properties: PropertyMap<'_>) -> Feature {
    for (name, column) in properties {
        if let Some(value) = row.get(*column) {
            feature.properties.insert(name.to_string(), value.to_json());
        }
    }
    feature
}

/// One feature per row at the row's coordinate
pub fn point_features(
    rows: &[Row],
    lng: &str,
    lat: &str,
    properties: PropertyMap<'_>,
) -> FeatureCollection {
    rows.iter()
        .filter_map(|row| {
            let at = row_coord(row, lng, lat)?;
            Some(with_properties(
                Feature::new(Geometry::Point(at)),
                row,
                properties,
            ))
        })
        .collect::<Vec<_>>()
        .into()
}

/// Two-point lines from a fixed origin to each row's coordinate
pub fn lines_from_origin(
    origin: Coord,
    rows: &[Row],
    lng: &str,
    lat: &str,
    properties: PropertyMap<'_>,
) -> FeatureCollection {
    rows.iter()
        .filter_map(|row| {
            let to = row_coord(row, lng, lat)?;
            Some(with_properties(
                Feature::new(Geometry::LineString(vec![origin, to])),
                row,
                properties,
            ))
        })
        .collect::<Vec<_>>()
        .into()
}

/// Two-point lines between two coordinates carried by the same row
pub fn lines_between(
    rows: &[Row],
    from: (&str, &str),
    to: (&str, &str),
    properties: PropertyMap<'_>,
) -> FeatureCollection {
    rows.iter()
        .filter_map(|row| {
            let start = row_coord(row, from.0, from.1)?;
            let end = row_coord(row, to.0, to.1)?;
            Some(with_properties(
                Feature::new(Geometry::LineString(vec![start, end])),
                row,
                properties,
            ))
        })
        .collect::<Vec<_>>()
        .into()
}

/// Closed ring approximating a circle of `radius_m` meters. The two axes are
/// scaled independently; longitude is corrected by the cosine of the
/// center's latitude.
pub fn circle_ring(center: Coord, radius_m: f64, samples: usize) -> Vec<Coord> {
    let km = radius_m / 1000.0;
    let distance_x = km / (KM_PER_DEGREE_LNG * (center[1] * PI / 180.0).cos());
    let distance_y = km / KM_PER_DEGREE_LAT;

    let mut ring = Vec::with_capacity(samples + 1);
    for i in 0..samples {
        let theta = (i as f64 / samples as f64) * (2.0 * PI);
        ring.push([
            center[0] + distance_x * theta.cos(),
            center[1] + distance_y * theta.sin(),
        ]);
    }
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

pub fn buffer_circle(center: Coord, radius_m: f64) -> Feature {
    Feature::new(Geometry::Polygon(vec![circle_ring(
        center,
        radius_m,
        CIRCLE_SAMPLES,
    )]))
    .with_property("radius_m", radius_m)
}

/// Axis-aligned square of side `cell_size` degrees centered on `center`
pub fn cell_ring(center: Coord, cell_size: f64) -> Vec<Coord> {
    let half = cell_size / 2.0;
    let [lng, lat] = center;
    vec![
        [lng - half, lat - half],
        [lng + half, lat - half],
        [lng + half, lat + half],
        [lng - half, lat + half],
        [lng - half, lat - half],
    ]
}

pub fn grid_opacity(count: i64) -> f64 {
    (count as f64 * 0.2).min(0.8)
}

/// One rectangle per aggregated grid cell
pub fn grid_cells(
    rows: &[Row],
    lng: &str,
    lat: &str,
    count: &str,
    cell_size: f64,
) -> FeatureCollection {
    rows.iter()
        .filter_map(|row| {
            let center = row_coord(row, lng, lat)?;
            let n = row_f64(row, count).unwrap_or(0.0) as i64;
            Some(
                Feature::new(Geometry::Polygon(vec![cell_ring(center, cell_size)]))
                    .with_property("count", n)
                    .with_property("opacity", grid_opacity(n)),
            )
        })
        .collect::<Vec<_>>()
        .into()
}

/// Regular hexagon around a recovered cell center. This is a display shape,
/// not the hex-grid cell boundary.
pub fn hexagon_ring(center: Coord, radius: f64) -> Vec<Coord> {
    let mut ring = (0..6)
        .map(|i| {
            let angle = (PI / 3.0) * i as f64;
            [
                center[0] + radius * angle.cos() * HEX_LNG_STRETCH,
                center[1] + radius * angle.sin(),
            ]
        })
        .collect::<Vec<_>>();
    ring.push(ring[0]);
    ring
}

pub fn hex_opacity(count: i64) -> f64 {
    (count as f64 * 0.3).min(0.9)
}

pub fn hex_fill_color(count: i64) -> &'static str {
    match Density::from_count(count) {
        Density::High => "#6A1B9A",
        Density::Medium => "#8E24AA",
        Density::Low => "#AB47BC",
    }
}

pub fn hex_cells(rows: &[Row], lng: &str, lat: &str, count: &str) -> FeatureCollection {
    rows.iter()
        .filter_map(|row| {
            let center = row_coord(row, lng, lat)?;
            let n = row_f64(row, count).unwrap_or(0.0) as i64;
            Some(
                Feature::new(Geometry::Polygon(vec![hexagon_ring(center, HEX_RADIUS_DEG)]))
                    .with_property("count", n)
                    .with_property("opacity", hex_opacity(n))
                    .with_property("fillColor", hex_fill_color(n)),
            )
        })
        .collect::<Vec<_>>()
        .into()
}

/// Ring through the four extreme points, in the order left, bottom, right,
/// top, back to left. Ties keep the first point seen. This outlines the
/// point set; it is not a convex hull.
pub fn extreme_point_ring(points: &[Coord]) -> Option<Vec<Coord>> {
    let first = *points.first()?;
    let (mut left, mut right, mut bottom, mut top) = (first, first, first, first);
    for p in &points[1..] {
        if p[0] < left[0] {
            left = *p;
        }
        if p[0] > right[0] {
            right = *p;
        }
        if p[1] < bottom[1] {
            bottom = *p;
        }
        if p[1] > top[1] {
            top = *p;
        }
    }
    Some(vec![left, bottom, right, top, left])
}

/// Polyline starting at `origin` through `stops` in order
pub fn route_line(origin: Coord, stops: &[Coord]) -> Feature {
    let mut coords = Vec::with_capacity(stops.len() + 1);
    coords.push(origin);
    coords.extend_from_slice(stops);
    Feature::new(Geometry::LineString(coords)).with_property("stops", stops.len() as i64)
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        FeatureCollection::new(features)
    }
}
