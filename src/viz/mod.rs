//! GeoJSON-shaped feature types and the pure geometry syntheses that turn
//! result rows into something the map renderer can draw.

pub mod builder;

pub use builder::*;

use serde::{Deserialize, Serialize};

/// `[lng, lat]` in degrees
pub type Coord = [f64; 2];

pub type Properties = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
}

impl Geometry {
    pub fn coord_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(coords) => coords.len(),
            Geometry::Polygon(rings) => rings.iter().map(Vec::len).sum(),
        }
    }

    /// True for every polygon whose rings all end on their first coordinate.
    /// Points and lines are trivially closed.
    pub fn rings_closed(&self) -> bool {
        match self {
            Geometry::Polygon(rings) => rings
                .iter()
                .all(|ring| ring.len() >= 4 && ring.first() == ring.last()),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn single(feature: Feature) -> Self {
        Self {
            features: vec![feature],
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
