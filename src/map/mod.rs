//! Map renderer boundary
//!
//! A renderer holds named sources (feature collections) and named layers (a
//! style bound to one source). Ids are unique per kind. Click handlers are
//! scoped to a layer id and receive the clicked feature's properties.

pub mod memory;

pub use memory::InMemoryMap;

use crate::errors::MapResult;
use crate::viz::{Coord, FeatureCollection, Properties};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LayerKind {
    Line,
    Fill,
    Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSpec {
    pub id: String,
    pub data: FeatureCollection,
}

impl SourceSpec {
    pub fn new(id: impl Into<String>, data: FeatureCollection) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// A style bound to a source. `paint` holds MapLibre paint properties,
/// including data-driven expressions such as `["get", "opacity"]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    pub paint: serde_json::Map<String, Value>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, kind: LayerKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            paint: serde_json::Map::new(),
        }
    }

    pub fn line(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(id, LayerKind::Line, source)
    }

    pub fn fill(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(id, LayerKind::Fill, source)
    }

    pub fn circle(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(id, LayerKind::Circle, source)
    }

    pub fn paint(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.paint.insert(key.to_string(), value.into());
        self
    }
}

/// A standalone marker element, outside the source/layer model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub at: Coord,
    pub color: String,
    pub size: u32,
    pub popup: String,
}

pub type MarkerId = u64;

/// Produces popup text from a clicked feature's properties
pub type ClickHandler = Arc<dyn Fn(&Properties) -> String + Send + Sync>;

pub trait MapRenderer: Send {
    fn has_source(&self, id: &str) -> bool;
    fn has_layer(&self, id: &str) -> bool;

    /// Fails when the id is taken
    fn add_source(&mut self, source: SourceSpec) -> MapResult<()>;
    /// Fails when the id is taken or the source does not exist
    fn add_layer(&mut self, layer: LayerSpec) -> MapResult<()>;
    /// Fails when the layer does not exist. Drops the layer's click handlers.
    fn remove_layer(&mut self, id: &str) -> MapResult<()>;
    /// Fails when the source does not exist or a layer still uses it
    fn remove_source(&mut self, id: &str) -> MapResult<()>;

    fn on_click(&mut self, layer_id: &str, handler: ClickHandler);

    fn add_marker(&mut self, marker: Marker) -> MarkerId;
    fn remove_marker(&mut self, id: MarkerId);
    fn marker_ids(&self) -> Vec<MarkerId>;
}
