//! In-memory renderer
//!
//! Enforces the same id rules as MapLibre GL and can export its state as a
//! style document, which is what the CLI writes out.

use super::{ClickHandler, LayerSpec, MapRenderer, Marker, MarkerId, SourceSpec};
use crate::errors::{MapError, MapResult};
use crate::viz::Coord;
use indexmap::IndexMap;
use serde_json::{json, Value};

pub struct InMemoryMap {
    center: Coord,
    zoom: f64,
    sources: IndexMap<String, SourceSpec>,
    layers: IndexMap<String, LayerSpec>,
    handlers: IndexMap<String, Vec<ClickHandler>>,
    markers: IndexMap<MarkerId, Marker>,
    next_marker: MarkerId,
}

impl InMemoryMap {
    pub fn new(center: Coord, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            sources: IndexMap::new(),
            layers: IndexMap::new(),
            handlers: IndexMap::new(),
            markers: IndexMap::new(),
            next_marker: 1,
        }
    }

    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.get(id)
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.keys().map(String::as_str).collect()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn handler_count(&self, layer_id: &str) -> usize {
        self.handlers.get(layer_id).map(Vec::len).unwrap_or(0)
    }

    /// Simulate a click on the `index`-th feature of a layer's source and
    /// return the popup text of every handler attached to that layer
    pub fn click(&self, layer_id: &str, index: usize) -> Vec<String> {
        let Some(layer) = self.layers.get(layer_id) else {
            return Vec::new();
        };
        let Some(feature) = self
            .sources
            .get(&layer.source)
            .and_then(|source| source.data.features.get(index))
        else {
            return Vec::new();
        };
        self.handlers
            .get(layer_id)
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|handler| handler(&feature.properties))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// MapLibre style document (version 8) with an OSM raster base layer,
    /// plus the current markers
    pub fn to_style_json(&self) -> Value {
        let mut sources = serde_json::Map::new();
        sources.insert(
            "osm".to_string(),
            json!({
                "type": "raster",
                "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
                "tileSize": 256,
                "attribution": "© OpenStreetMap contributors"
            }),
        );
        for (id, source) in &self.sources {
            sources.insert(
                id.clone(),
                json!({ "type": "geojson", "data": source.data }),
            );
        }

        let mut layers = vec![json!({ "id": "osm", "type": "raster", "source": "osm" })];
        layers.extend(self.layers.values().map(|layer| json!(layer)));

        json!({
            "version": 8,
            "center": self.center,
            "zoom": self.zoom,
            "sources": sources,
            "layers": layers,
            "markers": self.markers.values().collect::<Vec<_>>(),
        })
    }
}

impl MapRenderer for InMemoryMap {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    fn add_source(&mut self, source: SourceSpec) -> MapResult<()> {
        if self.sources.contains_key(&source.id) {
            return Err(MapError::DuplicateSource(source.id));
        }
        self.sources.insert(source.id.clone(), source);
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> MapResult<()> {
        if self.layers.contains_key(&layer.id) {
            return Err(MapError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(MapError::MissingSource {
                layer: layer.id,
                source_id: layer.source,
            });
        }
        self.layers.insert(layer.id.clone(), layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> MapResult<()> {
        if self.layers.shift_remove(id).is_none() {
            return Err(MapError::UnknownLayer(id.to_string()));
        }
        self.handlers.shift_remove(id);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> MapResult<()> {
        if !self.sources.contains_key(id) {
            return Err(MapError::UnknownSource(id.to_string()));
        }
        if let Some(layer) = self.layers.values().find(|layer| layer.source == id) {
            return Err(MapError::SourceInUse {
                source_id: id.to_string(),
                layer: layer.id.clone(),
            });
        }
        self.sources.shift_remove(id);
        Ok(())
    }

    fn on_click(&mut self, layer_id: &str, handler: ClickHandler) {
        self.handlers
            .entry(layer_id.to_string())
            .or_default()
            .push(handler);
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        let id = self.next_marker;
        self.next_marker += 1;
        self.markers.insert(id, marker);
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.shift_remove(&id);
    }

    fn marker_ids(&self) -> Vec<MarkerId> {
        self.markers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::{Feature, FeatureCollection, Geometry, Properties};
    use std::sync::Arc;

    fn map() -> InMemoryMap {
        InMemoryMap::new([135.758767, 34.985458], 12.0)
    }

    fn points() -> FeatureCollection {
        FeatureCollection::single(
            Feature::new(Geometry::Point([135.7850, 34.9948])).with_property("name", "清水寺"),
        )
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut map = map();
        map.add_source(SourceSpec::new("s", points())).unwrap();
        assert_eq!(
            map.add_source(SourceSpec::new("s", points())),
            Err(MapError::DuplicateSource("s".to_string()))
        );
        map.add_layer(LayerSpec::circle("l", "s")).unwrap();
        assert!(matches!(
            map.add_layer(LayerSpec::circle("l", "s")),
            Err(MapError::DuplicateLayer(_))
        ));
    }

    #[test]
    fn test_source_in_use_cannot_be_removed() {
        let mut map = map();
        map.add_source(SourceSpec::new("s", points())).unwrap();
        map.add_layer(LayerSpec::circle("l", "s")).unwrap();
        assert!(matches!(map.remove_source("s"), Err(MapError::SourceInUse { .. })));
        map.remove_layer("l").unwrap();
        map.remove_source("s").unwrap();
        assert!(map.source_ids().is_empty());
    }

    #[test]
    fn test_layer_requires_source() {
        let mut map = map();
        assert!(matches!(
            map.add_layer(LayerSpec::line("l", "nope")),
            Err(MapError::MissingSource { .. })
        ));
    }

    #[test]
    fn test_click_runs_handlers_and_removal_drops_them() {
        let mut map = map();
        map.add_source(SourceSpec::new("s", points())).unwrap();
        map.add_layer(LayerSpec::circle("l", "s")).unwrap();
        map.on_click(
            "l",
            Arc::new(|props: &Properties| props["name"].as_str().unwrap_or_default().to_string()),
        );
        assert_eq!(map.click("l", 0), vec!["清水寺".to_string()]);
        assert!(map.click("l", 3).is_empty());

        map.remove_layer("l").unwrap();
        assert_eq!(map.handler_count("l"), 0);
    }

    #[test]
    fn test_style_export_lists_base_layer_first() {
        let mut map = map();
        map.add_source(SourceSpec::new("s", points())).unwrap();
        map.add_layer(LayerSpec::circle("l", "s").paint("circle-radius", 6))
            .unwrap();
        let style = map.to_style_json();
        assert_eq!(style["version"], 8);
        assert_eq!(style["layers"][0]["id"], "osm");
        assert_eq!(style["layers"][1]["type"], "circle");
        assert_eq!(style["sources"]["s"]["type"], "geojson");
        assert_eq!(style["layers"][1]["paint"]["circle-radius"], 6);
    }
}
