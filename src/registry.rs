//! Layer registry
//!
//! Owns the map renderer and records, per id, which source and layers are
//! currently registered. `set_layer` and `remove` are the only mutators of
//! source/layer state, so there is never more than one descriptor per id.
//!
//! Demo invocations are numbered with a [`DemoToken`]. Starting a demo bumps
//! the token and clears the previous demo's layers; a demo's results are only
//! applied while its token is still the current one.

use crate::errors::MapResult;
use crate::map::{ClickHandler, LayerSpec, MapRenderer, Marker, MarkerId, SourceSpec};
use indexmap::IndexMap;
use tracing::debug;

/// Every source/layer id a demo visualization may register
pub const DEMO_LAYER_IDS: &[&str] = &[
    // distance
    "distance-lines",
    "distance-circles",
    // buffer
    "buffer-circle",
    "buffer-fill",
    // nearest
    "nearest-lines",
    // grid
    "grid-cells",
    "grid-lines",
    // hex grid
    "hex-cells",
    "hex-outline",
    // convex hull
    "convex-hull",
    // route
    "tourist-route",
    // cluster
    "cluster-points",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerScope {
    /// Cleared whenever a new demo starts
    Demo,
    /// Owned by the toggle manager
    Overlay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub source_id: String,
    pub layer_ids: Vec<String>,
    pub scope: LayerScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DemoToken(u64);

impl DemoToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// One source with the layers drawn from it
pub struct LayerSet {
    pub id: String,
    pub source: SourceSpec,
    pub layers: Vec<LayerSpec>,
    pub click: Option<(String, ClickHandler)>,
}

impl LayerSet {
    pub fn new(source: SourceSpec, layers: Vec<LayerSpec>) -> Self {
        Self {
            id: source.id.clone(),
            source,
            layers,
            click: None,
        }
    }

    pub fn on_click(mut self, layer_id: impl Into<String>, handler: ClickHandler) -> Self {
        self.click = Some((layer_id.into(), handler));
        self
    }
}

/// Everything a demo draws
#[derive(Default)]
pub struct DemoVisual {
    pub layers: Vec<LayerSet>,
    pub markers: Vec<Marker>,
    pub centroid: Option<Marker>,
}

impl DemoVisual {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn layer(mut self, set: LayerSet) -> Self {
        self.layers.push(set);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.markers.is_empty() && self.centroid.is_none()
    }
}

pub struct LayerRegistry<M: MapRenderer> {
    map: M,
    descriptors: IndexMap<String, LayerDescriptor>,
    current: DemoToken,
    markers: Vec<MarkerId>,
    centroid_marker: Option<MarkerId>,
}

impl<M: MapRenderer> LayerRegistry<M> {
    pub fn new(map: M) -> Self {
        Self {
            map,
            descriptors: IndexMap::new(),
            current: DemoToken::default(),
            markers: Vec::new(),
            centroid_marker: None,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn into_map(self) -> M {
        self.map
    }

    pub fn descriptor(&self, id: &str) -> Option<&LayerDescriptor> {
        self.descriptors.get(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    pub fn centroid_marker(&self) -> Option<MarkerId> {
        self.centroid_marker
    }

    /// Replace whatever is registered under `id` with `source` and `layers`
    pub fn set_layer(
        &mut self,
        id: &str,
        source: SourceSpec,
        layers: Vec<LayerSpec>,
        scope: LayerScope,
    ) -> MapResult<()> {
        self.remove(id)?;

        let descriptor = LayerDescriptor {
            source_id: source.id.clone(),
            layer_ids: layers.iter().map(|layer| layer.id.clone()).collect(),
            scope,
        };
        self.map.add_source(source)?;
        for layer in layers {
            self.map.add_layer(layer)?;
        }
        debug!("registered {} with layers {:?}", id, descriptor.layer_ids);
        self.descriptors.insert(id.to_string(), descriptor);
        Ok(())
    }

    pub fn on_click(&mut self, layer_id: &str, handler: ClickHandler) {
        self.map.on_click(layer_id, handler);
    }

    /// Remove the layers registered under `id`, then their source. Ids that
    /// are not on the map are ignored.
    pub fn remove(&mut self, id: &str) -> MapResult<()> {
        if let Some(descriptor) = self.descriptors.shift_remove(id) {
            for layer_id in &descriptor.layer_ids {
                if self.map.has_layer(layer_id) {
                    self.map.remove_layer(layer_id)?;
                }
            }
            if self.map.has_source(&descriptor.source_id) {
                self.map.remove_source(&descriptor.source_id)?;
            }
        }
        if self.map.has_layer(id) {
            self.map.remove_layer(id)?;
        }
        if self.map.has_source(id) {
            self.map.remove_source(id)?;
        }
        Ok(())
    }

    /// Remove every demo visualization id, every marker and the centroid
    /// marker. Calling it again is a no-op.
    pub fn clear_demo_layers(&mut self) -> MapResult<()> {
        for id in DEMO_LAYER_IDS {
            self.remove(id)?;
        }
        let leftover = self
            .descriptors
            .iter()
            .filter(|(_, d)| d.scope == LayerScope::Demo)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        for id in leftover {
            self.remove(&id)?;
        }

        for marker in self.markers.drain(..) {
            self.map.remove_marker(marker);
        }
        if let Some(marker) = self.centroid_marker.take() {
            self.map.remove_marker(marker);
        }
        Ok(())
    }

    pub fn add_marker(&mut self, marker: Marker) -> MarkerId {
        let id = self.map.add_marker(marker);
        self.markers.push(id);
        id
    }

    pub fn set_centroid_marker(&mut self, marker: Marker) -> MarkerId {
        if let Some(previous) = self.centroid_marker.take() {
            self.map.remove_marker(previous);
        }
        let id = self.map.add_marker(marker);
        self.centroid_marker = Some(id);
        id
    }

    /// Start a new demo: bump the token and clear the previous demo's
    /// visualization
    pub fn begin_demo(&mut self) -> MapResult<DemoToken> {
        self.current = DemoToken(self.current.0 + 1);
        self.clear_demo_layers()?;
        Ok(self.current)
    }

    pub fn current_token(&self) -> DemoToken {
        self.current
    }

    pub fn is_current(&self, token: DemoToken) -> bool {
        self.current == token
    }

    /// Apply a demo's visualization if `token` is still current. Returns
    /// `false` and leaves the map untouched when a newer demo has started.
    pub fn apply(&mut self, token: DemoToken, visual: DemoVisual) -> MapResult<bool> {
        if !self.is_current(token) {
            debug!(
                "discarding visualization of demo {} (current is {})",
                token.0, self.current.0
            );
            return Ok(false);
        }

        for set in visual.layers {
            let id = set.id.clone();
            self.set_layer(&id, set.source, set.layers, LayerScope::Demo)?;
            if let Some((layer_id, handler)) = set.click {
                self.on_click(&layer_id, handler);
            }
        }
        for marker in visual.markers {
            self.add_marker(marker);
        }
        if let Some(marker) = visual.centroid {
            self.set_centroid_marker(marker);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::InMemoryMap;
    use crate::viz::{buffer_circle, FeatureCollection};

    fn registry() -> LayerRegistry<InMemoryMap> {
        LayerRegistry::new(InMemoryMap::new([135.758767, 34.985458], 12.0))
    }

    fn buffer_set() -> LayerSet {
        LayerSet::new(
            SourceSpec::new(
                "buffer-fill",
                FeatureCollection::single(buffer_circle([135.758767, 34.985458], 1000.0)),
            ),
            vec![
                LayerSpec::fill("buffer-fill", "buffer-fill"),
                LayerSpec::line("buffer-circle", "buffer-fill"),
            ],
        )
    }

    fn marker() -> Marker {
        Marker {
            at: [135.76, 35.0],
            color: "#FF0000".to_string(),
            size: 20,
            popup: "center".to_string(),
        }
    }

    #[test]
    fn test_set_layer_twice_keeps_one_descriptor() {
        let mut registry = registry();
        for _ in 0..2 {
            let set = buffer_set();
            registry
                .set_layer(&set.id, set.source, set.layers, LayerScope::Demo)
                .unwrap();
        }
        assert_eq!(registry.ids(), vec!["buffer-fill"]);
        assert_eq!(registry.map().source_ids(), vec!["buffer-fill"]);
        assert_eq!(registry.map().layer_ids(), vec!["buffer-fill", "buffer-circle"]);
    }

    #[test]
    fn test_clear_demo_layers_is_idempotent() {
        let mut registry = registry();
        let token = registry.begin_demo().unwrap();
        registry
            .apply(token, DemoVisual::none().layer(buffer_set()))
            .unwrap();
        registry.add_marker(marker());
        registry.set_centroid_marker(marker());

        registry.clear_demo_layers().unwrap();
        assert!(registry.map().layer_ids().is_empty());
        assert!(registry.map().source_ids().is_empty());
        assert_eq!(registry.map().markers().count(), 0);
        assert!(registry.centroid_marker().is_none());

        registry.clear_demo_layers().unwrap();
        assert!(registry.ids().is_empty());
    }

    #[test]
    fn test_clear_leaves_overlays_alone() {
        let mut registry = registry();
        registry
            .set_layer(
                "parks-source",
                SourceSpec::new("parks-source", FeatureCollection::default()),
                vec![LayerSpec::circle("parks-markers", "parks-source")],
                LayerScope::Overlay,
            )
            .unwrap();
        registry.clear_demo_layers().unwrap();
        assert_eq!(registry.map().layer_ids(), vec!["parks-markers"]);
    }

    #[test]
    fn test_stale_token_is_discarded() {
        let mut registry = registry();
        let first = registry.begin_demo().unwrap();
        let second = registry.begin_demo().unwrap();
        assert!(second > first);

        let applied = registry
            .apply(first, DemoVisual::none().layer(buffer_set()))
            .unwrap();
        assert!(!applied);
        assert!(registry.map().source_ids().is_empty());

        assert!(registry
            .apply(second, DemoVisual::none().layer(buffer_set()))
            .unwrap());
        assert_eq!(registry.map().source_ids(), vec!["buffer-fill"]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut registry = registry();
        registry.remove("never-added").unwrap();
    }

    #[test]
    fn test_centroid_marker_is_replaced() {
        let mut registry = registry();
        registry.set_centroid_marker(marker());
        registry.set_centroid_marker(marker());
        assert_eq!(registry.map().markers().count(), 1);
    }
}
