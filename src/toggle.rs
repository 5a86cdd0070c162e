//! Toggleable dataset overlays
//!
//! Each [`Dataset`] can be switched on and off independently of the demos.
//! Loading registers source `<name>-source` with a circle layer
//! `<name>-markers` in the dataset's color; unloading removes both. Overlays
//! survive demo changes and are only removed by toggling or `clear_all`.

use crate::catalog::TableResolution;
use crate::engine::Row;
use crate::errors::{ConfigError, MapResult, UiStateError};
use crate::map::{ClickHandler, LayerSpec, MapRenderer, SourceSpec};
use crate::registry::{LayerRegistry, LayerScope};
use crate::viz::{point_features, Properties};
use indexmap::IndexMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Dataset {
    Temples,
    Stations,
    Restaurants,
    Accommodation,
    Convenience,
    Parks,
    Souvenirs,
    Supermarkets,
    PlateauShelters,
    PlateauLandmarks,
    PlateauParks,
    PlateauEmergency,
}

impl Dataset {
    pub fn parse(name: &str) -> Result<Dataset, UiStateError> {
        Dataset::from_str(name).map_err(|_| UiStateError::UnknownDataset(name.to_string()))
    }

    pub fn color(self) -> &'static str {
        match self {
            Dataset::Temples => "#FF6B6B",
            Dataset::Stations => "#4ECDC4",
            Dataset::Restaurants => "#FFA500",
            Dataset::Accommodation => "#9C27B0",
            Dataset::Convenience => "#00BCD4",
            Dataset::Parks => "#4CAF50",
            Dataset::Souvenirs => "#E91E63",
            Dataset::Supermarkets => "#795548",
            Dataset::PlateauShelters => "#FF0000",
            Dataset::PlateauLandmarks => "#0000FF",
            Dataset::PlateauParks => "#00FF00",
            Dataset::PlateauEmergency => "#FF00FF",
        }
    }

    pub fn source_id(self) -> String {
        format!("{}-source", self)
    }

    pub fn layer_id(self) -> String {
        format!("{}-markers", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub loaded: bool,
    pub color: &'static str,
}

/// Result of one toggle request
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Loaded { dataset: Dataset, features: usize },
    Removed { dataset: Dataset },
    /// The lookup failed; the dataset stays unloaded
    Failed { dataset: Dataset, message: String },
}

impl ToggleOutcome {
    pub fn dataset(&self) -> Dataset {
        match self {
            ToggleOutcome::Loaded { dataset, .. }
            | ToggleOutcome::Removed { dataset }
            | ToggleOutcome::Failed { dataset, .. } => *dataset,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToggleManager {
    states: IndexMap<Dataset, ToggleState>,
}

impl Default for ToggleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToggleManager {
    pub fn new() -> Self {
        let states = Dataset::iter()
            .map(|dataset| {
                (
                    dataset,
                    ToggleState {
                        loaded: false,
                        color: dataset.color(),
                    },
                )
            })
            .collect();
        Self { states }
    }

    pub fn state(&self, dataset: Dataset) -> ToggleState {
        self.states.get(&dataset).copied().unwrap_or(ToggleState {
            loaded: false,
            color: dataset.color(),
        })
    }

    pub fn is_loaded(&self, dataset: Dataset) -> bool {
        self.state(dataset).loaded
    }

    pub fn loaded(&self) -> Vec<Dataset> {
        self.states
            .iter()
            .filter(|(_, state)| state.loaded)
            .map(|(dataset, _)| *dataset)
            .collect()
    }

    fn set_loaded(&mut self, dataset: Dataset, loaded: bool) {
        if let Some(state) = self.states.get_mut(&dataset) {
            state.loaded = loaded;
        }
    }

    /// Query producing `name`, `lng`, `lat` rows for `dataset`
    pub fn lookup_sql(dataset: Dataset, tables: &TableResolution) -> Result<String, ConfigError> {
        let logical = dataset.to_string();
        tables.lookup_sql(&logical, &tables.table(&logical))
    }

    /// Register the overlay built from `rows` and mark the dataset loaded
    pub fn load<M: MapRenderer>(
        &mut self,
        dataset: Dataset,
        rows: &[Row],
        registry: &mut LayerRegistry<M>,
    ) -> MapResult<ToggleOutcome> {
        let features = point_features(rows, "lng", "lat", &[("name", "name")]);
        let count = features.len();
        let source_id = dataset.source_id();
        let layer_id = dataset.layer_id();

        registry.set_layer(
            &source_id,
            SourceSpec::new(source_id.clone(), features),
            vec![LayerSpec::circle(layer_id.clone(), source_id.clone())
                .paint("circle-radius", 6)
                .paint("circle-color", dataset.color())
                .paint("circle-stroke-color", "#FFFFFF")
                .paint("circle-stroke-width", 2)],
            LayerScope::Overlay,
        )?;
        registry.on_click(&layer_id, name_popup());
        self.set_loaded(dataset, true);

        info!("Loaded {} with {} features", dataset, count);
        Ok(ToggleOutcome::Loaded {
            dataset,
            features: count,
        })
    }

    /// Remove the overlay; removing an absent overlay is a no-op
    pub fn unload<M: MapRenderer>(
        &mut self,
        dataset: Dataset,
        registry: &mut LayerRegistry<M>,
    ) -> MapResult<ToggleOutcome> {
        registry.remove(&dataset.source_id())?;
        registry.remove(&dataset.layer_id())?;
        self.set_loaded(dataset, false);
        debug!("Removed {}", dataset);
        Ok(ToggleOutcome::Removed { dataset })
    }

    pub fn clear_all<M: MapRenderer>(
        &mut self,
        registry: &mut LayerRegistry<M>,
    ) -> MapResult<Vec<Dataset>> {
        let loaded = self.loaded();
        for dataset in &loaded {
            self.unload(*dataset, registry)?;
        }
        Ok(loaded)
    }
}

fn name_popup() -> ClickHandler {
    Arc::new(|props: &Properties| match props.get("name") {
        Some(serde_json::Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    })
}
