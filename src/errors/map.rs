//! Map renderer errors
//!
//! These mirror the checks a MapLibre-style renderer performs: ids are
//! unique per kind, a layer needs its source, and a source cannot be removed
//! while a layer is still bound to it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A source with this id is already registered
    #[error("There is already a source with id '{0}'")]
    DuplicateSource(String),

    /// A layer with this id is already registered
    #[error("Layer with id '{0}' already exists on this map")]
    DuplicateLayer(String),

    /// The layer references a source that does not exist
    #[error("Source '{source_id}' for layer '{layer}' does not exist")]
    MissingSource { layer: String, source_id: String },

    /// Removing a source that was never added
    #[error("Source '{0}' does not exist")]
    UnknownSource(String),

    /// Removing a layer that was never added
    #[error("Layer '{0}' does not exist")]
    UnknownLayer(String),

    /// The source still has layers bound to it
    #[error("Source '{source_id}' cannot be removed while layer '{layer}' is using it")]
    SourceInUse { source_id: String, layer: String },
}

impl MapError {
    /// Errors caused by asking for something that is not on the map
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MapError::UnknownSource(_) | MapError::UnknownLayer(_) | MapError::MissingSource { .. }
        )
    }
}
