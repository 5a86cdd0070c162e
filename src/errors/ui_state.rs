use thiserror::Error;

/// Errors caused by a mismatch between what the user asked for and the
/// registered catalogs. Unlike query failures these are reported loudly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UiStateError {
    /// Toggle requested for a dataset that is not registered
    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    /// Demo requested by a name that is not in the catalog
    #[error("Unknown demo '{0}'")]
    UnknownDemo(String),
}
