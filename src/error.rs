//! Error types shared across the data layer and the persistence helpers.

use crate::data::session::SessionError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no filter named '{0}'")]
    PredicateNotFound(String),
    #[error("visible row {row} is out of range ({len} visible rows)")]
    OutOfRange { row: usize, len: usize },
    #[error("spectral model {index} has no fitted result")]
    UnmeasuredRecord { index: usize },
    #[error("no spectral model collection is available")]
    CollectionUnavailable,
    #[error("spectral model index {index} is out of bounds ({len} models)")]
    ModelIndex { index: usize, len: usize },
    #[error("transition state is out of sync with the spectral models (hash {hash:#018x})")]
    StateMismatch { hash: u64 },
    #[error("invalid {field}: '{text}'")]
    InvalidParameter { field: &'static str, text: String },
    #[error("{what} must be within {min}..={max}, got {value}")]
    InvalidValue {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("no spectral models are associated with the determination of stellar parameters")]
    NoSpectralModels,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
