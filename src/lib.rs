//! stellarview crate root: re-exports and module wiring.
//!
//! This crate provides the table and plot layer of a stellar spectroscopy
//! tool, built on egui/eframe, over an externally owned [`Session`]:
//! - `data::filter`: filtering, index-mapping proxy over the model collection
//! - `data::table`: table columns, sorting and the acceptability toggle
//! - `data::inference`: state behind the stellar parameters tab
//! - `panels`: egui panels for the form, the models table and the plots
//! - `config` / `persistence`: YAML settings and JSON view state
//! - `app`: eframe application and [`run_stellar_view`]

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod panels;
pub mod persistence;

// Public re-exports for a compact external API
pub use app::{run_stellar_view, StellarViewApp};
pub use config::{StellarViewConfig, ViewSettings};
pub use data::filter::{FilteredIndex, IndexMapChanged};
pub use data::inference::StellarParametersData;
pub use data::session::{FitError, LineFitter, MemorySession, ModelSource, Session, SessionError};
pub use data::spectral_model::{FitResult, ModelKind, ProfileKind, SpectralModel, Transition};
pub use data::stellar_parameters::StellarParameters;
pub use error::{Error, Result};
