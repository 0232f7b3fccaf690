//! The collaborator seam: accessors to the owning model collection and the
//! session that owns spectra, models, and the fitting machinery.
//!
//! Nothing in this crate reaches for an ambient "current session"; every
//! operation that needs the collection takes a [`ModelSource`] (or a
//! [`Session`]) explicitly.

use crate::data::spectral_model::{FitResult, SpectralModel};
use crate::data::state::TransitionState;
use crate::data::stellar_parameters::StellarParameters;

/// Read access to an ordered, externally owned collection.
///
/// `None` means the collection is currently unreachable (e.g. no session is
/// loaded). Views treat that as an empty collection.
pub trait ModelSource<T> {
    fn records(&self) -> Option<&[T]>;
}

impl<T> ModelSource<T> for [T] {
    fn records(&self) -> Option<&[T]> {
        Some(self)
    }
}

impl<T> ModelSource<T> for Vec<T> {
    fn records(&self) -> Option<&[T]> {
        Some(self.as_slice())
    }
}

impl<T, S: ModelSource<T>> ModelSource<T> for Option<S> {
    fn records(&self) -> Option<&[T]> {
        self.as_ref().and_then(|s| s.records())
    }
}

impl<T, S: ModelSource<T> + ?Sized> ModelSource<T> for &S {
    fn records(&self) -> Option<&[T]> {
        (**self).records()
    }
}

/// A source that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl<T> ModelSource<T> for Unavailable {
    fn records(&self) -> Option<&[T]> {
        None
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("fitting window contains no spectrum data")]
    NoData,
    #[error("fit failed: {0}")]
    Failed(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("no session is loaded")]
    NoSession,
    #[error("spectral model index {index} is out of bounds ({len} models)")]
    ModelIndex { index: usize, len: usize },
    #[error("no measured transitions to calculate abundances for")]
    NoMeasuredTransitions,
    #[error("fitting spectral model {index} failed")]
    Fit {
        index: usize,
        #[source]
        source: FitError,
    },
}

/// Fits a single spectral model. Implemented by the external fitting library.
pub trait LineFitter {
    fn fit(&self, model: &SpectralModel, params: &StellarParameters) -> Result<FitResult, FitError>;
}

impl<F> LineFitter for F
where
    F: Fn(&SpectralModel, &StellarParameters) -> Result<FitResult, FitError>,
{
    fn fit(&self, model: &SpectralModel, params: &StellarParameters) -> Result<FitResult, FitError> {
        self(model, params)
    }
}

/// External session owning the authoritative spectral model list.
pub trait Session: ModelSource<SpectralModel> {
    fn spectral_models(&self) -> Option<&[SpectralModel]> {
        self.records()
    }

    fn spectral_models_mut(&mut self) -> Option<&mut Vec<SpectralModel>>;

    /// Synchronously fit the model at `index`, overwriting its fitted result.
    fn fit_model(&mut self, index: usize) -> Result<(), SessionError>;

    fn stellar_parameters(&self) -> StellarParameters;

    fn set_stellar_parameters(&mut self, params: StellarParameters);

    /// Per-transition state for the models passing `filter`, keyed by hash.
    fn stellar_parameter_state(
        &self,
        filter: &dyn Fn(&SpectralModel) -> bool,
    ) -> Result<Vec<TransitionState>, SessionError>;
}

/// In-memory session with a pluggable fitter.
pub struct MemorySession<F> {
    models: Option<Vec<SpectralModel>>,
    params: StellarParameters,
    fitter: F,
}

impl<F: LineFitter> MemorySession<F> {
    /// A loaded session with an empty model list.
    pub fn new(fitter: F) -> Self {
        Self {
            models: Some(Vec::new()),
            params: StellarParameters::default(),
            fitter,
        }
    }

    /// A session with nothing loaded yet.
    pub fn unloaded(fitter: F) -> Self {
        Self {
            models: None,
            params: StellarParameters::default(),
            fitter,
        }
    }

    pub fn with_models(mut self, models: Vec<SpectralModel>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn load(&mut self, models: Vec<SpectralModel>) {
        self.models = Some(models);
    }

    pub fn unload(&mut self) -> Option<Vec<SpectralModel>> {
        self.models.take()
    }

    pub fn is_loaded(&self) -> bool {
        self.models.is_some()
    }
}

impl<F> ModelSource<SpectralModel> for MemorySession<F> {
    fn records(&self) -> Option<&[SpectralModel]> {
        self.models.as_deref()
    }
}

impl<F: LineFitter> Session for MemorySession<F> {
    fn spectral_models_mut(&mut self) -> Option<&mut Vec<SpectralModel>> {
        self.models.as_mut()
    }

    fn fit_model(&mut self, index: usize) -> Result<(), SessionError> {
        let models = self.models.as_mut().ok_or(SessionError::NoSession)?;
        let len = models.len();
        let model = models
            .get_mut(index)
            .ok_or(SessionError::ModelIndex { index, len })?;
        model
            .fit(&self.fitter, &self.params)
            .map_err(|source| SessionError::Fit { index, source })
    }

    fn stellar_parameters(&self) -> StellarParameters {
        self.params
    }

    fn set_stellar_parameters(&mut self, params: StellarParameters) {
        self.params = params;
    }

    fn stellar_parameter_state(
        &self,
        filter: &dyn Fn(&SpectralModel) -> bool,
    ) -> Result<Vec<TransitionState>, SessionError> {
        let models = self.models.as_ref().ok_or(SessionError::NoSession)?;
        let rows: Vec<TransitionState> = models
            .iter()
            .filter(|m| filter(m))
            .map(TransitionState::from_model)
            .collect();
        if !rows.iter().any(|r| r.abundance.is_finite()) {
            return Err(SessionError::NoMeasuredTransitions);
        }
        Ok(rows)
    }
}
