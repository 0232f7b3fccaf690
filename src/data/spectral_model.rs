//! Spectral model records: one measurable absorption line (or blend) and its fit state.
//!
//! Records are owned by the session. This layer only reads them, flips the
//! acceptability flag, and edits fitting settings before asking the session
//! to re-fit.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::data::session::{FitError, LineFitter};
use crate::data::stellar_parameters::StellarParameters;

/// Atomic transition a model is built around.
///
/// Fields are read-only so the content hash always matches them. The hash is
/// never serialized; it is recomputed when a transition is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransitionSerde", into = "TransitionSerde")]
pub struct Transition {
    wavelength: f64,
    species: f64,
    element: String,
    expot: f64,
    loggf: f64,
    hash: u64,
}

#[derive(Serialize, Deserialize)]
struct TransitionSerde {
    wavelength: f64,
    species: f64,
    element: String,
    expot: f64,
    loggf: f64,
}

impl From<TransitionSerde> for Transition {
    fn from(t: TransitionSerde) -> Self {
        Transition::new(t.wavelength, t.species, t.element, t.expot, t.loggf)
    }
}

impl From<Transition> for TransitionSerde {
    fn from(t: Transition) -> Self {
        Self {
            wavelength: t.wavelength,
            species: t.species,
            element: t.element,
            expot: t.expot,
            loggf: t.loggf,
        }
    }
}

impl Transition {
    pub fn new(wavelength: f64, species: f64, element: impl Into<String>, expot: f64, loggf: f64) -> Self {
        let element = element.into();
        let hash = content_hash(wavelength, species, &element, expot, loggf);
        Self {
            wavelength,
            species,
            element,
            expot,
            loggf,
            hash,
        }
    }

    /// Rest wavelength in Å.
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Species code, e.g. `26.0` for Fe I and `26.1` for Fe II.
    pub fn species(&self) -> f64 {
        self.species
    }

    /// Display label, e.g. `"Fe I"`.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Excitation potential (eV).
    pub fn expot(&self) -> f64 {
        self.expot
    }

    pub fn loggf(&self) -> f64 {
        self.loggf
    }

    /// Content hash used to key derived tables independently of row order.
    /// Stable across builds and platforms, so it can be persisted.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

// First 8 bytes (big-endian) of SHA-256 over the little-endian field bits.
fn content_hash(wavelength: f64, species: f64, element: &str, expot: f64, loggf: f64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(wavelength.to_bits().to_le_bytes());
    hasher.update(species.to_bits().to_le_bytes());
    hasher.update((element.len() as u64).to_le_bytes());
    hasher.update(element.as_bytes());
    hasher.update(expot.to_bits().to_le_bytes());
    hasher.update(loggf.to_bits().to_le_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Line profile used by profile-fitting models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileKind {
    #[default]
    Gaussian,
    Lorentzian,
    Voigt,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 3] = [ProfileKind::Gaussian, ProfileKind::Lorentzian, ProfileKind::Voigt];

    pub fn label(self) -> &'static str {
        match self {
            ProfileKind::Gaussian => "Gaussian",
            ProfileKind::Lorentzian => "Lorentzian",
            ProfileKind::Voigt => "Voigt",
        }
    }
}

/// Settings that only make sense for profile-fitting models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub profile: ProfileKind,
    pub central_weighting: bool,
    pub detection_sigma: Option<f64>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            profile: ProfileKind::Gaussian,
            central_weighting: true,
            detection_sigma: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelKind {
    ProfileFitting(ProfileSettings),
    SpectralSynthesis,
}

/// Result of the last successful fit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FitResult {
    /// Equivalent width in Å.
    pub equivalent_width: Option<f64>,
    /// Abundances (dex), one per fitted element.
    pub abundances: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub is_acceptable: bool,
    pub fitted_result: Option<FitResult>,
    /// Fitting window (Å) either side of the line.
    pub window: f64,
    /// Polynomial continuum order; `None` fits no continuum.
    pub continuum_order: Option<u8>,
    pub use_for_stellar_parameter_inference: bool,
    /// Masked wavelength regions `[start, end]`, in insertion order.
    pub mask: Vec<[f64; 2]>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            is_acceptable: false,
            fitted_result: None,
            window: 5.0,
            continuum_order: Some(1),
            use_for_stellar_parameter_inference: false,
            mask: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralModel {
    pub transition: Transition,
    pub kind: ModelKind,
    pub metadata: ModelMetadata,
}

impl SpectralModel {
    pub fn profile(transition: Transition) -> Self {
        Self {
            transition,
            kind: ModelKind::ProfileFitting(ProfileSettings::default()),
            metadata: ModelMetadata::default(),
        }
    }

    pub fn synthesis(transition: Transition) -> Self {
        Self {
            transition,
            kind: ModelKind::SpectralSynthesis,
            metadata: ModelMetadata::default(),
        }
    }

    pub fn with_inference(mut self, use_for_inference: bool) -> Self {
        self.metadata.use_for_stellar_parameter_inference = use_for_inference;
        self
    }

    pub fn hash(&self) -> u64 {
        self.transition.hash()
    }

    pub fn is_acceptable(&self) -> bool {
        self.metadata.is_acceptable
    }

    pub fn use_for_stellar_parameter_inference(&self) -> bool {
        self.metadata.use_for_stellar_parameter_inference
    }

    pub fn is_measured(&self) -> bool {
        self.metadata.fitted_result.is_some()
    }

    /// Whether profile-specific settings (profile shape, central weighting,
    /// detection sigma) apply to this model.
    pub fn supports_profile_settings(&self) -> bool {
        matches!(self.kind, ModelKind::ProfileFitting(_))
    }

    pub fn profile_settings(&self) -> Option<&ProfileSettings> {
        match &self.kind {
            ModelKind::ProfileFitting(s) => Some(s),
            ModelKind::SpectralSynthesis => None,
        }
    }

    pub fn profile_settings_mut(&mut self) -> Option<&mut ProfileSettings> {
        match &mut self.kind {
            ModelKind::ProfileFitting(s) => Some(s),
            ModelKind::SpectralSynthesis => None,
        }
    }

    pub fn repr_wavelength(&self) -> String {
        format!("{:.1}", self.transition.wavelength())
    }

    pub fn repr_element(&self) -> String {
        self.transition.element().to_string()
    }

    pub fn equivalent_width(&self) -> Option<f64> {
        self.metadata
            .fitted_result
            .as_ref()
            .and_then(|r| r.equivalent_width)
    }

    pub fn abundances(&self) -> Option<&[f64]> {
        self.metadata
            .fitted_result
            .as_ref()
            .map(|r| r.abundances.as_slice())
    }

    /// Run the fitter and store the result. On failure the previous result is kept.
    ///
    /// A model fit for the first time becomes acceptable; re-fits leave the
    /// flag alone.
    pub fn fit(&mut self, fitter: &dyn LineFitter, params: &StellarParameters) -> Result<(), FitError> {
        let result = fitter.fit(self, params)?;
        if self.metadata.fitted_result.is_none() {
            self.metadata.is_acceptable = true;
        }
        self.metadata.fitted_result = Some(result);
        Ok(())
    }
}
