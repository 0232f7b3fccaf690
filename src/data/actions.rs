//! Bulk edits applied to a selection of spectral models (the table's
//! context menu) and interactive mask editing.
//!
//! Settings changes re-fit every edited model that already had a result, so
//! the table never shows a fit that does not match the current settings.

use crate::data::session::{Session, SessionError};
use crate::data::spectral_model::{ProfileKind, SpectralModel};
use crate::error::{Error, Result};

pub const FITTING_WINDOW_RANGE: (f64, f64) = (0.1, 1000.0);
pub const DETECTION_SIGMA_RANGE: (f64, f64) = (0.1, 1000.0);
pub const MAX_CONTINUUM_ORDER: u8 = 9;
pub const DEFAULT_DETECTION_SIGMA: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelAction {
    Fit,
    /// Models without a fitted result are skipped.
    MarkAcceptable,
    MarkUnacceptable,
    /// Fitting window in Å.
    SetFittingWindow(f64),
    /// `None` disables the continuum.
    SetContinuumOrder(Option<u8>),
    SetProfile(ProfileKind),
    SetCentralWeighting(bool),
    SetDetectionSigma(f64),
}

impl ModelAction {
    pub fn label(&self) -> String {
        match self {
            ModelAction::Fit => "Fit selected models".to_string(),
            ModelAction::MarkAcceptable => "Mark as acceptable".to_string(),
            ModelAction::MarkUnacceptable => "Mark as unacceptable".to_string(),
            ModelAction::SetFittingWindow(w) => format!("Set fitting window to {w} Å"),
            ModelAction::SetContinuumOrder(None) => "No continuum".to_string(),
            ModelAction::SetContinuumOrder(Some(o)) => format!("Order {o}"),
            ModelAction::SetProfile(k) => k.label().to_string(),
            ModelAction::SetCentralWeighting(true) => "Enable central weighting".to_string(),
            ModelAction::SetCentralWeighting(false) => "Disable central weighting".to_string(),
            ModelAction::SetDetectionSigma(s) => format!("Set detection sigma to {s}"),
        }
    }

    /// Whether models that already had a result are re-fit after the edit.
    fn refits_measured(&self) -> bool {
        !matches!(
            self,
            ModelAction::Fit | ModelAction::MarkAcceptable | ModelAction::MarkUnacceptable
        )
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            ModelAction::SetFittingWindow(w) => in_range("fitting window", w, FITTING_WINDOW_RANGE),
            ModelAction::SetDetectionSigma(s) => {
                in_range("detection sigma", s, DETECTION_SIGMA_RANGE)
            }
            ModelAction::SetContinuumOrder(Some(o)) if o > MAX_CONTINUUM_ORDER => {
                Err(Error::InvalidValue {
                    what: "continuum order",
                    value: o as f64,
                    min: 0.0,
                    max: MAX_CONTINUUM_ORDER as f64,
                })
            }
            _ => Ok(()),
        }
    }

    /// Apply the edit to one model. Returns `false` if the model was skipped.
    fn edit(&self, model: &mut SpectralModel) -> bool {
        match *self {
            ModelAction::Fit => true,
            ModelAction::MarkAcceptable => {
                if model.is_measured() {
                    model.metadata.is_acceptable = true;
                    true
                } else {
                    false
                }
            }
            ModelAction::MarkUnacceptable => {
                model.metadata.is_acceptable = false;
                true
            }
            ModelAction::SetFittingWindow(w) => {
                model.metadata.window = w;
                true
            }
            ModelAction::SetContinuumOrder(o) => {
                model.metadata.continuum_order = o;
                true
            }
            ModelAction::SetProfile(kind) => match model.profile_settings_mut() {
                Some(s) => {
                    s.profile = kind;
                    true
                }
                None => false,
            },
            ModelAction::SetCentralWeighting(on) => match model.profile_settings_mut() {
                Some(s) => {
                    s.central_weighting = on;
                    true
                }
                None => false,
            },
            ModelAction::SetDetectionSigma(sigma) => match model.profile_settings_mut() {
                Some(s) => {
                    s.detection_sigma = Some(sigma);
                    true
                }
                None => false,
            },
        }
    }
}

fn in_range(what: &'static str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::InvalidValue {
            what,
            value,
            min,
            max,
        })
    }
}

/// What happened to each model of the selection.
#[derive(Debug, Default)]
pub struct ActionReport {
    pub changed: Vec<usize>,
    pub refit: Vec<usize>,
    pub skipped: Vec<usize>,
    pub failures: Vec<(usize, SessionError)>,
}

impl ActionReport {
    /// The selected model's spectrum needs redrawing.
    pub fn needs_redraw(&self) -> bool {
        !self.refit.is_empty()
    }
}

/// Apply `action` to the models at `indices` (owning-collection indices).
///
/// Indices are checked up front; an out-of-bounds index leaves every model
/// untouched. Fit failures are collected rather than aborting the batch.
pub fn apply_action<S>(session: &mut S, indices: &[usize], action: &ModelAction) -> Result<ActionReport>
where
    S: Session + ?Sized,
{
    action.validate()?;
    let len = session
        .spectral_models()
        .ok_or(Error::CollectionUnavailable)?
        .len();
    if let Some(&index) = indices.iter().find(|i| **i >= len) {
        return Err(Error::ModelIndex { index, len });
    }

    let mut report = ActionReport::default();
    for &index in indices {
        let refit = {
            let models = session
                .spectral_models_mut()
                .ok_or(Error::CollectionUnavailable)?;
            let model = &mut models[index];
            if !action.edit(model) {
                report.skipped.push(index);
                continue;
            }
            report.changed.push(index);
            *action == ModelAction::Fit || (action.refits_measured() && model.is_measured())
        };
        if refit {
            match session.fit_model(index) {
                Ok(()) => report.refit.push(index),
                Err(e) => {
                    log::warn!("re-fitting model {} failed: {}", index, e);
                    report.failures.push((index, e));
                }
            }
        }
    }
    log::debug!(
        "{}: {} changed, {} re-fit, {} skipped",
        action.label(),
        report.changed.len(),
        report.refit.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Initial value for the detection sigma prompt: the first one set among the
/// selection, else `fallback` (normally [`DEFAULT_DETECTION_SIGMA`]).
pub fn default_detection_sigma(models: &[SpectralModel], indices: &[usize], fallback: f64) -> f64 {
    indices
        .iter()
        .filter_map(|i| models.get(*i))
        .find_map(|m| m.profile_settings().and_then(|s| s.detection_sigma))
        .unwrap_or(fallback)
}

/// Initial value for the fitting window prompt: the first selected model's window.
pub fn default_fitting_window(models: &[SpectralModel], indices: &[usize]) -> Option<f64> {
    indices
        .first()
        .and_then(|i| models.get(*i))
        .map(|m| m.metadata.window)
}

fn model_mut<S: Session + ?Sized>(session: &mut S, index: usize) -> Result<&mut SpectralModel> {
    let models = session
        .spectral_models_mut()
        .ok_or(Error::CollectionUnavailable)?;
    let len = models.len();
    models.get_mut(index).ok_or(Error::ModelIndex { index, len })
}

/// Mask `[start, end]` (either order) on the model at `index` and re-fit.
/// Zero-width regions are ignored and return `false`.
pub fn add_mask_region<S>(session: &mut S, index: usize, start: f64, end: f64) -> Result<bool>
where
    S: Session + ?Sized,
{
    if !(start.is_finite() && end.is_finite()) || start == end {
        return Ok(false);
    }
    let region = if start < end { [start, end] } else { [end, start] };
    model_mut(session, index)?.metadata.mask.push(region);
    session.fit_model(index)?;
    Ok(true)
}

/// Remove the most recently added mask region containing `x`, then re-fit.
/// The model is re-fit even when no region matched. Returns whether a region
/// was removed.
pub fn remove_mask_at<S>(session: &mut S, index: usize, x: f64) -> Result<bool>
where
    S: Session + ?Sized,
{
    let mask = &mut model_mut(session, index)?.metadata.mask;
    let hit = mask.iter().rposition(|[s, e]| *s <= x && x <= *e);
    if let Some(i) = hit {
        mask.remove(i);
    }
    session.fit_model(index)?;
    Ok(hit.is_some())
}
