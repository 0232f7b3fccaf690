//! Cached per-transition measurements used by the equilibrium plots.
//!
//! Rows are keyed by the transition's content hash, never by position, so
//! sorting or filtering the owning collection cannot desynchronize them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::spectral_model::SpectralModel;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    pub hash: u64,
    pub species: f64,
    pub element: String,
    pub expot: f64,
    /// Equivalent width (Å).
    pub equivalent_width: f64,
    /// `log10(EW / λ)`.
    pub reduced_equivalent_width: f64,
    pub abundance: f64,
}

impl TransitionState {
    /// Build a row from a model's last fit. Unmeasured or unacceptable models
    /// produce NaN measurements.
    pub fn from_model(model: &SpectralModel) -> Self {
        let t = &model.transition;
        let (ew, abundance) = if model.is_acceptable() {
            (
                model.equivalent_width().unwrap_or(f64::NAN),
                model
                    .abundances()
                    .and_then(|a| a.first().copied())
                    .unwrap_or(f64::NAN),
            )
        } else {
            (f64::NAN, f64::NAN)
        };
        Self {
            hash: model.hash(),
            species: t.species(),
            element: t.element().to_string(),
            expot: t.expot(),
            equivalent_width: ew,
            reduced_equivalent_width: (ew / t.wavelength()).log10(),
            abundance,
        }
    }

    /// Invalidate the measured columns.
    pub fn mark_stale(&mut self) {
        self.equivalent_width = f64::NAN;
        self.reduced_equivalent_width = f64::NAN;
        self.abundance = f64::NAN;
    }

    pub fn x(&self, axis: TrendAxis) -> f64 {
        match axis {
            TrendAxis::Excitation => self.expot,
            TrendAxis::LineStrength => self.reduced_equivalent_width,
        }
    }
}

/// Independent variable of an equilibrium plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendAxis {
    Excitation,
    LineStrength,
}

impl TrendAxis {
    pub fn label(self) -> &'static str {
        match self {
            TrendAxis::Excitation => "Excitation potential (eV)",
            TrendAxis::LineStrength => "Reduced equivalent width",
        }
    }
}

/// Transition state rows plus a hash lookup.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    rows: Vec<TransitionState>,
    by_hash: HashMap<u64, usize>,
}

impl StateCache {
    /// Validate `rows` against the models the state query covered and build
    /// the cache.
    ///
    /// Every row must correspond to exactly one covered model and no hash may
    /// repeat. Models outside `covered` may share a transition freely.
    pub fn build<'a, I>(rows: Vec<TransitionState>, covered: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a SpectralModel>,
    {
        let mut model_hashes: HashMap<u64, usize> = HashMap::new();
        for m in covered {
            *model_hashes.entry(m.hash()).or_default() += 1;
        }
        let mut by_hash = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if model_hashes.get(&row.hash) != Some(&1) {
                return Err(Error::StateMismatch { hash: row.hash });
            }
            if by_hash.insert(row.hash, i).is_some() {
                return Err(Error::StateMismatch { hash: row.hash });
            }
        }
        Ok(Self { rows, by_hash })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TransitionState] {
        &self.rows
    }

    pub fn get(&self, hash: u64) -> Option<&TransitionState> {
        self.by_hash.get(&hash).map(|i| &self.rows[*i])
    }

    pub fn for_model(&self, model: &SpectralModel) -> Option<&TransitionState> {
        self.get(model.hash())
    }

    /// Mark the measurements for `hash` as unknown. Returns whether a row was found.
    pub fn mark_stale(&mut self, hash: u64) -> bool {
        match self.by_hash.get(&hash) {
            Some(i) => {
                self.rows[*i].mark_stale();
                true
            }
            None => false,
        }
    }

    /// Finite `(species, [x, abundance])` points for `axis`.
    pub fn points(&self, axis: TrendAxis) -> Vec<(f64, [f64; 2])> {
        self.rows
            .iter()
            .map(|r| (r.species, [r.x(axis), r.abundance]))
            .filter(|(_, p)| p[0].is_finite() && p[1].is_finite())
            .collect()
    }

    /// Hash of the row closest to `(x, y)` after scaling each axis by the
    /// visible plot span. NaN rows are skipped.
    pub fn nearest(&self, axis: TrendAxis, x: f64, y: f64, x_scale: f64, y_scale: f64) -> Option<u64> {
        let xs = if x_scale > 0.0 { x_scale } else { 1.0 };
        let ys = if y_scale > 0.0 { y_scale } else { 1.0 };
        self.rows
            .iter()
            .filter_map(|r| {
                let d = (((r.abundance - y) / ys).powi(2) + ((r.x(axis) - x) / xs).powi(2)).sqrt();
                d.is_finite().then_some((r.hash, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| h)
    }
}
