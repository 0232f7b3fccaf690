//! Table model for spectral models: columns, cell text, sorting, and the
//! acceptability toggle.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::data::filter::FilteredIndex;
use crate::data::session::Session;
use crate::data::spectral_model::SpectralModel;
use crate::data::state::StateCache;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelColumn {
    Acceptable,
    Wavelength,
    Element,
    EquivalentWidth,
    Abundance,
}

impl ModelColumn {
    pub const ALL: [ModelColumn; 5] = [
        ModelColumn::Acceptable,
        ModelColumn::Wavelength,
        ModelColumn::Element,
        ModelColumn::EquivalentWidth,
        ModelColumn::Abundance,
    ];

    pub fn header(self) -> &'static str {
        match self {
            ModelColumn::Acceptable => "",
            ModelColumn::Wavelength => "λ\n(Å)",
            ModelColumn::Element => "Element\n",
            ModelColumn::EquivalentWidth => "E. W.\n(mÅ)",
            ModelColumn::Abundance => "log ε\n(dex)",
        }
    }

    /// Only the acceptability checkbox is editable.
    pub fn is_editable(self) -> bool {
        self == ModelColumn::Acceptable
    }

    /// Display text. The checkbox column has none.
    pub fn cell_text(self, model: &SpectralModel) -> String {
        match self {
            ModelColumn::Acceptable => String::new(),
            ModelColumn::Wavelength => model.repr_wavelength(),
            ModelColumn::Element => model.repr_element(),
            ModelColumn::EquivalentWidth => match model.equivalent_width() {
                Some(ew) if ew.is_finite() => format!("{:.1}", 1000.0 * ew),
                _ => String::new(),
            },
            ModelColumn::Abundance => model
                .abundances()
                .map(|a| {
                    a.iter()
                        .map(|v| format!("{:.2}", v))
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default(),
        }
    }

    fn compare(self, a: &SpectralModel, b: &SpectralModel) -> Ordering {
        match self {
            ModelColumn::Acceptable => a.is_acceptable().cmp(&b.is_acceptable()),
            ModelColumn::Wavelength => a.transition.wavelength().total_cmp(&b.transition.wavelength()),
            ModelColumn::Element => a.transition.element().cmp(b.transition.element()),
            ModelColumn::EquivalentWidth => nan_last(a.equivalent_width(), b.equivalent_width()),
            ModelColumn::Abundance => nan_last(
                a.abundances().and_then(|v| v.first().copied()),
                b.abundances().and_then(|v| v.first().copied()),
            ),
        }
    }
}

fn nan_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|v| v.is_finite());
    let b = b.filter(|v| v.is_finite());
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Stable sort of the owning collection. Descending is the exact reverse
/// ordering, so missing values come first. Callers must reindex afterwards.
pub fn sort_models(models: &mut [SpectralModel], column: ModelColumn, order: SortOrder) {
    match order {
        SortOrder::Ascending => models.sort_by(|a, b| column.compare(a, b)),
        SortOrder::Descending => models.sort_by(|a, b| column.compare(a, b).reverse()),
    }
}

/// Result of ticking or unticking the acceptability checkbox.
#[derive(Debug)]
pub enum ToggleOutcome {
    Applied { index: usize, acceptable: bool },
    /// The flag was left unchanged; carries the reason.
    Rejected(Error),
}

impl ToggleOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ToggleOutcome::Applied { .. })
    }
}

/// Set the acceptability of the model shown at `visible_row`.
///
/// Models without a fitted result are rejected and left untouched. On success
/// the cached measurements for that model (looked up by hash) become NaN and
/// the proxy is reindexed, since the row may now be filtered out.
pub fn toggle_acceptable<S>(
    proxy: &mut FilteredIndex<SpectralModel>,
    visible_row: usize,
    value: bool,
    session: &mut S,
    cache: Option<&mut StateCache>,
) -> Result<ToggleOutcome>
where
    S: Session + ?Sized,
{
    let index = proxy.to_underlying(visible_row)?;
    let models = session
        .spectral_models_mut()
        .ok_or(Error::CollectionUnavailable)?;
    let len = models.len();
    let model = models.get_mut(index).ok_or(Error::ModelIndex { index, len })?;

    if !model.is_measured() {
        log::warn!(
            "refusing to change acceptability of {} {}: it has not been fit",
            model.repr_element(),
            model.repr_wavelength()
        );
        return Ok(ToggleOutcome::Rejected(Error::UnmeasuredRecord { index }));
    }

    model.metadata.is_acceptable = value;
    let hash = model.hash();
    if let Some(cache) = cache {
        cache.mark_stale(hash);
    }
    proxy.reindex(&*session);
    Ok(ToggleOutcome::Applied {
        index,
        acceptable: value,
    })
}
