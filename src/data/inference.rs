//! State behind the stellar parameters tab: the filtered model table, the
//! parameter form, the cached transition state, and the current selection.

use std::collections::BTreeMap;

use crate::data::actions::{add_mask_region, apply_action, remove_mask_at, ActionReport, ModelAction};
use crate::data::filter::FilteredIndex;
use crate::data::session::{ModelSource, Session};
use crate::data::spectral_model::SpectralModel;
use crate::data::state::{StateCache, TrendAxis};
use crate::data::stellar_parameters::ParameterForm;
use crate::data::table::{sort_models, toggle_acceptable, ModelColumn, SortOrder, ToggleOutcome};
use crate::data::trends::{equilibrium_state, SpeciesKey, TrendLine};
use crate::error::{Error, Result};

/// Filter restricting the table to models used for stellar parameter inference.
pub const INFERENCE_FILTER: &str = "use_for_stellar_parameter_inference";
/// Filter hiding models not marked acceptable.
pub const ACCEPTABLE_FILTER: &str = "is_acceptable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureSummary {
    /// Models fit because they had no result yet.
    pub fitted: usize,
    pub failures: usize,
    /// Rows in the refreshed transition state.
    pub transitions: usize,
}

#[derive(Debug)]
pub struct StellarParametersData {
    pub proxy: FilteredIndex<SpectralModel>,
    pub form: ParameterForm,
    state: Option<StateCache>,
    /// Selected visible rows, in selection order.
    selection: Vec<usize>,
    hide_unacceptable: bool,
    sort: Option<(ModelColumn, SortOrder)>,
}

impl StellarParametersData {
    pub fn new<S>(source: &S) -> Self
    where
        S: ModelSource<SpectralModel> + ?Sized,
    {
        let mut proxy = FilteredIndex::new();
        proxy.add_predicate(
            INFERENCE_FILTER,
            |m: &SpectralModel| m.use_for_stellar_parameter_inference(),
            source,
        );
        Self {
            proxy,
            form: ParameterForm::default(),
            state: None,
            selection: Vec::new(),
            hide_unacceptable: false,
            sort: None,
        }
    }

    /// Refresh the form and table from the session.
    pub fn populate<S>(&mut self, session: &S)
    where
        S: Session + ?Sized,
    {
        self.form.populate(&session.stellar_parameters());
        self.reset(session);
    }

    /// Reindex, keeping the selection attached to the same models.
    pub fn reset<S>(&mut self, source: &S)
    where
        S: ModelSource<SpectralModel> + ?Sized,
    {
        let order: Vec<usize> = self
            .selection
            .iter()
            .filter_map(|r| self.proxy.to_underlying(*r).ok())
            .collect();
        self.proxy.reindex(source);
        let mut rows = Vec::with_capacity(order.len());
        for idx in order {
            if let Some(row) = self.proxy.to_visible(idx) {
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }
        self.selection = rows;
    }

    pub fn hide_unacceptable(&self) -> bool {
        self.hide_unacceptable
    }

    pub fn set_hide_unacceptable<S>(&mut self, hide: bool, source: &S) -> Result<()>
    where
        S: ModelSource<SpectralModel> + ?Sized,
    {
        if hide == self.hide_unacceptable {
            return Ok(());
        }
        let selected: Vec<usize> = self.proxy.map_selection(&self.selection);
        if hide {
            self.proxy
                .add_predicate(ACCEPTABLE_FILTER, |m: &SpectralModel| m.is_acceptable(), source);
        } else {
            self.proxy.remove_predicate(ACCEPTABLE_FILTER, source)?;
        }
        self.hide_unacceptable = hide;
        self.selection = selected
            .into_iter()
            .filter_map(|i| self.proxy.to_visible(i))
            .collect();
        Ok(())
    }

    pub fn filter_button_label(&self) -> &'static str {
        if self.hide_unacceptable {
            "Show unacceptable models"
        } else {
            "Hide unacceptable models"
        }
    }

    pub fn sort(&self) -> Option<(ModelColumn, SortOrder)> {
        self.sort
    }

    /// Sort the session's models by `column`, keeping the selection on the
    /// same records. Cached state is keyed by hash and needs no update.
    pub fn sort_by<S>(&mut self, column: ModelColumn, order: SortOrder, session: &mut S) -> Result<()>
    where
        S: Session + ?Sized,
    {
        let hashes = self.selected_hashes(session.spectral_models().unwrap_or_default());
        let models = session
            .spectral_models_mut()
            .ok_or(Error::CollectionUnavailable)?;
        sort_models(models, column, order);
        self.sort = Some((column, order));
        self.proxy.reindex(&*session);
        self.select_hashes(&hashes, session.spectral_models().unwrap_or_default());
        Ok(())
    }

    /// Header click: sort by `column`, flipping the order if it is already
    /// the sort column.
    pub fn cycle_sort<S>(&mut self, column: ModelColumn, session: &mut S) -> Result<()>
    where
        S: Session + ?Sized,
    {
        let order = match self.sort {
            Some((c, SortOrder::Ascending)) if c == column => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };
        self.sort_by(column, order, session)
    }

    pub fn state(&self) -> Option<&StateCache> {
        self.state.as_ref()
    }

    /// Fit any inference models that were never fit, push the form's
    /// parameters to the session, and refresh the transition state.
    ///
    /// The refreshed state must line up with the session's inference models by
    /// hash, otherwise nothing is cached and `StateMismatch` is returned.
    pub fn measure_abundances<S>(&mut self, session: &mut S) -> Result<MeasureSummary>
    where
        S: Session + ?Sized,
    {
        let models = session
            .spectral_models()
            .ok_or(Error::CollectionUnavailable)?;
        if !models.iter().any(|m| m.use_for_stellar_parameter_inference()) {
            return Err(Error::NoSpectralModels);
        }
        let pending: Vec<usize> = models
            .iter()
            .enumerate()
            .filter(|(_, m)| m.use_for_stellar_parameter_inference() && !m.is_measured())
            .map(|(i, _)| i)
            .collect();

        let params = self.form.to_parameters()?;
        session.set_stellar_parameters(params);

        let mut failures = 0;
        for &index in &pending {
            if let Err(e) = session.fit_model(index) {
                log::warn!("fitting model {} failed: {}", index, e);
                failures += 1;
            }
        }

        let covered = |m: &SpectralModel| m.use_for_stellar_parameter_inference();
        let rows = session.stellar_parameter_state(&covered)?;
        let models = session
            .spectral_models()
            .ok_or(Error::CollectionUnavailable)?;
        let cache = StateCache::build(rows, models.iter().filter(|m| covered(*m)))?;
        let summary = MeasureSummary {
            fitted: pending.len() - failures,
            failures,
            transitions: cache.len(),
        };
        log::info!(
            "measured abundances: {} transitions, {} newly fit, {} failed",
            summary.transitions,
            summary.fitted,
            summary.failures
        );
        self.state = Some(cache);
        self.reset(&*session);
        Ok(summary)
    }

    /// Tick or untick the checkbox on `visible_row`.
    pub fn toggle_acceptable<S>(&mut self, visible_row: usize, value: bool, session: &mut S) -> Result<ToggleOutcome>
    where
        S: Session + ?Sized,
    {
        let selected = self.proxy.map_selection(&self.selection);
        let outcome = toggle_acceptable(&mut self.proxy, visible_row, value, session, self.state.as_mut())?;
        if outcome.is_applied() {
            self.selection = selected
                .into_iter()
                .filter_map(|i| self.proxy.to_visible(i))
                .collect();
        }
        Ok(outcome)
    }

    /// Apply a context-menu action to the current selection.
    pub fn apply_action<S>(&mut self, action: &ModelAction, session: &mut S) -> Result<ActionReport>
    where
        S: Session + ?Sized,
    {
        let indices = self.selected_indices();
        let report = apply_action(session, &indices, action)?;
        for &i in report.changed.iter() {
            self.mark_index_stale(i, &*session);
        }
        self.reset(&*session);
        Ok(report)
    }

    /// Mask `[start, end]` on the most recently selected model and re-fit it.
    pub fn add_mask<S>(&mut self, start: f64, end: f64, session: &mut S) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        let index = self.focused_index()?;
        let added = add_mask_region(session, index, start, end)?;
        if added {
            self.mark_index_stale(index, &*session);
        }
        Ok(added)
    }

    /// Remove the last mask region containing `x` on the most recently
    /// selected model and re-fit it.
    pub fn remove_mask_at<S>(&mut self, x: f64, session: &mut S) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        let index = self.focused_index()?;
        let removed = remove_mask_at(session, index, x)?;
        self.mark_index_stale(index, &*session);
        Ok(removed)
    }

    fn focused_index(&self) -> Result<usize> {
        let row = *self.selection.last().ok_or(Error::OutOfRange {
            row: 0,
            len: self.selection.len(),
        })?;
        self.proxy.to_underlying(row)
    }

    fn mark_index_stale<S>(&mut self, index: usize, source: &S)
    where
        S: ModelSource<SpectralModel> + ?Sized,
    {
        if let (Some(state), Some(m)) = (self.state.as_mut(), source.records().and_then(|m| m.get(index))) {
            state.mark_stale(m.hash());
        }
    }

    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    pub fn set_selection(&mut self, rows: Vec<usize>) {
        let n = self.proxy.visible_count();
        self.selection = rows.into_iter().filter(|r| *r < n).collect();
    }

    /// Select `row`; with `additive` it is toggled in the current selection.
    pub fn select_row(&mut self, row: usize, additive: bool) {
        if row >= self.proxy.visible_count() {
            return;
        }
        if !additive {
            self.selection = vec![row];
        } else if let Some(pos) = self.selection.iter().position(|r| *r == row) {
            self.selection.remove(pos);
        } else {
            self.selection.push(row);
        }
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.selection.contains(&row)
    }

    /// Owning-collection indices of the selection, sorted and unique.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.proxy.map_selection(&self.selection)
    }

    /// Content hashes of the selected models, in selection order.
    pub fn selected_hashes(&self, models: &[SpectralModel]) -> Vec<u64> {
        self.selection
            .iter()
            .filter_map(|r| self.proxy.to_underlying(*r).ok())
            .filter_map(|i| models.get(i))
            .map(|m| m.hash())
            .collect()
    }

    /// Select the visible rows holding the models with these hashes. Hashes
    /// that are unknown or filtered out are dropped.
    pub fn select_hashes(&mut self, hashes: &[u64], models: &[SpectralModel]) {
        let mut rows = Vec::with_capacity(hashes.len());
        for h in hashes {
            let row = models
                .iter()
                .position(|m| m.hash() == *h)
                .and_then(|i| self.proxy.to_visible(i));
            if let Some(row) = row {
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }
        self.selection = rows;
    }

    /// The most recently selected model.
    pub fn selected_model<'a>(&self, models: &'a [SpectralModel]) -> Option<(usize, &'a SpectralModel)> {
        let row = *self.selection.last()?;
        let index = self.proxy.to_underlying(row).ok()?;
        models.get(index).map(|m| (index, m))
    }

    /// Select the visible row closest to a click at `(x, y)` on an equilibrium
    /// plot. Returns the selected row, or `None` when nothing is pickable or
    /// the nearest model is currently filtered out.
    pub fn pick_point(
        &mut self,
        axis: TrendAxis,
        (x, y): (f64, f64),
        (x_scale, y_scale): (f64, f64),
        models: &[SpectralModel],
    ) -> Option<usize> {
        let hash = self.state.as_ref()?.nearest(axis, x, y, x_scale, y_scale)?;
        let index = models.iter().position(|m| m.hash() == hash)?;
        let row = self.proxy.to_visible(index)?;
        self.selection = vec![row];
        Some(row)
    }

    /// `(species, [x, abundance])` for every finite row of the state.
    pub fn scatter(&self, axis: TrendAxis) -> Vec<(f64, [f64; 2])> {
        self.state.as_ref().map(|s| s.points(axis)).unwrap_or_default()
    }

    /// Points of the selected models, for highlighting.
    pub fn selected_points(&self, axis: TrendAxis, models: &[SpectralModel]) -> Vec<[f64; 2]> {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        self.selected_indices()
            .into_iter()
            .filter_map(|i| models.get(i))
            .filter_map(|m| state.for_model(m))
            .map(|r| [r.x(axis), r.abundance])
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .collect()
    }

    /// Element label for each species in the cached state.
    pub fn species_labels(&self) -> BTreeMap<SpeciesKey, String> {
        self.state
            .as_ref()
            .map(|s| {
                s.rows()
                    .iter()
                    .map(|r| (SpeciesKey::new(r.species), r.element.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn trend_lines(&self, axis: TrendAxis) -> BTreeMap<SpeciesKey, TrendLine> {
        self.state
            .as_ref()
            .map(|s| equilibrium_state(s.rows(), axis))
            .unwrap_or_default()
    }
}
