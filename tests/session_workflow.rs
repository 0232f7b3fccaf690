use stellarview::data::actions::ModelAction;
use stellarview::data::inference::{StellarParametersData, ACCEPTABLE_FILTER};
use stellarview::data::session::{LineFitter, ModelSource};
use stellarview::data::state::{TransitionState, TrendAxis};
use stellarview::data::stellar_parameters::ParameterField;
use stellarview::data::table::{ModelColumn, SortOrder, ToggleOutcome};
use stellarview::{
    Error, FitError, FitResult, MemorySession, ProfileKind, Session, SessionError, SpectralModel,
    StellarParameters, Transition,
};

fn toy_fitter(m: &SpectralModel, p: &StellarParameters) -> Result<FitResult, FitError> {
    if m.metadata.window < 1.0 {
        return Err(FitError::NoData);
    }
    Ok(FitResult {
        equivalent_width: Some(0.001 * (20.0 + 10.0 * m.transition.expot())),
        abundances: vec![7.5 + 0.05 * m.transition.expot() + p.metallicity],
    })
}

fn line(wl: f64, expot: f64) -> SpectralModel {
    SpectralModel::profile(Transition::new(wl, 26.0, "Fe I", expot, -1.5)).with_inference(true)
}

fn session(models: Vec<SpectralModel>) -> MemorySession<impl LineFitter> {
    MemorySession::new(toy_fitter).with_models(models)
}

fn five_lines() -> Vec<SpectralModel> {
    (0..5).map(|i| line(5000.0 + 10.0 * i as f64, 0.5 * i as f64)).collect()
}

#[test]
fn toggling_an_unmeasured_model_is_rejected() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    let outcome = tab.toggle_acceptable(0, true, &mut s).unwrap();
    match outcome {
        ToggleOutcome::Rejected(Error::UnmeasuredRecord { index }) => assert_eq!(index, 0),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!s.spectral_models().unwrap()[0].is_acceptable());
}

#[test]
fn unticking_an_unmeasured_model_is_rejected_too() {
    let mut models = five_lines();
    models[2].metadata.is_acceptable = true;
    let mut s = session(models);
    let mut tab = StellarParametersData::new(&s);
    let outcome = tab.toggle_acceptable(2, false, &mut s).unwrap();
    assert!(matches!(
        outcome,
        ToggleOutcome::Rejected(Error::UnmeasuredRecord { index: 2 })
    ));
    assert!(s.spectral_models().unwrap()[2].is_acceptable());
}

#[test]
fn toggling_out_of_range_row_is_an_error() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    assert!(matches!(
        tab.toggle_acceptable(5, true, &mut s),
        Err(Error::OutOfRange { row: 5, len: 5 })
    ));
}

#[test]
fn toggle_marks_cached_state_stale_and_hides_row() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    tab.measure_abundances(&mut s).unwrap();
    tab.set_hide_unacceptable(true, &s).unwrap();
    assert!(tab.proxy.has_predicate(ACCEPTABLE_FILTER));
    assert_eq!(tab.proxy.visible_count(), 5);

    let hash = s.spectral_models().unwrap()[1].hash();
    assert!(tab.state().unwrap().get(hash).unwrap().abundance.is_finite());

    let outcome = tab.toggle_acceptable(1, false, &mut s).unwrap();
    assert!(outcome.is_applied());
    let row = tab.state().unwrap().get(hash).unwrap();
    assert!(row.abundance.is_nan());
    assert!(row.equivalent_width.is_nan());
    assert!(row.reduced_equivalent_width.is_nan());

    assert_eq!(tab.proxy.visible_count(), 4);
    assert_eq!(tab.proxy.to_visible(1), None);
    assert!(tab.proxy.is_consistent(&s));
}

#[test]
fn toggle_keeps_selection_on_same_models() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    tab.measure_abundances(&mut s).unwrap();
    tab.set_hide_unacceptable(true, &s).unwrap();
    tab.set_selection(vec![3]);
    tab.toggle_acceptable(1, false, &mut s).unwrap();
    assert_eq!(tab.selected_indices(), vec![3]);
    assert_eq!(tab.selection(), &[2]);
}

#[test]
fn measure_fits_pending_models_and_pushes_parameters() {
    let mut models = five_lines();
    models[4].metadata.window = 0.5;
    let mut s = session(models);
    let mut tab = StellarParametersData::new(&s);
    *tab.form.text_mut(ParameterField::Metallicity) = "-0.50".to_string();

    let summary = tab.measure_abundances(&mut s).unwrap();
    assert_eq!(summary.fitted, 4);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.transitions, 5);
    assert_eq!(s.stellar_parameters().metallicity, -0.5);

    let ab = s.spectral_models().unwrap()[0].abundances().unwrap()[0];
    assert!((ab - 7.0).abs() < 1e-12);
    let unfit = s.spectral_models().unwrap()[4].hash();
    assert!(tab.state().unwrap().get(unfit).unwrap().abundance.is_nan());
}

#[test]
fn measure_ignores_non_inference_duplicate_of_a_transition() {
    let mut models = five_lines();
    let shared = models[0].transition.clone();
    models.push(SpectralModel::synthesis(shared));
    let mut s = session(models);
    let mut tab = StellarParametersData::new(&s);

    let summary = tab.measure_abundances(&mut s).unwrap();
    assert_eq!(summary.transitions, 5);
    let models = s.spectral_models().unwrap();
    assert!(tab.state().unwrap().for_model(&models[0]).is_some());
    assert_eq!(tab.proxy.visible_count(), 5);
}

#[test]
fn measure_requires_inference_models_and_a_session() {
    let mut s = session(vec![line(5000.0, 1.0).with_inference(false)]);
    let mut tab = StellarParametersData::new(&s);
    assert!(matches!(tab.measure_abundances(&mut s), Err(Error::NoSpectralModels)));

    let mut unloaded = MemorySession::unloaded(toy_fitter);
    let mut tab = StellarParametersData::new(&unloaded);
    assert_eq!(tab.proxy.visible_count(), 0);
    assert!(matches!(
        tab.measure_abundances(&mut unloaded),
        Err(Error::CollectionUnavailable)
    ));
}

#[test]
fn measure_rejects_invalid_form() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    *tab.form.text_mut(ParameterField::EffectiveTemperature) = "5777.5".to_string();
    match tab.measure_abundances(&mut s) {
        Err(Error::InvalidParameter { text, .. }) => assert_eq!(text, "5777.5"),
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
    assert!(!s.spectral_models().unwrap()[0].is_measured());
}

#[test]
fn measure_with_no_successful_fit_reports_session_error() {
    let models: Vec<SpectralModel> = five_lines()
        .into_iter()
        .map(|mut m| {
            m.metadata.window = 0.2;
            m
        })
        .collect();
    let mut s = session(models);
    let mut tab = StellarParametersData::new(&s);
    assert!(matches!(
        tab.measure_abundances(&mut s),
        Err(Error::Session(SessionError::NoMeasuredTransitions))
    ));
    assert!(tab.state().is_none());
}

/// Session whose state query reports a transition it does not own.
struct SkewedSession<F>(MemorySession<F>);

impl<F> ModelSource<SpectralModel> for SkewedSession<F> {
    fn records(&self) -> Option<&[SpectralModel]> {
        self.0.records()
    }
}

impl<F: LineFitter> Session for SkewedSession<F> {
    fn spectral_models_mut(&mut self) -> Option<&mut Vec<SpectralModel>> {
        self.0.spectral_models_mut()
    }
    fn fit_model(&mut self, index: usize) -> Result<(), SessionError> {
        self.0.fit_model(index)
    }
    fn stellar_parameters(&self) -> StellarParameters {
        self.0.stellar_parameters()
    }
    fn set_stellar_parameters(&mut self, params: StellarParameters) {
        self.0.set_stellar_parameters(params)
    }
    fn stellar_parameter_state(
        &self,
        filter: &dyn Fn(&SpectralModel) -> bool,
    ) -> Result<Vec<TransitionState>, SessionError> {
        let mut rows = self.0.stellar_parameter_state(filter)?;
        rows[0].hash ^= 1;
        Ok(rows)
    }
}

#[test]
fn misaligned_state_fails_fast() {
    let mut s = SkewedSession(session(five_lines()));
    let mut tab = StellarParametersData::new(&s);
    match tab.measure_abundances(&mut s) {
        Err(Error::StateMismatch { hash }) => {
            assert_eq!(hash, s.spectral_models().unwrap()[0].hash() ^ 1)
        }
        other => panic!("expected StateMismatch, got {other:?}"),
    }
    assert!(tab.state().is_none());
}

#[test]
fn settings_change_refits_only_measured_models() {
    let mut models = five_lines();
    models.push(SpectralModel::synthesis(Transition::new(6707.8, 3.0, "Li I", 0.0, 0.17)).with_inference(true));
    let mut s = session(models);
    s.fit_model(0).unwrap();
    s.fit_model(5).unwrap();

    let mut tab = StellarParametersData::new(&s);
    tab.set_selection(vec![0, 1, 5]);

    let report = tab.apply_action(&ModelAction::SetFittingWindow(2.5), &mut s).unwrap();
    assert_eq!(report.changed, vec![0, 1, 5]);
    assert_eq!(report.refit, vec![0, 5]);
    assert!(report.needs_redraw());
    assert!(!s.spectral_models().unwrap()[1].is_measured());
    assert_eq!(s.spectral_models().unwrap()[1].metadata.window, 2.5);

    let report = tab.apply_action(&ModelAction::SetProfile(ProfileKind::Voigt), &mut s).unwrap();
    assert_eq!(report.skipped, vec![5]);
    assert_eq!(report.changed, vec![0, 1]);

    let report = tab.apply_action(&ModelAction::MarkAcceptable, &mut s).unwrap();
    assert_eq!(report.skipped, vec![1]);
    assert!(!s.spectral_models().unwrap()[1].is_acceptable());
}

#[test]
fn refit_failures_are_collected() {
    let mut s = session(five_lines());
    s.fit_model(0).unwrap();
    s.fit_model(1).unwrap();
    let mut tab = StellarParametersData::new(&s);
    tab.set_selection(vec![0, 1]);
    // Valid window, but too narrow for the toy fitter.
    let report = tab.apply_action(&ModelAction::SetFittingWindow(0.5), &mut s).unwrap();
    assert_eq!(report.failures.len(), 2);
    assert!(report.refit.is_empty());
    // Failed re-fits keep the previous result.
    assert!(s.spectral_models().unwrap()[0].is_measured());
}

#[test]
fn invalid_action_values_change_nothing() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    tab.set_selection(vec![0]);
    assert!(matches!(
        tab.apply_action(&ModelAction::SetDetectionSigma(0.0), &mut s),
        Err(Error::InvalidValue { .. })
    ));
    assert_eq!(
        s.spectral_models().unwrap()[0].profile_settings().unwrap().detection_sigma,
        None
    );
}

#[test]
fn out_of_bounds_action_index_leaves_models_untouched() {
    let mut s = session(five_lines());
    let err = stellarview::data::actions::apply_action(
        &mut s,
        &[0, 9],
        &ModelAction::SetContinuumOrder(None),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ModelIndex { index: 9, len: 5 }));
    assert_eq!(s.spectral_models().unwrap()[0].metadata.continuum_order, Some(1));
}

#[test]
fn mask_regions_are_added_and_removed_with_refit() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    tab.select_row(2, false);

    assert!(tab.add_mask(5021.0, 5019.5, &mut s).unwrap());
    assert!(!tab.add_mask(5020.0, 5020.0, &mut s).unwrap());
    assert!(tab.add_mask(5019.0, 5022.0, &mut s).unwrap());
    let m = &s.spectral_models().unwrap()[2];
    assert_eq!(m.metadata.mask, vec![[5019.5, 5021.0], [5019.0, 5022.0]]);
    assert!(m.is_measured());

    // The most recently added region containing x goes first.
    assert!(tab.remove_mask_at(5020.0, &mut s).unwrap());
    assert_eq!(s.spectral_models().unwrap()[2].metadata.mask, vec![[5019.5, 5021.0]]);
    assert!(!tab.remove_mask_at(4000.0, &mut s).unwrap());
}

#[test]
fn sorting_keeps_selection_attached_to_models() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    tab.measure_abundances(&mut s).unwrap();
    tab.set_selection(vec![1, 3]);
    let before = tab.selected_hashes(s.spectral_models().unwrap());

    tab.cycle_sort(ModelColumn::Wavelength, &mut s).unwrap();
    assert_eq!(tab.sort(), Some((ModelColumn::Wavelength, SortOrder::Ascending)));
    tab.cycle_sort(ModelColumn::Wavelength, &mut s).unwrap();
    assert_eq!(tab.sort(), Some((ModelColumn::Wavelength, SortOrder::Descending)));

    let models = s.spectral_models().unwrap();
    assert_eq!(models[0].transition.wavelength(), 5040.0);
    assert_eq!(tab.selected_indices(), vec![1, 3]);
    let mut after = tab.selected_hashes(models);
    let mut expected = before.clone();
    after.sort_unstable();
    expected.sort_unstable();
    assert_eq!(after, expected);

    // Cached rows are keyed by hash, so they still line up after the sort.
    for m in models {
        assert_eq!(tab.state().unwrap().for_model(m).unwrap().hash, m.hash());
    }
}

#[test]
fn clicking_near_a_point_selects_its_row() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    tab.measure_abundances(&mut s).unwrap();

    // Model 3 sits at expot 1.5, abundance 7.575.
    let models = s.spectral_models().unwrap();
    let row = tab.pick_point(TrendAxis::Excitation, (1.45, 7.58), (2.0, 0.2), models);
    assert_eq!(row, Some(3));
    assert_eq!(tab.selected_indices(), vec![3]);
    let sel = tab.selected_points(TrendAxis::Excitation, models);
    assert_eq!(sel.len(), 1);
    assert!((sel[0][0] - 1.5).abs() < 1e-12 && (sel[0][1] - 7.575).abs() < 1e-12);

    // Out-of-band change: model 0 becomes unacceptable while its cached
    // row is still finite. Once hidden it cannot be picked.
    s.spectral_models_mut().unwrap()[0].metadata.is_acceptable = false;
    tab.set_hide_unacceptable(true, &s).unwrap();
    let models = s.spectral_models().unwrap();
    assert_eq!(tab.scatter(TrendAxis::Excitation).len(), 5);
    assert_eq!(tab.pick_point(TrendAxis::Excitation, (0.0, 7.5), (2.0, 0.2), models), None);
    assert_eq!(tab.selected_indices(), vec![3]);

    let trends = tab.trend_lines(TrendAxis::Excitation);
    assert_eq!(trends.len(), 1);
    let fe = trends.values().next().unwrap();
    assert!((fe.slope.unwrap() - 0.05).abs() < 1e-9);
    assert_eq!(fe.n, 5);
}

#[test]
fn trend_readouts_use_element_labels() {
    let mut s = session(five_lines());
    let mut tab = StellarParametersData::new(&s);
    assert!(tab.species_labels().is_empty());
    tab.measure_abundances(&mut s).unwrap();

    let labels = tab.species_labels();
    let (key, element) = labels.iter().next().unwrap();
    assert_eq!(element, "Fe I");

    let trends = tab.trend_lines(TrendAxis::Excitation);
    let fe = &trends[key];
    assert_eq!(
        fe.abundance_label(element).unwrap(),
        "log ε(Fe I) = 7.55 ± 0.04 (N = 5)"
    );
    assert_eq!(fe.slope_label(TrendAxis::Excitation).unwrap(), "+0.050 dex/eV");
}
