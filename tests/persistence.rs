use stellarview::data::inference::StellarParametersData;
use stellarview::data::stellar_parameters::ParameterField;
use stellarview::data::table::{ModelColumn, SortOrder};
use stellarview::persistence::{
    load_state_from_path, save_state_to_path, state_from_json, state_to_json, ViewStateSerde,
};
use stellarview::{
    Error, FitError, FitResult, MemorySession, Session, SpectralModel, StellarParameters,
    Transition, ViewSettings,
};

fn fitter(m: &SpectralModel, _p: &StellarParameters) -> Result<FitResult, FitError> {
    Ok(FitResult {
        equivalent_width: Some(0.02),
        abundances: vec![7.4 + 0.01 * m.transition.expot()],
    })
}

fn lines() -> Vec<SpectralModel> {
    (0..6)
        .map(|i| {
            SpectralModel::profile(Transition::new(6000.0 - 15.0 * i as f64, 26.0, "Fe I", i as f64, -2.0))
                .with_inference(true)
        })
        .collect()
}

#[test]
fn view_state_round_trips_through_a_file() {
    let mut s = MemorySession::new(fitter).with_models(lines());
    let mut tab = StellarParametersData::new(&s);
    tab.measure_abundances(&mut s).unwrap();
    tab.set_selection(vec![1, 4]);
    tab.cycle_sort(ModelColumn::Wavelength, &mut s).unwrap();
    *tab.form.text_mut(ParameterField::EffectiveTemperature) = "5100".to_string();

    let state = ViewStateSerde::capture(&tab, &s);
    assert_eq!(state.stellar_parameters.effective_temperature, 5100.0);
    assert_eq!(state.selected_hashes.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.json");
    save_state_to_path(&state, &path).unwrap();
    let loaded = load_state_from_path(&path).unwrap();
    assert_eq!(loaded, state);

    // Restore into a fresh tab over a session in its initial order.
    let mut s2 = MemorySession::new(fitter).with_models(lines());
    let mut tab2 = StellarParametersData::new(&s2);
    loaded.apply_to(&mut tab2, &mut s2).unwrap();

    assert_eq!(tab2.sort(), Some((ModelColumn::Wavelength, SortOrder::Ascending)));
    assert_eq!(s2.stellar_parameters().effective_temperature, 5100.0);
    assert_eq!(tab2.form.text(ParameterField::EffectiveTemperature), "5100");
    let mut restored = tab2.selected_hashes(s2.spectral_models().unwrap());
    let mut expected = state.selected_hashes.clone();
    restored.sort_unstable();
    expected.sort_unstable();
    assert_eq!(restored, expected);
}

#[test]
fn hidden_models_are_dropped_from_restored_selection() {
    let mut s = MemorySession::new(fitter).with_models(lines());
    let mut tab = StellarParametersData::new(&s);
    let hashes: Vec<u64> = s.spectral_models().unwrap().iter().map(|m| m.hash()).collect();

    // Nothing is fit, so hiding unacceptable models hides everything.
    let state = ViewStateSerde {
        hide_unacceptable: true,
        selected_hashes: vec![hashes[0], hashes[2]],
        sort: None,
        stellar_parameters: StellarParameters::default(),
        saved_at: chrono::Utc::now(),
    };
    state.apply_to(&mut tab, &mut s).unwrap();
    assert!(tab.hide_unacceptable());
    assert_eq!(tab.proxy.visible_count(), 0);
    assert!(tab.selection().is_empty());
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(state_from_json("{ not json"), Err(Error::Json(_))));
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_state_from_path(&dir.path().join("missing.json")),
        Err(Error::Io(_))
    ));
}

#[test]
fn json_keeps_field_names() {
    let state = ViewStateSerde {
        hide_unacceptable: false,
        selected_hashes: vec![42],
        sort: None,
        stellar_parameters: StellarParameters::default(),
        saved_at: chrono::Utc::now(),
    };
    let txt = state_to_json(&state).unwrap();
    assert!(txt.contains("\"selected_hashes\""));
    assert!(txt.contains("\"effective_temperature\""));
}

#[test]
fn settings_round_trip_as_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.yaml");
    let settings = ViewSettings {
        hide_unacceptable: true,
        default_detection_sigma: 1.5,
        table_max_width: 420.0,
        initial_parameters: Some(StellarParameters {
            effective_temperature: 4800.0,
            surface_gravity: 2.5,
            metallicity: -1.2,
            microturbulence: 1.6,
        }),
    };
    settings.save_to_path(&path).unwrap();
    assert_eq!(ViewSettings::load_from_path(&path).unwrap(), settings);
}

#[test]
fn partial_settings_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yaml");
    std::fs::write(&path, "hide_unacceptable: true\n").unwrap();
    let settings = ViewSettings::load_from_path(&path).unwrap();
    assert!(settings.hide_unacceptable);
    assert_eq!(settings.default_detection_sigma, 0.5);
    assert_eq!(settings.table_max_width, 370.0);
    assert!(settings.initial_parameters.is_none());
}
