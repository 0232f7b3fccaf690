use stellarview::{
    run_stellar_view, FitError, FitResult, MemorySession, Session, SpectralModel, StellarParameters,
    StellarViewConfig, Transition, ViewSettings,
};

// Synthetic stellar parameters session.
//
// Builds a line list of Fe I / Fe II / Ti I transitions with a toy "fitter"
// whose abundances drift with excitation potential and line strength unless
// the parameters match the made-up star (Teff 5850 K, logg 4.3, vt 1.1).
//
// Usage:
//   cargo run --example synthetic_session
//   RUST_LOG=debug cargo run --example synthetic_session

const TRUE_TEFF: f64 = 5850.0;
const TRUE_LOGG: f64 = 4.3;
const TRUE_VT: f64 = 1.1;

fn solar_abundance(species: f64) -> f64 {
    match species.floor() as u32 {
        22 => 4.95,
        _ => 7.50,
    }
}

fn toy_fit(model: &SpectralModel, p: &StellarParameters) -> Result<FitResult, FitError> {
    let t = &model.transition;
    if model.metadata.window < 0.5 {
        return Err(FitError::NoData);
    }
    // Equivalent width (Å) from a crude curve of growth
    let ew = 0.001 * (10f64).powf(0.4 * (t.loggf() + 3.0) - 0.3 * t.expot()).clamp(5.0, 150.0);
    let mut abundance = solar_abundance(t.species()) + p.metallicity
        + 0.12 * t.expot() * (p.effective_temperature - TRUE_TEFF) / 100.0
        - 0.35 * (p.microturbulence - TRUE_VT) * (1000.0 * ew / 50.0);
    if t.species().fract() > 0.05 {
        abundance += 0.4 * (p.surface_gravity - TRUE_LOGG);
    }
    // Deterministic scatter
    abundance += 0.04 * ((t.wavelength() * 7.3).sin());
    Ok(FitResult {
        equivalent_width: Some(ew),
        abundances: vec![abundance],
    })
}

fn line_list() -> Vec<SpectralModel> {
    let mut models = Vec::new();
    for i in 0..36 {
        let (species, element) = match i % 6 {
            0..=3 => (26.0, "Fe I"),
            4 => (26.1, "Fe II"),
            _ => (22.0, "Ti I"),
        };
        let wavelength = 4800.0 + 37.5 * i as f64;
        let expot = (i % 9) as f64 * 0.55;
        let loggf = -3.2 + 0.11 * (i % 13) as f64;
        let mut m = SpectralModel::profile(Transition::new(wavelength, species, element, expot, loggf));
        if i % 7 == 3 {
            m = SpectralModel::synthesis(m.transition.clone());
        }
        models.push(m.with_inference(i % 11 != 10));
    }
    models
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let mut session = MemorySession::new(toy_fit).with_models(line_list());
    session.set_stellar_parameters(StellarParameters {
        effective_temperature: 5700.0,
        surface_gravity: 4.5,
        metallicity: 0.0,
        microturbulence: 1.0,
    });

    let settings = ViewSettings::load_or_default();
    let cfg = StellarViewConfig {
        title: "Synthetic session".to_string(),
        ..StellarViewConfig::with_settings(settings)
    };
    run_stellar_view(session, cfg)
}
