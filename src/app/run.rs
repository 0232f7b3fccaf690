//! Top-level entry point for running the view as a native window.

use eframe::egui;

use super::StellarViewApp;
use crate::config::StellarViewConfig;
use crate::data::session::Session;

/// Launch the stellar parameters view over `session` in a native window.
///
/// The call blocks until the window is closed.
pub fn run_stellar_view<S>(session: S, mut cfg: StellarViewConfig) -> eframe::Result<()>
where
    S: Session + 'static,
{
    let app = StellarViewApp::new(session, cfg.settings.clone());

    let title = cfg.title.clone();
    let mut opts = cfg.native_options.take().unwrap_or_default();

    // Set a bigger default window size if one is not provided by config.
    if opts.viewport.inner_size.is_none() {
        opts.viewport = opts
            .viewport
            .clone()
            .with_inner_size(egui::vec2(1200.0, 800.0));
    }

    log::info!("starting {}", title);
    eframe::run_native(&title, opts, Box::new(|_cc| Ok(Box::new(app))))
}
