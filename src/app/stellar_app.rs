//! Standalone application wrapper.
//!
//! [`StellarViewApp`] owns the session and the tab state and lays out the
//! panels: parameters and the models table on the left, the equilibrium
//! plots in the centre, and a status bar at the bottom.

use eframe::egui;

use crate::config::ViewSettings;
use crate::data::inference::StellarParametersData;
use crate::data::session::Session;
use crate::panels::{
    EquilibriumPlotPanel, ModelsTablePanel, Panel, StellarParametersPanel, ViewContext,
};

pub struct StellarViewApp<S> {
    session: S,
    tab: StellarParametersData,
    settings: ViewSettings,
    status: Option<String>,

    parameters_panel: StellarParametersPanel,
    table_panel: ModelsTablePanel,
    plot_panel: EquilibriumPlotPanel,
}

impl<S: Session> StellarViewApp<S> {
    pub fn new(mut session: S, settings: ViewSettings) -> Self {
        if let Some(p) = settings.initial_parameters {
            session.set_stellar_parameters(p);
        }
        let mut tab = StellarParametersData::new(&session);
        tab.populate(&session);
        if let Err(e) = tab.set_hide_unacceptable(settings.hide_unacceptable, &session) {
            log::warn!("could not apply hide_unacceptable setting: {}", e);
        }
        Self {
            session,
            tab,
            settings,
            status: None,
            parameters_panel: StellarParametersPanel::default(),
            table_panel: ModelsTablePanel::default(),
            plot_panel: EquilibriumPlotPanel::default(),
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn tab(&self) -> &StellarParametersData {
        &self.tab
    }

    /// Re-read the session after it was changed from outside the view.
    pub fn refresh(&mut self) {
        self.tab.populate(&self.session);
    }
}

impl<S: Session> eframe::App for StellarViewApp<S> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut view = ViewContext {
            tab: &mut self.tab,
            session: &mut self.session,
            settings: &mut self.settings,
            status: &mut self.status,
        };

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                self.parameters_panel.render_menu(ui, &mut view);
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| match view.status.clone() {
                Some(msg) => {
                    ui.label(msg.as_str());
                    if ui.small_button("✖").clicked() {
                        *view.status = None;
                    }
                }
                None => {
                    ui.weak("Ready");
                }
            });
        });

        let max_w = view.settings.table_max_width;
        egui::SidePanel::left("models_side")
            .resizable(true)
            .default_width(max_w)
            .max_width(max_w + 40.0)
            .show(ctx, |ui| {
                if self.parameters_panel.state().visible {
                    self.parameters_panel.render_panel(ui, &mut view);
                    ui.separator();
                }
                if self.table_panel.state().visible {
                    self.table_panel.render_panel(ui, &mut view);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.plot_panel.state().visible {
                self.plot_panel.render_panel(ui, &mut view);
            }
        });
    }
}
