use eframe::egui;
use egui::{Color32, Ui};

use super::panel_trait::{Panel, PanelState, ViewContext};
use crate::data::stellar_parameters::{InputState, ParameterField};
use crate::persistence::{load_state_from_path, save_state_to_path, ViewStateSerde};

const INTERMEDIATE_BG: Color32 = Color32::from_rgb(0xff, 0xf7, 0x9a);
const INVALID_BG: Color32 = Color32::from_rgb(0xf6, 0x98, 0x9d);

/// Stellar parameter inputs, the measure button and the filter toggle.
pub struct StellarParametersPanel {
    pub state: PanelState,
}

impl Default for StellarParametersPanel {
    fn default() -> Self {
        Self {
            state: PanelState::new("Stellar parameters", "★"),
        }
    }
}

fn input_background(state: InputState) -> Option<Color32> {
    match state {
        InputState::Acceptable => None,
        InputState::Intermediate => Some(INTERMEDIATE_BG),
        InputState::Invalid => Some(INVALID_BG),
    }
}

impl StellarParametersPanel {
    fn render_form(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>) {
        egui::Grid::new("stellar_parameters_form")
            .num_columns(2)
            .spacing([8.0, 4.0])
            .show(ui, |ui| {
                for field in ParameterField::ALL {
                    ui.label(field.label());
                    let bg = input_background(view.tab.form.state(field));
                    let mut edit = egui::TextEdit::singleline(view.tab.form.text_mut(field))
                        .desired_width(80.0);
                    if let Some(c) = bg {
                        edit = edit.background_color(c).text_color(Color32::BLACK);
                    }
                    let (lo, hi) = field.range();
                    ui.add(edit).on_hover_text(format!(
                        "{} to {}, at most {} decimals",
                        field.format(lo),
                        field.format(hi),
                        field.decimals()
                    ));
                    ui.end_row();
                }
            });
    }

    fn measure(&mut self, view: &mut ViewContext<'_>) {
        match view.tab.measure_abundances(&mut *view.session) {
            Ok(summary) => {
                let mut msg = format!("Measured {} transitions", summary.transitions);
                if summary.fitted > 0 {
                    msg.push_str(&format!(", fit {} new", summary.fitted));
                }
                if summary.failures > 0 {
                    msg.push_str(&format!(", {} fits failed", summary.failures));
                }
                view.report(msg);
            }
            Err(e) => {
                log::warn!("measuring abundances failed: {}", e);
                view.report(e.to_string());
            }
        }
    }

    fn save_view(&mut self, view: &mut ViewContext<'_>) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("stellarview_state.json")
            .add_filter("JSON", &["json"])
            .save_file()
        {
            let state = ViewStateSerde::capture(view.tab, &*view.session);
            match save_state_to_path(&state, &path) {
                Ok(()) => view.report(format!("Saved view to {}", path.display())),
                Err(e) => view.report(format!("Failed to save view: {e}")),
            }
        }
    }

    fn load_view(&mut self, view: &mut ViewContext<'_>) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            let result = load_state_from_path(&path)
                .and_then(|state| state.apply_to(view.tab, &mut *view.session));
            match result {
                Ok(()) => view.report(format!("Loaded view from {}", path.display())),
                Err(e) => view.report(format!("Failed to load view: {e}")),
            }
        }
    }
}

impl Panel for StellarParametersPanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    fn render_menu(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>) {
        ui.menu_button("🗁 View", |ui| {
            if ui.button("Save view state…").clicked() {
                self.save_view(view);
                ui.close();
            }
            if ui.button("Load view state…").clicked() {
                self.load_view(view);
                ui.close();
            }
            ui.separator();
            if ui.button("Save settings as default").clicked() {
                view.settings.hide_unacceptable = view.tab.hide_unacceptable();
                if let Ok(p) = view.tab.form.to_parameters() {
                    view.settings.initial_parameters = Some(p);
                }
                match view.settings.save_to_default_path() {
                    Ok(()) => view.report("Saved default settings"),
                    Err(e) => view.report(format!("Failed to save settings: {e}")),
                }
                ui.close();
            }
        });
    }

    fn render_panel(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>) {
        ui.heading(self.state.label());
        self.render_form(ui, view);

        ui.horizontal(|ui| {
            let ready = view.tab.form.is_acceptable();
            if ui
                .add_enabled(ready, egui::Button::new("Measure abundances"))
                .on_disabled_hover_text("Fix the highlighted parameters first")
                .clicked()
            {
                self.measure(view);
            }
            if ui.button(view.tab.filter_button_label()).clicked() {
                let hide = !view.tab.hide_unacceptable();
                if let Err(e) = view.tab.set_hide_unacceptable(hide, &*view.session) {
                    view.report(e.to_string());
                }
            }
        });
    }
}
