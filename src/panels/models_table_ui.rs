use std::cell::Cell;
use std::sync::mpsc::Receiver;

use eframe::egui;
use egui::Ui;
use egui_table::{HeaderRow as EgHeaderRow, Table, TableDelegate};

use super::panel_trait::{Panel, PanelState, ViewContext};
use crate::data::actions::{
    default_detection_sigma, default_fitting_window, ModelAction, DETECTION_SIGMA_RANGE,
    FITTING_WINDOW_RANGE, MAX_CONTINUUM_ORDER,
};
use crate::data::filter::IndexMapChanged;
use crate::data::spectral_model::{ProfileKind, SpectralModel};
use crate::data::table::{ModelColumn, SortOrder, ToggleOutcome};

// Feature-gated debug logging for the models table layout.
// Enable prints with: cargo run --features models_table_debug --example synthetic_session
#[cfg(feature = "models_table_debug")]
#[allow(unused_macros)]
macro_rules! models_debug { ($($arg:tt)*) => { eprintln!($($arg)*); } }

#[cfg(not(feature = "models_table_debug"))]
#[allow(unused_macros)]
macro_rules! models_debug {
    // Arguments are still type-checked and count as used.
    ($($arg:tt)*) => {{
        if false {
            eprintln!($($arg)*);
        }
    }};
}

thread_local! {
    static LAST_AVAIL_W: Cell<f32> = const { Cell::new(0.0) };
}

const HEADER_H: f32 = 36.0;
const ROW_H: f32 = 20.0;

/// Table of the spectral models used for stellar parameter inference.
pub struct ModelsTablePanel {
    pub state: PanelState,
    index_events: Option<Receiver<IndexMapChanged>>,
    /// Selection the context-menu defaults were computed for.
    defaults_for: Option<Vec<usize>>,
    window: f64,
    sigma: f64,
    mask_start: f64,
    mask_end: f64,
}

impl Default for ModelsTablePanel {
    fn default() -> Self {
        Self {
            state: PanelState::new("Spectral models", "☰"),
            index_events: None,
            defaults_for: None,
            window: 5.0,
            sigma: crate::data::actions::DEFAULT_DETECTION_SIGMA,
            mask_start: 0.0,
            mask_end: 0.0,
        }
    }
}

#[derive(Default)]
struct TableRequests {
    toggle: Option<(usize, bool)>,
    select: Option<(usize, bool)>,
    sort: Option<ModelColumn>,
    action: Option<ModelAction>,
}

struct ModelsDelegate<'a> {
    models: &'a [SpectralModel],
    rows: &'a [usize],
    selection: &'a [usize],
    profiles_selected: bool,
    sort: Option<(ModelColumn, SortOrder)>,
    col_w: [f32; 5],
    window: &'a mut f64,
    sigma: &'a mut f64,
    requests: &'a mut TableRequests,
}

impl TableDelegate for ModelsDelegate<'_> {
    fn header_cell_ui(&mut self, ui: &mut egui::Ui, cell: &egui_table::HeaderCellInfo) {
        let col = cell.col_range.start;
        let Some(&column) = ModelColumn::ALL.get(col) else {
            return;
        };
        let mut text = column.header().to_string();
        match self.sort {
            Some((c, SortOrder::Ascending)) if c == column => text.push_str(" ▲"),
            Some((c, SortOrder::Descending)) if c == column => text.push_str(" ▼"),
            _ => {}
        }
        let (rect, _resp) =
            ui.allocate_exact_size(egui::vec2(self.col_w[col], HEADER_H), egui::Sense::hover());
        ui.scope_builder(
            egui::UiBuilder::new()
                .max_rect(rect)
                .layout(egui::Layout::centered_and_justified(egui::Direction::LeftToRight)),
            |inner| {
                let resp = inner
                    .add(egui::Label::new(egui::RichText::new(text).strong()).sense(egui::Sense::click()))
                    .on_hover_text("Click to sort");
                if resp.clicked() {
                    self.requests.sort = Some(column);
                }
            },
        );
    }

    fn cell_ui(&mut self, ui: &mut egui::Ui, cell: &egui_table::CellInfo) {
        let row = cell.row_nr as usize;
        let col = cell.col_nr;
        let models = self.models;
        let Some(model) = self.rows.get(row).and_then(|i| models.get(*i)) else {
            return;
        };
        let selected = self.selection.contains(&row);
        let (rect, _resp) =
            ui.allocate_exact_size(egui::vec2(self.col_w[col], ROW_H), egui::Sense::hover());
        if selected {
            ui.painter()
                .rect_filled(rect, 0.0, ui.visuals().selection.bg_fill);
        }
        ui.scope_builder(
            egui::UiBuilder::new()
                .max_rect(rect)
                .layout(egui::Layout::left_to_right(egui::Align::Center)),
            |inner| match ModelColumn::ALL[col] {
                ModelColumn::Acceptable => {
                    inner.with_layout(
                        egui::Layout::centered_and_justified(egui::Direction::LeftToRight),
                        |cui| {
                            let mut v = model.is_acceptable();
                            let hint = if model.is_measured() {
                                "Acceptable for stellar parameter inference"
                            } else {
                                "Fit this model before marking it acceptable"
                            };
                            if cui.checkbox(&mut v, "").on_hover_text(hint).changed() {
                                self.requests.toggle = Some((row, v));
                            }
                        },
                    );
                }
                column => {
                    inner.add_space(4.0);
                    let resp = inner.add(
                        egui::Label::new(column.cell_text(model))
                            .truncate()
                            .sense(egui::Sense::click()),
                    );
                    if resp.clicked() {
                        let additive = inner.input(|i| i.modifiers.command || i.modifiers.shift);
                        self.requests.select = Some((row, additive));
                    }
                    if resp.secondary_clicked() && !selected {
                        self.requests.select = Some((row, false));
                    }
                    resp.context_menu(|ui| {
                        model_menu(
                            ui,
                            self.window,
                            self.sigma,
                            self.profiles_selected,
                            &mut self.requests.action,
                        )
                    });
                }
            },
        );
    }
}

fn menu_entry(ui: &mut Ui, action: ModelAction, out: &mut Option<ModelAction>) {
    if ui.button(action.label()).clicked() {
        *out = Some(action);
        ui.close();
    }
}

/// Context menu for the selected models.
fn model_menu(
    ui: &mut Ui,
    window: &mut f64,
    sigma: &mut f64,
    profiles: bool,
    out: &mut Option<ModelAction>,
) {
    menu_entry(ui, ModelAction::Fit, out);
    ui.separator();
    menu_entry(ui, ModelAction::MarkAcceptable, out);
    menu_entry(ui, ModelAction::MarkUnacceptable, out);
    ui.separator();

    ui.menu_button("Fitting window", |ui| {
        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(window)
                    .speed(0.1)
                    .range(FITTING_WINDOW_RANGE.0..=FITTING_WINDOW_RANGE.1)
                    .suffix(" Å"),
            );
            if ui.button("Apply").clicked() {
                *out = Some(ModelAction::SetFittingWindow(*window));
                ui.close();
            }
        });
    });

    ui.menu_button("Continuum", |ui| {
        menu_entry(ui, ModelAction::SetContinuumOrder(None), out);
        ui.separator();
        for order in 0..=MAX_CONTINUUM_ORDER {
            menu_entry(ui, ModelAction::SetContinuumOrder(Some(order)), out);
        }
    });

    // Profile settings only apply to profile-fitting models
    ui.add_enabled_ui(profiles, |ui| {
        ui.menu_button("Profile", |ui| {
            for kind in ProfileKind::ALL {
                menu_entry(ui, ModelAction::SetProfile(kind), out);
            }
        });
        menu_entry(ui, ModelAction::SetCentralWeighting(true), out);
        menu_entry(ui, ModelAction::SetCentralWeighting(false), out);
        ui.menu_button("Detection sigma", |ui| {
            ui.horizontal(|ui| {
                ui.add(
                    egui::DragValue::new(sigma)
                        .speed(0.05)
                        .range(DETECTION_SIGMA_RANGE.0..=DETECTION_SIGMA_RANGE.1),
                );
                if ui.button("Apply").clicked() {
                    *out = Some(ModelAction::SetDetectionSigma(*sigma));
                    ui.close();
                }
            });
        });
    });
}

impl ModelsTablePanel {
    fn drain_index_events(&mut self, view: &mut ViewContext<'_>) {
        let rx = self
            .index_events
            .get_or_insert_with(|| view.tab.proxy.subscribe());
        for ev in rx.try_iter() {
            models_debug!(
                "[models_table] index map r{}: {}/{} visible",
                ev.revision,
                ev.visible,
                ev.total
            );
            self.defaults_for = None;
        }
    }

    fn refresh_defaults(&mut self, view: &ViewContext<'_>) {
        let indices = view.tab.selected_indices();
        if self.defaults_for.as_ref() == Some(&indices) {
            return;
        }
        let models = view.session.spectral_models().unwrap_or_default();
        if let Some(w) = default_fitting_window(models, &indices) {
            self.window = w;
        }
        self.sigma = default_detection_sigma(models, &indices, view.settings.default_detection_sigma);
        if let Some(m) = indices.last().and_then(|i| models.get(*i)) {
            self.mask_start = m.transition.wavelength() - 0.5;
            self.mask_end = m.transition.wavelength() + 0.5;
        }
        self.defaults_for = Some(indices);
    }

    fn column_widths(avail_w: f32) -> [f32; 5] {
        let mut w = [24.0, 64.0, 64.0, 64.0, 90.0];
        let sum_min: f32 = w.iter().sum();
        if avail_w > sum_min {
            // Extra space goes to the abundances column
            w[4] += avail_w - sum_min;
        }
        w
    }

    fn apply_requests(&mut self, req: TableRequests, view: &mut ViewContext<'_>) {
        if let Some(column) = req.sort {
            if let Err(e) = view.tab.cycle_sort(column, &mut *view.session) {
                view.report(format!("Sorting failed: {e}"));
            }
        }
        if let Some((row, additive)) = req.select {
            view.tab.select_row(row, additive);
        }
        if let Some((row, value)) = req.toggle {
            match view.tab.toggle_acceptable(row, value, &mut *view.session) {
                Ok(ToggleOutcome::Applied { .. }) => {}
                Ok(ToggleOutcome::Rejected(e)) => view.report(e.to_string()),
                Err(e) => {
                    log::warn!("toggle on row {} failed: {}", row, e);
                    view.report(e.to_string());
                }
            }
        }
        if let Some(action) = req.action {
            match view.tab.apply_action(&action, &mut *view.session) {
                Ok(report) => {
                    let mut msg = format!(
                        "{}: {} changed, {} re-fit",
                        action.label(),
                        report.changed.len(),
                        report.refit.len()
                    );
                    if !report.skipped.is_empty() {
                        msg.push_str(&format!(", {} skipped", report.skipped.len()));
                    }
                    if !report.failures.is_empty() {
                        msg.push_str(&format!(", {} failed", report.failures.len()));
                    }
                    view.report(msg);
                }
                Err(e) => view.report(e.to_string()),
            }
            self.defaults_for = None;
        }
    }

    fn render_masks(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>) {
        let models = view.session.spectral_models().unwrap_or_default();
        let Some((_, model)) = view.tab.selected_model(models) else {
            return;
        };
        ui.strong(format!("Masks: {} {}", model.repr_element(), model.repr_wavelength()));
        let regions = model.metadata.mask.clone();
        let mut remove_at = None;
        for [s, e] in regions.iter() {
            ui.horizontal(|ui| {
                ui.label(format!("{s:.2} – {e:.2} Å"));
                if ui.small_button("✖").on_hover_text("Remove region").clicked() {
                    remove_at = Some(0.5 * (s + e));
                }
            });
        }
        let mut add = false;
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut self.mask_start).speed(0.01).suffix(" Å"));
            ui.add(egui::DragValue::new(&mut self.mask_end).speed(0.01).suffix(" Å"));
            add = ui.button("Add mask").clicked();
        });

        if let Some(x) = remove_at {
            if let Err(e) = view.tab.remove_mask_at(x, &mut *view.session) {
                view.report(format!("Removing mask failed: {e}"));
            }
        }
        if add {
            match view.tab.add_mask(self.mask_start, self.mask_end, &mut *view.session) {
                Ok(true) => {}
                Ok(false) => view.report("Mask region has zero width"),
                Err(e) => view.report(format!("Adding mask failed: {e}")),
            }
        }
    }
}

impl Panel for ModelsTablePanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    fn render_panel(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>) {
        self.drain_index_events(view);
        self.refresh_defaults(view);

        let total = view
            .session
            .spectral_models()
            .map(|m| m.len())
            .unwrap_or(0);
        ui.label(format!(
            "{} of {} models shown",
            view.tab.proxy.visible_count(),
            total
        ));

        let avail_w = ui.available_width().min(view.settings.table_max_width);
        LAST_AVAIL_W.with(|last| {
            if (last.get() - avail_w).abs() > 0.5 {
                last.set(avail_w);
                models_debug!("[models_table] avail width={:.1}", avail_w);
            }
        });
        let w = Self::column_widths(avail_w);
        let cols: Vec<egui_table::Column> = w.iter().map(|w| egui_table::Column::new(*w)).collect();

        let rows_len = view.tab.proxy.visible_count() as f32;
        let preferred = HEADER_H + ROW_H * rows_len + 8.0;
        let table_h = preferred.clamp(120.0, (ui.available_height() * 0.75).max(200.0));

        let mut requests = TableRequests::default();
        {
            let models = view.session.spectral_models().unwrap_or_default();
            let indices = view.tab.selected_indices();
            let profiles_selected = indices
                .iter()
                .filter_map(|i| models.get(*i))
                .any(|m| m.supports_profile_settings());
            let mut delegate = ModelsDelegate {
                models,
                rows: view.tab.proxy.indices(),
                selection: view.tab.selection(),
                profiles_selected,
                sort: view.tab.sort(),
                col_w: w,
                window: &mut self.window,
                sigma: &mut self.sigma,
                requests: &mut requests,
            };
            let (rect, _resp) =
                ui.allocate_exact_size(egui::vec2(avail_w, table_h), egui::Sense::hover());
            let mut table_ui = ui.new_child(
                egui::UiBuilder::new()
                    .max_rect(rect)
                    .layout(egui::Layout::left_to_right(egui::Align::Min)),
            );
            Table::new()
                .id_salt("models_table")
                .num_rows(delegate.rows.len() as u64)
                .columns(cols)
                .headers(vec![EgHeaderRow::new(HEADER_H)])
                .show(&mut table_ui, &mut delegate);
        }
        self.apply_requests(requests, view);

        ui.separator();
        self.render_masks(ui, view);
    }
}
