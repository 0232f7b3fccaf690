use std::collections::BTreeMap;

use eframe::egui;
use egui::{Color32, Ui};
use egui_plot::{HLine, Legend, Line, LineStyle, Plot, Points};

use super::panel_trait::{Panel, PanelState, ViewContext};
use crate::data::state::TrendAxis;
use crate::data::trends::{padded_span, SpeciesKey};

// Matches egui_plot's default auto-bounds margin.
const SPAN_MARGIN: f64 = 0.05;

const PALETTE: [Color32; 8] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
];

/// Abundance against excitation potential and reduced equivalent width.
pub struct EquilibriumPlotPanel {
    pub state: PanelState,
    pub show_trends: bool,
}

impl Default for EquilibriumPlotPanel {
    fn default() -> Self {
        Self {
            state: PanelState::new("Excitation & ionization balance", "📈"),
            show_trends: true,
        }
    }
}

impl EquilibriumPlotPanel {
    fn render_plot(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>, axis: TrendAxis, height: f32) {
        let mut by_species: BTreeMap<SpeciesKey, Vec<[f64; 2]>> = BTreeMap::new();
        for (species, p) in view.tab.scatter(axis) {
            by_species.entry(SpeciesKey::new(species)).or_default().push(p);
        }
        let trends = if self.show_trends {
            view.tab.trend_lines(axis)
        } else {
            BTreeMap::new()
        };
        let selected = view
            .tab
            .selected_points(axis, view.session.spectral_models().unwrap_or_default());

        let plot = Plot::new(("equilibrium", axis.label()))
            .height(height)
            .x_axis_label(axis.label())
            .y_axis_label("log ε (dex)")
            .legend(Legend::default())
            .allow_double_click_reset(true);

        let labels = view.tab.species_labels();
        // Spans every point on this axis so all trend lines cover the same range.
        let span = padded_span(by_species.values().flatten().map(|p| p[0]), SPAN_MARGIN);

        let plot_resp = plot.show(ui, |plot_ui| {
            for (i, (key, pts)) in by_species.iter().enumerate() {
                let color = PALETTE[i % PALETTE.len()];
                let element = labels
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| format!("{:.1}", key.species()));
                plot_ui.points(Points::new(element.clone(), pts.clone()).radius(3.0).color(color));

                let Some(trend) = trends.get(key) else {
                    continue;
                };
                if let Some(text) = trend.abundance_label(&element) {
                    plot_ui.hline(
                        HLine::new(text, trend.median)
                            .color(color)
                            .style(LineStyle::dotted_dense())
                            .width(1.0),
                    );
                }
                let segment = span.and_then(|(x0, x1)| trend.segment(x0, x1));
                if let (Some(seg), Some(slope)) = (segment, trend.slope_label(axis)) {
                    plot_ui.line(
                        Line::new(format!("{} {}", element, slope), seg.to_vec())
                            .color(color)
                            .width(1.0),
                    );
                }
            }
            if !selected.is_empty() {
                plot_ui.points(
                    Points::new("Selected", selected.clone())
                        .radius(6.0)
                        .filled(false)
                        .color(Color32::YELLOW),
                );
            }
        });

        if plot_resp.response.clicked() {
            if let Some(screen_pos) = plot_resp.response.interact_pointer_pos() {
                let transform = plot_resp.transform;
                let pos = transform.value_from_position(screen_pos);
                let bounds = transform.bounds();
                let models = view.session.spectral_models().unwrap_or_default();
                if view
                    .tab
                    .pick_point(axis, (pos.x, pos.y), (bounds.width(), bounds.height()), models)
                    .is_none()
                {
                    log::debug!("no visible model near ({:.3}, {:.3})", pos.x, pos.y);
                }
            }
        }
    }
}

impl Panel for EquilibriumPlotPanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    fn render_panel(&mut self, ui: &mut Ui, view: &mut ViewContext<'_>) {
        ui.horizontal(|ui| {
            ui.strong(self.state.label());
            ui.checkbox(&mut self.show_trends, "Trend lines");
        });
        if view.tab.state().is_none() {
            ui.label("Measure abundances to populate the plots.");
        }
        let height = ((ui.available_height() - 16.0) / 2.0).max(120.0);
        self.render_plot(ui, view, TrendAxis::Excitation, height);
        self.render_plot(ui, view, TrendAxis::LineStrength, height);
    }
}
