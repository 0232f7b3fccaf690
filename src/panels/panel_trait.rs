use egui::Ui;

use crate::config::ViewSettings;
use crate::data::inference::StellarParametersData;
use crate::data::session::Session;

#[derive(Debug, Clone, Copy)]
pub struct PanelState {
    pub title: &'static str,
    pub icon: &'static str,
    pub visible: bool,
}

impl PanelState {
    pub fn new(title: &'static str, icon: &'static str) -> Self {
        Self {
            title,
            icon,
            visible: true,
        }
    }

    /// Title with its icon, for menus and headings.
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.title)
    }
}

/// Everything a panel may read or edit during one frame.
pub struct ViewContext<'a> {
    pub tab: &'a mut StellarParametersData,
    pub session: &'a mut dyn Session,
    pub settings: &'a mut ViewSettings,
    /// One-line message shown in the status bar.
    pub status: &'a mut Option<String>,
}

impl ViewContext<'_> {
    pub fn report(&mut self, msg: impl Into<String>) {
        *self.status = Some(msg.into());
    }
}

pub trait Panel {
    fn state(&self) -> &PanelState;
    fn state_mut(&mut self) -> &mut PanelState;

    fn name(&self) -> &'static str {
        self.state().title
    }

    // Optional hooks with default empty impls
    fn render_menu(&mut self, _ui: &mut Ui, _view: &mut ViewContext<'_>) {}
    fn render_panel(&mut self, _ui: &mut Ui, _view: &mut ViewContext<'_>) {}
}
