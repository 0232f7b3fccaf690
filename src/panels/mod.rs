pub mod equilibrium_plot_ui;
pub mod models_table_ui;
pub mod panel_trait;
pub mod stellar_parameters_ui;

pub use equilibrium_plot_ui::EquilibriumPlotPanel;
pub use models_table_ui::ModelsTablePanel;
pub use panel_trait::{Panel, PanelState, ViewContext};
pub use stellar_parameters_ui::StellarParametersPanel;
