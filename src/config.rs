//! Configuration for the stellar parameters view.
//!
//! [`ViewSettings`] is the persisted part (YAML under `$HOME/.stellarview`);
//! [`StellarViewConfig`] adds runtime-only window options.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::actions::DEFAULT_DETECTION_SIGMA;
use crate::data::stellar_parameters::StellarParameters;
use crate::error::{Error, Result};

const SETTINGS_DIR: &str = ".stellarview";
const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Start with unacceptable models hidden from the table.
    pub hide_unacceptable: bool,
    /// Detection sigma offered when none of the selected models has one.
    pub default_detection_sigma: f64,
    /// Maximum width of the models table (points).
    pub table_max_width: f32,
    /// Parameters to push into a session that has none of its own.
    pub initial_parameters: Option<StellarParameters>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            hide_unacceptable: false,
            default_detection_sigma: DEFAULT_DETECTION_SIGMA,
            table_max_width: 370.0,
            initial_parameters: None,
        }
    }
}

impl ViewSettings {
    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var_os("HOME").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME env var not set",
            ))
        })?;
        Ok(PathBuf::from(home).join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<ViewSettings> {
        let txt = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&txt)?)
    }

    pub fn save_to_default_path(&self) -> Result<()> {
        self.save_to_path(&Self::default_path()?)
    }

    pub fn load_from_default_path() -> Result<ViewSettings> {
        Self::load_from_path(&Self::default_path()?)
    }

    /// Load from the default path, falling back to defaults on any error.
    pub fn load_or_default() -> ViewSettings {
        match Self::load_from_default_path() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("using default view settings: {}", e);
                ViewSettings::default()
            }
        }
    }
}

/// Configuration passed to [`crate::run_stellar_view`].
pub struct StellarViewConfig {
    pub title: String,
    pub settings: ViewSettings,
    /// Optional eframe window options.
    pub native_options: Option<eframe::NativeOptions>,
}

impl Default for StellarViewConfig {
    fn default() -> Self {
        Self {
            title: "Stellar parameters".to_string(),
            settings: ViewSettings::default(),
            native_options: None,
        }
    }
}

impl StellarViewConfig {
    pub fn with_settings(settings: ViewSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }
}
