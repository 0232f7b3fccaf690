//! View state persistence: save and load the stellar parameters tab to/from
//! JSON files.
//!
//! The selection is stored as content hashes rather than row numbers so it
//! survives re-sorting and filter changes between save and load.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::inference::StellarParametersData;
use crate::data::session::Session;
use crate::data::stellar_parameters::StellarParameters;
use crate::data::table::{ModelColumn, SortOrder};
use crate::error::{Error, Result};

// ---------- Serializable mirror types ----------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortSerde {
    pub column: ModelColumn,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStateSerde {
    #[serde(default)]
    pub hide_unacceptable: bool,
    #[serde(default)]
    pub selected_hashes: Vec<u64>,
    #[serde(default)]
    pub sort: Option<SortSerde>,
    pub stellar_parameters: StellarParameters,
    pub saved_at: DateTime<Utc>,
}

impl ViewStateSerde {
    /// Snapshot the tab. The parameters come from the form when it parses,
    /// otherwise from the session.
    pub fn capture<S>(tab: &StellarParametersData, session: &S) -> Self
    where
        S: Session + ?Sized,
    {
        let models = session.spectral_models().unwrap_or_default();
        Self {
            hide_unacceptable: tab.hide_unacceptable(),
            selected_hashes: tab.selected_hashes(models),
            sort: tab.sort().map(|(column, order)| SortSerde { column, order }),
            stellar_parameters: tab
                .form
                .to_parameters()
                .unwrap_or_else(|_| session.stellar_parameters()),
            saved_at: Utc::now(),
        }
    }

    /// Restore into `tab`: re-sort the session, re-apply the filter toggle,
    /// push the parameters, then select the stored hashes that are still
    /// present and visible.
    pub fn apply_to<S>(self, tab: &mut StellarParametersData, session: &mut S) -> Result<()>
    where
        S: Session + ?Sized,
    {
        if let Some(s) = self.sort {
            if let Err(e) = tab.sort_by(s.column, s.order, session) {
                match e {
                    // Nothing loaded: sorting is moot, restore the rest.
                    Error::CollectionUnavailable => {}
                    e => return Err(e),
                }
            }
        }
        tab.set_hide_unacceptable(self.hide_unacceptable, &*session)?;
        session.set_stellar_parameters(self.stellar_parameters);
        tab.form.populate(&self.stellar_parameters);
        let models = session.spectral_models().unwrap_or_default();
        tab.select_hashes(&self.selected_hashes, models);
        let restored = tab.selection().len();
        if restored < self.selected_hashes.len() {
            log::warn!(
                "restored {} of {} selected models; the rest are gone or hidden",
                restored,
                self.selected_hashes.len()
            );
        }
        Ok(())
    }
}

// ---------- Public API ----------

pub fn state_to_json(state: &ViewStateSerde) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn state_from_json(txt: &str) -> Result<ViewStateSerde> {
    Ok(serde_json::from_str(txt)?)
}

pub fn save_state_to_path(state: &ViewStateSerde, path: &Path) -> Result<()> {
    let txt = state_to_json(state)?;
    std::fs::write(path, txt)?;
    log::debug!("saved view state to {}", path.display());
    Ok(())
}

pub fn load_state_from_path(path: &Path) -> Result<ViewStateSerde> {
    let txt = std::fs::read_to_string(path)?;
    state_from_json(&txt)
}
