//! Stellar parameters and validation of their text inputs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StellarParameters {
    /// Effective temperature (K).
    pub effective_temperature: f64,
    pub surface_gravity: f64,
    pub metallicity: f64,
    /// Microturbulence (km/s).
    pub microturbulence: f64,
}

impl Default for StellarParameters {
    fn default() -> Self {
        Self {
            effective_temperature: 5777.0,
            surface_gravity: 4.44,
            metallicity: 0.0,
            microturbulence: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterField {
    EffectiveTemperature,
    SurfaceGravity,
    Metallicity,
    Microturbulence,
}

impl ParameterField {
    pub const ALL: [ParameterField; 4] = [
        ParameterField::EffectiveTemperature,
        ParameterField::SurfaceGravity,
        ParameterField::Metallicity,
        ParameterField::Microturbulence,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ParameterField::EffectiveTemperature => "Effective temperature (K)",
            ParameterField::SurfaceGravity => "Surface gravity",
            ParameterField::Metallicity => "Metallicity",
            ParameterField::Microturbulence => "Microturbulence (km/s)",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ParameterField::EffectiveTemperature => "effective_temperature",
            ParameterField::SurfaceGravity => "surface_gravity",
            ParameterField::Metallicity => "metallicity",
            ParameterField::Microturbulence => "microturbulence",
        }
    }

    /// Accepted `(min, max)` range.
    pub fn range(self) -> (f64, f64) {
        match self {
            ParameterField::EffectiveTemperature => (3000.0, 8000.0),
            ParameterField::SurfaceGravity => (-1.0, 6.0),
            ParameterField::Metallicity => (-5.0, 1.0),
            ParameterField::Microturbulence => (0.0, 5.0),
        }
    }

    /// Maximum number of decimals accepted while typing.
    pub fn decimals(self) -> usize {
        match self {
            ParameterField::EffectiveTemperature => 0,
            _ => 3,
        }
    }

    pub fn format(self, value: f64) -> String {
        match self {
            ParameterField::EffectiveTemperature => format!("{:.0}", value),
            ParameterField::SurfaceGravity => format!("{:.2}", value),
            ParameterField::Metallicity => format!("{:+.2}", value),
            ParameterField::Microturbulence => format!("{:.2}", value),
        }
    }

    pub fn get(self, p: &StellarParameters) -> f64 {
        match self {
            ParameterField::EffectiveTemperature => p.effective_temperature,
            ParameterField::SurfaceGravity => p.surface_gravity,
            ParameterField::Metallicity => p.metallicity,
            ParameterField::Microturbulence => p.microturbulence,
        }
    }

    pub fn set(self, p: &mut StellarParameters, value: f64) {
        match self {
            ParameterField::EffectiveTemperature => p.effective_temperature = value,
            ParameterField::SurfaceGravity => p.surface_gravity = value,
            ParameterField::Metallicity => p.metallicity = value,
            ParameterField::Microturbulence => p.microturbulence = value,
        }
    }
}

/// Outcome of validating a partially typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Acceptable,
    /// Could still become acceptable (blank, lone sign, out of range).
    Intermediate,
    Invalid,
}

pub fn validate(field: ParameterField, text: &str) -> InputState {
    let s = text.trim();
    if s.is_empty() || matches!(s, "-" | "+" | "." | "-." | "+.") {
        return InputState::Intermediate;
    }
    let Ok(value) = s.parse::<f64>() else {
        return InputState::Invalid;
    };
    if !value.is_finite() {
        return InputState::Invalid;
    }
    let decimals = s
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|c| c.is_ascii_digit()).count())
        .unwrap_or(0);
    if decimals > field.decimals() {
        return InputState::Invalid;
    }
    let (min, max) = field.range();
    if value >= min && value <= max {
        InputState::Acceptable
    } else {
        InputState::Intermediate
    }
}

/// Editable text for the four stellar parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterForm {
    texts: [String; 4],
}

impl Default for ParameterForm {
    fn default() -> Self {
        Self::from_parameters(&StellarParameters::default())
    }
}

impl ParameterForm {
    pub fn from_parameters(p: &StellarParameters) -> Self {
        Self {
            texts: ParameterField::ALL.map(|f| f.format(f.get(p))),
        }
    }

    /// Refresh every field from `p`, discarding edits.
    pub fn populate(&mut self, p: &StellarParameters) {
        *self = Self::from_parameters(p);
    }

    fn slot(field: ParameterField) -> usize {
        match field {
            ParameterField::EffectiveTemperature => 0,
            ParameterField::SurfaceGravity => 1,
            ParameterField::Metallicity => 2,
            ParameterField::Microturbulence => 3,
        }
    }

    pub fn text(&self, field: ParameterField) -> &str {
        &self.texts[Self::slot(field)]
    }

    pub fn text_mut(&mut self, field: ParameterField) -> &mut String {
        &mut self.texts[Self::slot(field)]
    }

    pub fn state(&self, field: ParameterField) -> InputState {
        validate(field, self.text(field))
    }

    pub fn is_acceptable(&self) -> bool {
        ParameterField::ALL
            .iter()
            .all(|f| self.state(*f) == InputState::Acceptable)
    }

    /// Parse all fields. Every field must validate as acceptable.
    pub fn to_parameters(&self) -> Result<StellarParameters> {
        let mut p = StellarParameters::default();
        for field in ParameterField::ALL {
            let text = self.text(field);
            if validate(field, text) != InputState::Acceptable {
                return Err(Error::InvalidParameter {
                    field: field.key(),
                    text: text.to_string(),
                });
            }
            let value = text.trim().parse::<f64>().map_err(|_| Error::InvalidParameter {
                field: field.key(),
                text: text.to_string(),
            })?;
            field.set(&mut p, value);
        }
        Ok(p)
    }
}
