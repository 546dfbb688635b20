//! Raman and infrared spectra from Γ-point vibrational data.

pub mod active_modes;
pub mod ir;
pub mod raman;
pub mod vibrational;

pub use active_modes::{ActiveMode, ActiveModeTable, Parity, active_mode_table, parity, select_active};
pub use ir::{mode_dipoles, powder_ir, single_crystal_ir};
pub use raman::{
    Plane, mode_raman_tensors, plane_averaged_raman, powder_invariants, powder_raman,
    single_crystal_raman,
};
pub use vibrational::{GammaModes, SpectrumSettings, gamma_modes};

use crate::domain::{VibroError, VibroResult};
use crate::numerics::vector::{Vec3, linspace};
use crate::numerics::{LorentzianSumInput, multilorentz};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Extra range below the lowest and above the highest peak (cm⁻¹).
pub const SPECTRUM_MARGIN: f64 = 200.0;
pub const SPECTRUM_STEP: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    Raman,
    Ir,
}

impl SelectionRule {
    /// Message shown instead of a spectrum when no mode is active.
    pub const fn sentinel(self) -> &'static str {
        match self {
            Self::Raman => "No Raman modes detected.",
            Self::Ir => "No IR modes detected.",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raman => "raman",
            Self::Ir => "ir",
        }
    }
}

impl Display for SelectionRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Per-mode intensities of the active modes plus their Lorentzian-broadened curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensitySpectrum {
    pub rule: SelectionRule,
    pub geometry: String,
    /// Active mode wavenumbers (cm⁻¹).
    pub frequencies: Vec<f64>,
    pub labels: Vec<String>,
    /// Mass-weighted patterns `[mode][atom]` of the active modes.
    pub eigenvectors: Vec<Vec<Vec3>>,
    /// Component name to one intensity per active mode.
    pub intensities: BTreeMap<String, Vec<f64>>,
    /// Broadening grid (cm⁻¹).
    pub wavenumbers: Vec<f64>,
    pub broadened: BTreeMap<String, Vec<f64>>,
}

impl IntensitySpectrum {
    /// Sum of all broadened components.
    pub fn total(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.wavenumbers.len()];
        for curve in self.broadened.values() {
            for (sum, value) in total.iter_mut().zip(curve) {
                *sum += value;
            }
        }
        total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpectrumOutcome {
    Spectrum(IntensitySpectrum),
    NoActiveModes(String),
}

impl SpectrumOutcome {
    pub fn spectrum(&self) -> Option<&IntensitySpectrum> {
        match self {
            Self::Spectrum(spectrum) => Some(spectrum),
            Self::NoActiveModes(_) => None,
        }
    }
}

/// Uniform grid from `min − 200` to `max + 200` cm⁻¹ with a 1 cm⁻¹ step.
pub fn spectrum_grid(frequencies: &[f64]) -> Vec<f64> {
    let (min, max) = frequencies
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| (min.min(*value), max.max(*value)));
    if !min.is_finite() {
        return Vec::new();
    }
    let (low, high) = (min - SPECTRUM_MARGIN, max + SPECTRUM_MARGIN);
    let count = ((high - low) / SPECTRUM_STEP).round() as usize + 1;
    linspace(low, high, count)
}

/// Filters to active modes and broadens each intensity component.
fn assemble(
    rule: SelectionRule,
    geometry: &str,
    modes: &GammaModes,
    activity: &[f64],
    components: Vec<(&str, Vec<f64>)>,
    settings: &SpectrumSettings,
) -> VibroResult<SpectrumOutcome> {
    let active = select_active(modes, rule, Some(activity), settings.intensity_threshold);
    if active.is_empty() {
        return Ok(SpectrumOutcome::NoActiveModes(rule.sentinel().to_string()));
    }
    let frequencies: Vec<f64> = active.iter().map(|&mode| modes.wavenumbers[mode]).collect();
    let labels = active.iter().map(|&mode| modes.label(mode)).collect();
    let eigenvectors = active.iter().map(|&mode| modes.eigenvectors[mode].clone()).collect();
    let wavenumbers = spectrum_grid(&frequencies);

    let mut intensities = BTreeMap::new();
    let mut broadened = BTreeMap::new();
    for (name, values) in components {
        if values.len() != modes.len() {
            return Err(VibroError::kernel_internal(format!(
                "{name} has {} intensities for {} modes",
                values.len(),
                modes.len()
            )));
        }
        let selected: Vec<f64> = active.iter().map(|&mode| values[mode]).collect();
        let curve = multilorentz(LorentzianSumInput::new(&wavenumbers, &frequencies, &selected, settings.fwhm))?;
        intensities.insert(name.to_string(), selected);
        broadened.insert(name.to_string(), curve);
    }
    Ok(SpectrumOutcome::Spectrum(IntensitySpectrum {
        rule,
        geometry: geometry.to_string(),
        frequencies,
        labels,
        eigenvectors,
        intensities,
        wavenumbers,
        broadened,
    }))
}
