use super::vibrational::{GammaModes, SpectrumSettings, gamma_modes};
use super::{SelectionRule, ir, raman};
use crate::common::constants::ACOUSTIC_WAVENUMBER_CUTOFF;
use crate::domain::{VibrationalData, VibroResult};
use crate::numerics::vector::Vec3;
use crate::support::kernel_boundary;
use serde::{Deserialize, Serialize};

/// Inversion parity of an irreducible-representation label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Gerade,
    Ungerade,
}

/// Reads the trailing g/u of labels like `A₁g`, `Eg`, `B_{2u}` or `T1u'`.
pub fn parity(label: &str) -> Option<Parity> {
    let core = label.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | '′' | '″' | '}' | ')'));
    match core.chars().last()? {
        'g' => Some(Parity::Gerade),
        'u' => Some(Parity::Ungerade),
        _ => None,
    }
}

/// Indices of modes allowed by `rule`.
///
/// Acoustic modes are always dropped. A label with a parity decides on its
/// own: gerade modes are Raman active and ungerade modes IR active. Other
/// modes need an activity above `threshold` times the strongest one.
pub fn select_active(
    modes: &GammaModes,
    rule: SelectionRule,
    activity: Option<&[f64]>,
    threshold: f64,
) -> Vec<usize> {
    let optical: Vec<usize> = (0..modes.len())
        .filter(|&mode| modes.wavenumbers[mode] > ACOUSTIC_WAVENUMBER_CUTOFF)
        .collect();
    let strongest = activity
        .map(|values| {
            optical
                .iter()
                .filter_map(|&mode| values.get(mode).copied())
                .fold(0.0, f64::max)
        })
        .unwrap_or(0.0);
    optical
        .into_iter()
        .filter(|&mode| match parity(&modes.label(mode)) {
            Some(Parity::Gerade) => rule == SelectionRule::Raman,
            Some(Parity::Ungerade) => rule == SelectionRule::Ir,
            None => activity
                .and_then(|values| values.get(mode))
                .is_some_and(|value| strongest > 0.0 && *value > threshold * strongest),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMode {
    pub index: usize,
    /// Wavenumber rounded to 0.01 cm⁻¹.
    pub wavenumber: f64,
    pub label: String,
    pub eigenvector: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveModeTable {
    Modes(Vec<ActiveMode>),
    NoActiveModes(String),
}

fn needs_activity(modes: &GammaModes) -> bool {
    (0..modes.len()).any(|mode| parity(&modes.label(mode)).is_none())
}

/// Active modes for an external mode viewer.
pub fn active_mode_table(
    data: &VibrationalData,
    rule: SelectionRule,
    settings: &SpectrumSettings,
) -> VibroResult<ActiveModeTable> {
    kernel_boundary("active modes", || {
        let modes = gamma_modes(data, settings.nac_direction)?;
        let activity = if needs_activity(&modes) {
            Some(match rule {
                SelectionRule::Raman => raman::raman_activity(&modes, data)?,
                SelectionRule::Ir => ir::ir_activity(&modes, data)?,
            })
        } else {
            None
        };
        let active = select_active(&modes, rule, activity.as_deref(), settings.intensity_threshold);
        if active.is_empty() {
            return Ok(ActiveModeTable::NoActiveModes(rule.sentinel().to_string()));
        }
        Ok(ActiveModeTable::Modes(
            active
                .into_iter()
                .map(|mode| ActiveMode {
                    index: mode,
                    wavenumber: (modes.wavenumbers[mode] * 100.0).round() / 100.0,
                    label: modes.label(mode),
                    eigenvector: modes.eigenvectors[mode].clone(),
                })
                .collect(),
        ))
    })
}
