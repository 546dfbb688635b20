use super::errors::{VibroError, VibroResult};
use super::structure::Structure;
use crate::common::atomic_mass;
use crate::numerics::vector::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub type Rank3 = [[[f64; 3]; 3]; 3];

/// Numerical-accuracy level of a vibrational tensor set.
///
/// Variants are declared in increasing priority so the `Ord` maximum is the
/// preferred tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccuracyTier {
    #[serde(rename = "numerical_accuracy_2")]
    NumericalAccuracy2,
    #[serde(rename = "numerical_accuracy_2_step_1")]
    NumericalAccuracy2Step1,
    #[serde(rename = "numerical_accuracy_2_step_2")]
    NumericalAccuracy2Step2,
    #[serde(rename = "numerical_accuracy_4")]
    NumericalAccuracy4,
}

impl AccuracyTier {
    /// Highest priority first.
    pub const PRIORITY: [AccuracyTier; 4] = [
        Self::NumericalAccuracy4,
        Self::NumericalAccuracy2Step2,
        Self::NumericalAccuracy2Step1,
        Self::NumericalAccuracy2,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NumericalAccuracy2 => "numerical_accuracy_2",
            Self::NumericalAccuracy2Step1 => "numerical_accuracy_2_step_1",
            Self::NumericalAccuracy2Step2 => "numerical_accuracy_2_step_2",
            Self::NumericalAccuracy4 => "numerical_accuracy_4",
        }
    }
}

impl Display for AccuracyTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Vibrational tensors and modes for one accuracy tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationalData {
    pub structure: Structure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masses: Option<Vec<f64>>,
    /// Γ-point force constants `[atom][atom]` in eV/Å².
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_constants: Option<Vec<Vec<Mat3>>>,
    /// `born_charges[atom][field][displacement]` in units of e.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub born_charges: Option<Vec<Mat3>>,
    /// `raman_tensors[atom][displacement]` is dχ/du in 1/Å.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raman_tensors: Option<Vec<[Mat3; 3]>>,
    /// High-frequency dielectric tensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dielectric: Option<Mat3>,
    /// Second-order susceptibility in pm/V.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlo_susceptibility: Option<Rank3>,
    /// Mode wavenumbers in cm⁻¹.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequencies: Option<Vec<f64>>,
    /// Mass-weighted eigenvectors `[mode][atom]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eigenvectors: Option<Vec<Vec<Vec3>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_labels: Option<Vec<String>>,
}

impl VibrationalData {
    pub fn new(structure: Structure) -> Self {
        Self {
            structure,
            masses: None,
            force_constants: None,
            born_charges: None,
            raman_tensors: None,
            dielectric: None,
            nlo_susceptibility: None,
            frequencies: None,
            eigenvectors: None,
            mode_labels: None,
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.structure.num_sites()
    }

    /// Explicit masses, otherwise standard atomic masses of the site symbols.
    pub fn resolved_masses(&self) -> VibroResult<Vec<f64>> {
        if let Some(masses) = &self.masses {
            if masses.len() != self.num_atoms() {
                return Err(VibroError::invalid_input(format!(
                    "{} masses given for {} atoms",
                    masses.len(),
                    self.num_atoms()
                )));
            }
            return Ok(masses.clone());
        }
        self.structure
            .sites()
            .iter()
            .map(|site| {
                atomic_mass(&site.symbol).ok_or_else(|| {
                    VibroError::invalid_input(format!("no standard mass for '{}'", site.symbol))
                })
            })
            .collect()
    }
}

/// Accuracy tiers of the same tensor set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VibrationalTiers(BTreeMap<AccuracyTier, VibrationalData>);

impl VibrationalTiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tier: AccuracyTier, data: VibrationalData) {
        self.0.insert(tier, data);
    }

    pub fn get(&self, tier: AccuracyTier) -> Option<&VibrationalData> {
        self.0.get(&tier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tiers(&self) -> impl Iterator<Item = AccuracyTier> + '_ {
        self.0.keys().copied()
    }

    /// Highest-priority tier present.
    pub fn best(&self) -> Option<(AccuracyTier, &VibrationalData)> {
        AccuracyTier::PRIORITY
            .iter()
            .find_map(|tier| self.0.get(tier).map(|data| (*tier, data)))
    }
}

impl FromIterator<(AccuracyTier, VibrationalData)> for VibrationalTiers {
    fn from_iter<I: IntoIterator<Item = (AccuracyTier, VibrationalData)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
