use super::debye_waller::debye_waller_exponent;
use super::modes::QModes;
use crate::common::constants::{ACOUSTIC_ENERGY_THRESHOLD, HBAR2_OVER_AMU, bose_occupation};
use crate::domain::{VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3, Vec3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENERGY_BINS: usize = 200;
const AUTO_WINDOW_MARGIN: f64 = 1.0e-5;
const AUTO_WINDOW_HEADROOM: f64 = 1.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Coherent,
    Dos,
}

/// Uniform energy bin edges (meV): the given window, or one that spans all
/// mode energies from `max(0, min − ε)` to `1.05·max`.
pub fn energy_edges(
    energies: impl IntoIterator<Item = f64>,
    bins: usize,
    window: Option<[f64; 2]>,
) -> VibroResult<Vec<f64>> {
    if bins == 0 {
        return Err(VibroError::invalid_input("energy bin count must be positive"));
    }
    let [low, high] = match window {
        Some([low, high]) => {
            if !(low.is_finite() && high.is_finite() && high > low) {
                return Err(VibroError::invalid_input(format!(
                    "energy window [{low}, {high}] is empty"
                )));
            }
            [low, high]
        }
        None => {
            let (min, max) = energies
                .into_iter()
                .filter(|energy| energy.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), energy| {
                    (min.min(energy), max.max(energy))
                });
            if !min.is_finite() {
                return Err(VibroError::invalid_input("no mode energies to bin"));
            }
            let low = (min - AUTO_WINDOW_MARGIN).max(0.0);
            let high = AUTO_WINDOW_HEADROOM * max;
            if high > low { [low, high] } else { [low, low + 1.0] }
        }
    };
    let step = (high - low) / bins as f64;
    Ok((0..=bins).map(|index| low + step * index as f64).collect())
}

/// Index of the bin holding `value`, for uniform edges; the top edge is inclusive.
pub fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    let bins = edges.len().checked_sub(1)?;
    let (low, high) = (edges[0], edges[bins]);
    if !(value >= low && value <= high) || bins == 0 {
        return None;
    }
    let index = ((value - low) / (high - low) * bins as f64).floor() as usize;
    Some(index.min(bins - 1))
}

/// Adds weighted mode energies into a histogram row.
pub fn accumulate(row: &mut [f64], edges: &[f64], energies: &[f64], weights: &[f64], scale: f64) {
    for (&energy, &weight) in energies.iter().zip(weights) {
        if let Some(index) = bin_index(edges, energy) {
            row[index] += scale * weight;
        }
    }
}

/// Per-mode intensity weights at one wavevector.
pub struct ModeWeighter<'a> {
    pub weighting: Weighting,
    pub temperature: f64,
    pub cartesian_positions: Vec<Vec3>,
    pub masses: &'a [f64],
    pub scattering_lengths: &'a [f64],
    pub debye_waller: Option<Vec<Mat3>>,
}

impl ModeWeighter<'_> {
    /// DOS weighting counts every mode once; coherent weighting returns
    /// S = ħ²/(2E)·|F|²·(n+1) with
    /// F = Σκ bκ/√Mκ · e^{−Wκ} · e^{iQ·rκ} · (Q·eκ).
    pub fn weights(&self, q_cart: &Vec3, modes: &QModes) -> VibroResult<Vec<f64>> {
        if self.weighting == Weighting::Dos {
            return Ok(vec![1.0; modes.branches()]);
        }
        if modes.eigenvectors.is_none() {
            return Err(VibroError::needs_eigenvectors(
                "coherent weighting needs eigenvectors, only frequencies are available",
            ));
        }

        let prefactors: Vec<Complex64> = self
            .cartesian_positions
            .iter()
            .enumerate()
            .map(|(atom, position)| {
                let damping = self
                    .debye_waller
                    .as_ref()
                    .map_or(1.0, |tensors| (-debye_waller_exponent(&tensors[atom], q_cart)).exp());
                let amplitude = self.scattering_lengths[atom] / self.masses[atom].sqrt() * damping;
                Complex64::from_polar(amplitude, vector::dot(q_cart, position))
            })
            .collect();

        (0..modes.branches())
            .map(|branch| {
                let energy = modes.energies[branch];
                if energy < ACOUSTIC_ENERGY_THRESHOLD {
                    return Ok(0.0);
                }
                let mut amplitude = Complex64::new(0.0, 0.0);
                for (atom, prefactor) in prefactors.iter().enumerate() {
                    let e = modes.atom_vector(branch, atom).ok_or_else(|| {
                        VibroError::needs_eigenvectors(format!(
                            "eigenvector of branch {branch} is missing atom {atom}"
                        ))
                    })?;
                    let projection = e[0] * q_cart[0] + e[1] * q_cart[1] + e[2] * q_cart[2];
                    amplitude += prefactor * projection;
                }
                let occupation = bose_occupation(energy, self.temperature) + 1.0;
                Ok(HBAR2_OVER_AMU / (2.0 * energy) * amplitude.norm_sqr() * occupation)
            })
            .collect()
    }
}
