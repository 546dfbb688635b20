use crate::common::constants::{
    COULOMB_EV_ANGSTROM, MEV_TO_CM1, WAVENUMBER_TO_KELVIN, eigenvalue_to_mev,
};
use crate::domain::{VibrationalData, VibroError, VibroResult};
use crate::numerics::vector::{self, Vec3};
use crate::numerics::{DenseComplexMatrix, eigh, hermitian_part};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DEFAULT_LASER_WAVELENGTH: f64 = 532.0;
pub const DEFAULT_TEMPERATURE: f64 = 300.0;
pub const DEFAULT_FWHM: f64 = 10.0;
/// Modes weaker than this fraction of the strongest are treated as inactive.
pub const DEFAULT_INTENSITY_THRESHOLD: f64 = 1.0e-6;

/// Shared settings of the Raman and IR kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumSettings {
    /// Laser wavelength in nm.
    pub laser_wavelength: f64,
    /// Kelvin.
    pub temperature: f64,
    /// Lorentzian FWHM in cm⁻¹.
    pub fwhm: f64,
    /// Cartesian direction for the non-analytical correction at Γ.
    pub nac_direction: Option<Vec3>,
    pub intensity_threshold: f64,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            laser_wavelength: DEFAULT_LASER_WAVELENGTH,
            temperature: DEFAULT_TEMPERATURE,
            fwhm: DEFAULT_FWHM,
            nac_direction: None,
            intensity_threshold: DEFAULT_INTENSITY_THRESHOLD,
        }
    }
}

impl SpectrumSettings {
    pub fn laser_wavenumber(&self) -> VibroResult<f64> {
        if !(self.laser_wavelength.is_finite() && self.laser_wavelength > 0.0) {
            return Err(VibroError::invalid_input(format!(
                "laser wavelength must be positive, got {} nm",
                self.laser_wavelength
            )));
        }
        Ok(1.0e7 / self.laser_wavelength)
    }

    /// Stokes prefactor (ν_L − ν)⁴ (n + 1) / ν for a mode at `wavenumber` cm⁻¹.
    pub fn raman_prefactor(&self, wavenumber: f64) -> VibroResult<f64> {
        let laser = self.laser_wavenumber()?;
        if wavenumber <= 0.0 {
            return Ok(0.0);
        }
        let occupation = if self.temperature > 0.0 {
            1.0 / (WAVENUMBER_TO_KELVIN * wavenumber / self.temperature).exp_m1()
        } else {
            0.0
        };
        Ok((laser - wavenumber).powi(4) * (occupation + 1.0) / wavenumber)
    }
}

/// Γ-point modes: wavenumbers in cm⁻¹ and real mass-weighted patterns `[mode][atom]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaModes {
    pub wavenumbers: Vec<f64>,
    pub eigenvectors: Vec<Vec<Vec3>>,
    pub labels: Option<Vec<String>>,
    pub masses: Vec<f64>,
}

impl GammaModes {
    pub fn len(&self) -> usize {
        self.wavenumbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumbers.is_empty()
    }

    pub fn label(&self, mode: usize) -> String {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(mode).cloned())
            .unwrap_or_default()
    }

    /// Cartesian displacement of `atom` in `mode`, e/√M.
    pub fn displacement(&self, mode: usize, atom: usize) -> Vec3 {
        vector::scale(&self.eigenvectors[mode][atom], 1.0 / self.masses[atom].sqrt())
    }
}

/// Γ modes of a tier: diagonalised from its force constants when present,
/// otherwise the stored frequencies and eigenvectors.
pub fn gamma_modes(data: &VibrationalData, nac_direction: Option<Vec3>) -> VibroResult<GammaModes> {
    let masses = data.resolved_masses()?;
    let atoms = data.num_atoms();
    let labels = data
        .mode_labels
        .clone()
        .filter(|labels| labels.len() == 3 * atoms);

    if let Some(force_constants) = &data.force_constants {
        if force_constants.len() != atoms || force_constants.iter().any(|row| row.len() != atoms) {
            return Err(VibroError::invalid_input(format!(
                "Γ force constants must be {atoms}x{atoms} blocks"
            )));
        }
        let mut matrix = DenseComplexMatrix::zeros(3 * atoms, 3 * atoms);
        for (i, row) in force_constants.iter().enumerate() {
            for (j, block) in row.iter().enumerate() {
                let scale = 1.0 / (masses[i] * masses[j]).sqrt();
                for alpha in 0..3 {
                    for beta in 0..3 {
                        matrix[(3 * i + alpha, 3 * j + beta)] = Complex64::new(block[alpha][beta] * scale, 0.0);
                    }
                }
            }
        }
        if let Some(direction) = nac_direction {
            add_nac_term(&mut matrix, data, &masses, &direction)?;
        }
        let eigen = eigh(&hermitian_part(&matrix))?;
        let wavenumbers = eigen
            .values
            .iter()
            .map(|&value| eigenvalue_to_mev(value) * MEV_TO_CM1)
            .collect();
        let eigenvectors = (0..eigen.dimension())
            .map(|mode| {
                let components = real_pattern(&eigen.vector(mode));
                (0..atoms)
                    .map(|atom| [components[3 * atom], components[3 * atom + 1], components[3 * atom + 2]])
                    .collect()
            })
            .collect();
        return Ok(GammaModes {
            wavenumbers,
            eigenvectors,
            labels,
            masses,
        });
    }

    let wavenumbers = data.frequencies.clone().ok_or_else(|| {
        VibroError::needs_eigenvectors("vibrational data carries neither force constants nor frequencies")
    })?;
    let eigenvectors = data.eigenvectors.clone().ok_or_else(|| {
        VibroError::needs_eigenvectors("mode intensities need eigenvectors, only frequencies are available")
    })?;
    if eigenvectors.len() != wavenumbers.len() || eigenvectors.iter().any(|mode| mode.len() != atoms) {
        return Err(VibroError::invalid_input(format!(
            "{} eigenvectors for {} frequencies and {atoms} atoms",
            eigenvectors.len(),
            wavenumbers.len()
        )));
    }
    let labels = data
        .mode_labels
        .clone()
        .filter(|labels| labels.len() == wavenumbers.len());
    Ok(GammaModes {
        wavenumbers,
        eigenvectors,
        labels,
        masses,
    })
}

fn add_nac_term(
    matrix: &mut DenseComplexMatrix,
    data: &VibrationalData,
    masses: &[f64],
    direction: &Vec3,
) -> VibroResult<()> {
    let (Some(born), Some(dielectric)) = (&data.born_charges, &data.dielectric) else {
        return Err(VibroError::invalid_input(
            "a NAC direction needs Born charges and the dielectric tensor",
        ));
    };
    let direction = vector::normalized(direction)
        .ok_or_else(|| VibroError::invalid_input("NAC direction must be non-zero"))?;
    let screening = vector::dot(&direction, &vector::mat_vec(dielectric, &direction));
    if screening.abs() <= f64::EPSILON {
        return Ok(());
    }
    let prefactor = 4.0 * PI * COULOMB_EV_ANGSTROM / data.structure.volume() / screening;
    let charges: Vec<Vec3> = born.iter().map(|tensor| vector::vec_mat(&direction, tensor)).collect();
    for (i, left) in charges.iter().enumerate() {
        for (j, right) in charges.iter().enumerate() {
            let scale = prefactor / (masses[i] * masses[j]).sqrt();
            for alpha in 0..3 {
                for beta in 0..3 {
                    matrix[(3 * i + alpha, 3 * j + beta)] += Complex64::new(left[alpha] * right[beta] * scale, 0.0);
                }
            }
        }
    }
    Ok(())
}

/// Rotates a complex eigenvector so its largest component is real and keeps the real part.
fn real_pattern(components: &[Complex64]) -> Vec<f64> {
    let phase = components
        .iter()
        .max_by(|a, b| a.norm_sqr().total_cmp(&b.norm_sqr()))
        .filter(|largest| largest.norm() > 0.0)
        .map_or(Complex64::new(1.0, 0.0), |largest| largest.conj() / largest.norm());
    let rotated: Vec<f64> = components.iter().map(|value| (value * phase).re).collect();
    let norm = rotated.iter().map(|value| value * value).sum::<f64>().sqrt();
    if norm > 0.0 {
        rotated.iter().map(|value| value / norm).collect()
    } else {
        rotated
    }
}
