use super::vibrational::{GammaModes, SpectrumSettings, gamma_modes};
use super::{SelectionRule, SpectrumOutcome, assemble};
use crate::domain::{VibrationalData, VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3, Vec3, ZERO_MAT3};
use crate::support::kernel_boundary;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;
use tracing::info;

/// Quadrature points per angle for in-plane averaging.
const PLANE_QUADRATURE: usize = 32;

/// Cartesian plane holding both polarisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    Xy,
    Yz,
    Xz,
}

impl Plane {
    const fn axes(self) -> (usize, usize) {
        match self {
            Self::Xy => (0, 1),
            Self::Yz => (1, 2),
            Self::Xz => (0, 2),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xy => "xy",
            Self::Yz => "yz",
            Self::Xz => "xz",
        }
    }
}

impl FromStr for Plane {
    type Err = VibroError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "xy" => Ok(Self::Xy),
            "yz" => Ok(Self::Yz),
            "xz" => Ok(Self::Xz),
            other => Err(VibroError::invalid_input(format!(
                "plane must be xy, yz or xz, got '{other}'"
            ))),
        }
    }
}

/// Raman tensor of every mode: R = Σ_κγ dχ/du_κγ · e_κγ/√M_κ.
pub fn mode_raman_tensors(modes: &GammaModes, data: &VibrationalData) -> VibroResult<Vec<Mat3>> {
    let derivatives = data
        .raman_tensors
        .as_ref()
        .ok_or_else(|| VibroError::invalid_input("vibrational data has no Raman tensors"))?;
    if derivatives.len() != data.num_atoms() {
        return Err(VibroError::invalid_input(format!(
            "{} Raman tensors for {} atoms",
            derivatives.len(),
            data.num_atoms()
        )));
    }
    Ok((0..modes.len())
        .map(|mode| {
            let mut tensor = ZERO_MAT3;
            for (atom, per_direction) in derivatives.iter().enumerate() {
                let displacement = modes.displacement(mode, atom);
                for (gamma, derivative) in per_direction.iter().enumerate() {
                    tensor = vector::mat_add(&tensor, &vector::mat_scale(derivative, displacement[gamma]));
                }
            }
            tensor
        })
        .collect())
}

/// Orientation-averaged parallel (HH) and crossed (HV) intensities of a tensor,
/// (45α² + 4γ²)/45 and 3γ²/45.
pub fn powder_invariants(tensor: &Mat3) -> (f64, f64) {
    let s = vector::symmetrized(tensor);
    let alpha = (s[0][0] + s[1][1] + s[2][2]) / 3.0;
    let gamma_sq = 0.5
        * ((s[0][0] - s[1][1]).powi(2) + (s[1][1] - s[2][2]).powi(2) + (s[2][2] - s[0][0]).powi(2))
        + 3.0 * (s[0][1].powi(2) + s[1][2].powi(2) + s[0][2].powi(2));
    ((45.0 * alpha * alpha + 4.0 * gamma_sq) / 45.0, 3.0 * gamma_sq / 45.0)
}

/// Average of |eᵢ·R·eₒ|² for in-plane polarisations at angles t and t + x.
fn plane_average(tensor: &Mat3, plane: Plane) -> f64 {
    let (i, j) = plane.axes();
    let (a, b, c, d) = (tensor[i][i], tensor[i][j], tensor[j][i], tensor[j][j]);
    let step = 2.0 * PI / PLANE_QUADRATURE as f64;
    let mut sum = 0.0;
    for ti in 0..PLANE_QUADRATURE {
        let t = step * ti as f64;
        for xi in 0..PLANE_QUADRATURE {
            let u = t + step * xi as f64;
            let value = a * t.cos() * u.cos() + b * t.cos() * u.sin() + c * t.sin() * u.cos() + d * t.sin() * u.sin();
            sum += value * value;
        }
    }
    sum / (PLANE_QUADRATURE * PLANE_QUADRATURE) as f64
}

/// Geometry-independent Raman activity used by the selection filter.
pub(crate) fn raman_activity(modes: &GammaModes, data: &VibrationalData) -> VibroResult<Vec<f64>> {
    Ok(mode_raman_tensors(modes, data)?
        .iter()
        .map(|tensor| {
            let (parallel, crossed) = powder_invariants(tensor);
            parallel + crossed
        })
        .collect())
}

fn prefactors(modes: &GammaModes, settings: &SpectrumSettings) -> VibroResult<Vec<f64>> {
    modes
        .wavenumbers
        .iter()
        .map(|&wavenumber| settings.raman_prefactor(wavenumber))
        .collect()
}

/// Powder Raman with polarised (HH) and depolarised (HV) components.
pub fn powder_raman(data: &VibrationalData, settings: &SpectrumSettings) -> VibroResult<SpectrumOutcome> {
    let outcome = kernel_boundary("powder Raman", || {
        let modes = gamma_modes(data, settings.nac_direction)?;
        let tensors = mode_raman_tensors(&modes, data)?;
        let prefactors = prefactors(&modes, settings)?;
        let (polarised, depolarised): (Vec<f64>, Vec<f64>) = tensors
            .iter()
            .zip(&prefactors)
            .map(|(tensor, prefactor)| {
                let (parallel, crossed) = powder_invariants(tensor);
                (prefactor * parallel, prefactor * crossed)
            })
            .unzip();
        let activity = raman_activity(&modes, data)?;
        assemble(
            SelectionRule::Raman,
            "powder",
            &modes,
            &activity,
            vec![("polarised", polarised), ("depolarised", depolarised)],
            settings,
        )
    })?;
    log_outcome(&outcome, "powder");
    Ok(outcome)
}

/// Raman for fixed incoming and outgoing polarisations.
pub fn single_crystal_raman(
    data: &VibrationalData,
    settings: &SpectrumSettings,
    incoming: Vec3,
    outgoing: Vec3,
) -> VibroResult<SpectrumOutcome> {
    let (Some(incoming), Some(outgoing)) = (vector::normalized(&incoming), vector::normalized(&outgoing)) else {
        return Err(VibroError::bad_polarization("polarisation vectors must be non-zero"));
    };
    let outcome = kernel_boundary("single-crystal Raman", || {
        let modes = gamma_modes(data, settings.nac_direction)?;
        let tensors = mode_raman_tensors(&modes, data)?;
        let prefactors = prefactors(&modes, settings)?;
        let intensities = tensors
            .iter()
            .zip(&prefactors)
            .map(|(tensor, prefactor)| {
                let amplitude = vector::dot(&incoming, &vector::mat_vec(tensor, &outgoing));
                prefactor * amplitude * amplitude
            })
            .collect();
        let activity = raman_activity(&modes, data)?;
        assemble(
            SelectionRule::Raman,
            "single_crystal",
            &modes,
            &activity,
            vec![("intensity", intensities)],
            settings,
        )
    })?;
    log_outcome(&outcome, "single_crystal");
    Ok(outcome)
}

/// Raman averaged over both polarisation angles within one Cartesian plane.
pub fn plane_averaged_raman(
    data: &VibrationalData,
    settings: &SpectrumSettings,
    plane: Plane,
) -> VibroResult<SpectrumOutcome> {
    let outcome = kernel_boundary("plane-averaged Raman", || {
        let modes = gamma_modes(data, settings.nac_direction)?;
        let tensors = mode_raman_tensors(&modes, data)?;
        let prefactors = prefactors(&modes, settings)?;
        let intensities = tensors
            .iter()
            .zip(&prefactors)
            .map(|(tensor, prefactor)| prefactor * plane_average(tensor, plane))
            .collect();
        let activity = raman_activity(&modes, data)?;
        assemble(
            SelectionRule::Raman,
            &format!("plane_{}", plane.as_str()),
            &modes,
            &activity,
            vec![("intensity", intensities)],
            settings,
        )
    })?;
    log_outcome(&outcome, plane.as_str());
    Ok(outcome)
}

pub(super) fn log_outcome(outcome: &SpectrumOutcome, geometry: &str) {
    match outcome {
        SpectrumOutcome::Spectrum(spectrum) => {
            info!(rule = %spectrum.rule, geometry, modes = spectrum.frequencies.len(), "computed spectrum");
        }
        SpectrumOutcome::NoActiveModes(message) => info!(geometry, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_tensor_has_no_crossed_component() {
        let (parallel, crossed) = powder_invariants(&[[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        assert!((parallel - 4.0).abs() < 1.0e-12);
        assert_eq!(crossed, 0.0);
    }

    #[test]
    fn plane_average_matches_closed_form() {
        let tensor = [[1.0, 0.3, 0.0], [0.2, -0.5, 0.0], [0.0, 0.0, 7.0]];
        let expected = (1.0 + 0.09 + 0.04 + 0.25) / 4.0;
        assert!((plane_average(&tensor, Plane::Xy) - expected).abs() < 1.0e-12);
        let yz = (0.25 + 49.0) / 4.0;
        assert!((plane_average(&tensor, Plane::Yz) - yz).abs() < 1.0e-12);
    }

    #[test]
    fn planes_parse_case_insensitively() {
        assert_eq!("XZ".parse::<Plane>().ok(), Some(Plane::Xz));
        assert!("xx".parse::<Plane>().is_err());
    }
}
