use super::raman::log_outcome;
use super::vibrational::{GammaModes, SpectrumSettings, gamma_modes};
use super::{SelectionRule, SpectrumOutcome, assemble};
use crate::domain::{VibrationalData, VibroError, VibroResult};
use crate::numerics::vector::{self, Vec3};
use crate::support::kernel_boundary;

/// Mode dipole p = Σ_κ Z_κ · e_κ/√M_κ from the Born effective charges.
pub fn mode_dipoles(modes: &GammaModes, data: &VibrationalData) -> VibroResult<Vec<Vec3>> {
    let born = data
        .born_charges
        .as_ref()
        .ok_or_else(|| VibroError::invalid_input("vibrational data has no Born charges"))?;
    if born.len() != data.num_atoms() {
        return Err(VibroError::invalid_input(format!(
            "{} Born charges for {} atoms",
            born.len(),
            data.num_atoms()
        )));
    }
    Ok((0..modes.len())
        .map(|mode| {
            born.iter().enumerate().fold([0.0; 3], |dipole, (atom, charge)| {
                vector::add(&dipole, &vector::mat_vec(charge, &modes.displacement(mode, atom)))
            })
        })
        .collect())
}

pub(crate) fn ir_activity(modes: &GammaModes, data: &VibrationalData) -> VibroResult<Vec<f64>> {
    Ok(mode_dipoles(modes, data)?
        .iter()
        .map(|dipole| vector::dot(dipole, dipole))
        .collect())
}

/// Orientation-averaged IR intensities |p|².
pub fn powder_ir(data: &VibrationalData, settings: &SpectrumSettings) -> VibroResult<SpectrumOutcome> {
    let outcome = kernel_boundary("powder IR", || {
        let modes = gamma_modes(data, settings.nac_direction)?;
        let activity = ir_activity(&modes, data)?;
        assemble(
            SelectionRule::Ir,
            "powder",
            &modes,
            &activity,
            vec![("intensity", activity.clone())],
            settings,
        )
    })?;
    log_outcome(&outcome, "powder");
    Ok(outcome)
}

/// IR intensities |p·ε|² for one polarisation.
pub fn single_crystal_ir(
    data: &VibrationalData,
    settings: &SpectrumSettings,
    polarization: Vec3,
) -> VibroResult<SpectrumOutcome> {
    let polarization = vector::normalized(&polarization)
        .ok_or_else(|| VibroError::bad_polarization("polarisation vector must be non-zero"))?;
    let outcome = kernel_boundary("single-crystal IR", || {
        let modes = gamma_modes(data, settings.nac_direction)?;
        let dipoles = mode_dipoles(&modes, data)?;
        let intensities = dipoles
            .iter()
            .map(|dipole| vector::dot(dipole, &polarization).powi(2))
            .collect();
        let activity = dipoles.iter().map(|dipole| vector::dot(dipole, dipole)).collect::<Vec<_>>();
        assemble(
            SelectionRule::Ir,
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
