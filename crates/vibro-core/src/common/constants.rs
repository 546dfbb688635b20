//! Physical constants and unit conversions used by the spectrum kernels.

/// Phonon energy in meV for a dynamical-matrix eigenvalue of 1 eV/(Å²·amu).
pub const EIGENVALUE_TO_MEV: f64 = 64.654_1;

/// ħ²/amu in meV·Å².
pub const HBAR2_OVER_AMU: f64 = 4.180_16;

/// ħ²/(2 m_n) in meV·Å², relating neutron energy and wavevector.
pub const NEUTRON_ENERGY_PER_K2: f64 = 2.072_1;

pub const BOLTZMANN_MEV_PER_K: f64 = 0.086_173_33;

/// hc/k_B in K·cm, converts wavenumbers to temperatures.
pub const WAVENUMBER_TO_KELVIN: f64 = 1.438_776_9;

/// e²/(4πε₀) in eV·Å.
pub const COULOMB_EV_ANGSTROM: f64 = 14.399_645;

pub const MEV_TO_CM1: f64 = 8.065_544;

/// Below this energy (meV) a mode is treated as acoustic at Γ.
pub const ACOUSTIC_ENERGY_THRESHOLD: f64 = 1.0e-3;

/// Below this wavenumber (cm⁻¹) a mode is excluded from optical activity.
pub const ACOUSTIC_WAVENUMBER_CUTOFF: f64 = 1.0;

pub fn eigenvalue_to_mev(eigenvalue: f64) -> f64 {
    eigenvalue.signum() * eigenvalue.abs().sqrt() * EIGENVALUE_TO_MEV
}

/// Bose–Einstein occupation for an energy in meV; zero at T = 0.
pub fn bose_occupation(energy_mev: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 || energy_mev <= 0.0 {
        return 0.0;
    }
    let expm1 = (energy_mev / (BOLTZMANN_MEV_PER_K * temperature)).exp_m1();
    if expm1 == 0.0 { 0.0 } else { 1.0 / expm1 }
}
