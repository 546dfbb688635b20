use super::modes::{ModeRequest, ModeSolver};
use crate::common::constants::{
    ACOUSTIC_ENERGY_THRESHOLD, BOLTZMANN_MEV_PER_K, HBAR2_OVER_AMU,
};
use crate::domain::VibroResult;
use crate::numerics::grid::{mesh_from_spacing, monkhorst_pack};
use crate::numerics::vector::{self, Mat3, Vec3, ZERO_MAT3};

pub const DEFAULT_GRID_SPACING: f64 = 0.1;

/// Mean-square displacement tensors ⟨u uᵀ⟩ (Å²) per atom at temperature `T`,
/// integrated over a Monkhorst–Pack grid with the given spacing (Å⁻¹).
pub fn debye_waller_tensors(
    solver: &ModeSolver<'_>,
    temperature: f64,
    grid_spacing: f64,
    n_threads: usize,
) -> VibroResult<Vec<Mat3>> {
    let record = solver.record();
    let structure = record.primitive();
    let mesh = mesh_from_spacing(
        &structure.reciprocal_lattice(),
        structure.periodicity().flags(),
        grid_spacing,
    );
    let requests: Vec<ModeRequest> = monkhorst_pack(mesh).into_iter().map(ModeRequest::at).collect();
    let grid_modes = solver.solve_all(&requests, n_threads)?;
    let masses = record.masses();
    let kt = BOLTZMANN_MEV_PER_K * temperature;

    let mut tensors = vec![ZERO_MAT3; record.num_atoms()];
    for modes in &grid_modes {
        for (branch, &energy) in modes.energies.iter().enumerate() {
            if energy < ACOUSTIC_ENERGY_THRESHOLD {
                continue;
            }
            let coth = if kt > 0.0 { 1.0 / (energy / (2.0 * kt)).tanh() } else { 1.0 };
            let amplitude = HBAR2_OVER_AMU * coth / (2.0 * energy * grid_modes.len() as f64);
            for (atom, tensor) in tensors.iter_mut().enumerate() {
                let Some(e) = modes.atom_vector(branch, atom) else {
                    continue;
                };
                for alpha in 0..3 {
                    for beta in 0..3 {
                        tensor[alpha][beta] += amplitude * (e[alpha] * e[beta].conj()).re / masses[atom];
                    }
                }
            }
        }
    }
    Ok(tensors)
}

/// Debye–Waller exponent W = ½ Qᵀ⟨u uᵀ⟩Q for a Cartesian wavevector.
pub fn debye_waller_exponent(tensor: &Mat3, q_cart: &Vec3) -> f64 {
    0.5 * vector::dot(q_cart, &vector::mat_vec(tensor, q_cart))
}
