use crate::common::constants::eigenvalue_to_mev;
use crate::domain::{Structure, VibroError, VibroResult};
use crate::numerics::vector::{self, Vec3};
use crate::numerics::{DenseComplexMatrix, eigh, hermitian_part};
use crate::phonopy::ForceConstantsRecord;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const IMAGE_TOLERANCE: f64 = 1.0e-5;
const GAMMA_TOLERANCE: f64 = 1.0e-8;

/// Phonon modes at one wavevector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QModes {
    /// Fractional reciprocal coordinates.
    pub q: Vec3,
    /// Mode energies in meV, ascending; imaginary modes are negative.
    pub energies: Vec<f64>,
    /// `eigenvectors[branch]` holds `3 * atoms` mass-weighted components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eigenvectors: Option<Vec<Vec<Complex64>>>,
}

impl QModes {
    pub fn branches(&self) -> usize {
        self.energies.len()
    }

    /// Displacement pattern of atom `atom` in branch `branch`.
    pub fn atom_vector(&self, branch: usize, atom: usize) -> Option<[Complex64; 3]> {
        let vector = self.eigenvectors.as_ref()?.get(branch)?;
        let start = 3 * atom;
        Some([*vector.get(start)?, *vector.get(start + 1)?, *vector.get(start + 2)?])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawPrecomputedModes {
    structure: Structure,
    masses: Vec<f64>,
    scattering_lengths: Vec<f64>,
    modes: Vec<QModes>,
}

/// Modes computed elsewhere, used when no force constants are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPrecomputedModes", into = "RawPrecomputedModes")]
pub struct PrecomputedModes {
    structure: Structure,
    masses: Vec<f64>,
    scattering_lengths: Vec<f64>,
    modes: Vec<QModes>,
}

impl PrecomputedModes {
    pub fn new(
        structure: Structure,
        masses: Vec<f64>,
        scattering_lengths: Vec<f64>,
        modes: Vec<QModes>,
    ) -> VibroResult<Self> {
        let atoms = structure.num_sites();
        if masses.len() != atoms || scattering_lengths.len() != atoms {
            return Err(VibroError::invalid_input(format!(
                "precomputed modes need {atoms} masses and scattering lengths"
            )));
        }
        if modes.is_empty() {
            return Err(VibroError::invalid_input("precomputed mode set is empty"));
        }
        for (index, set) in modes.iter().enumerate() {
            if set.energies.len() != 3 * atoms {
                return Err(VibroError::invalid_input(format!(
                    "q-point {index} has {} branches, expected {}",
                    set.energies.len(),
                    3 * atoms
                )));
            }
            if let Some(eigenvectors) = &set.eigenvectors {
                if eigenvectors.len() != 3 * atoms || eigenvectors.iter().any(|v| v.len() != 3 * atoms) {
                    return Err(VibroError::invalid_input(format!(
                        "q-point {index} eigenvectors must be {0}x{0}",
                        3 * atoms
                    )));
                }
            }
        }
        Ok(Self {
            structure,
            masses,
            scattering_lengths,
            modes,
        })
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn scattering_lengths(&self) -> &[f64] {
        &self.scattering_lengths
    }

    pub fn modes(&self) -> &[QModes] {
        &self.modes
    }

    pub fn has_eigenvectors(&self) -> bool {
        self.modes.iter().all(|set| set.eigenvectors.is_some())
    }
}

impl TryFrom<RawPrecomputedModes> for PrecomputedModes {
    type Error = VibroError;

    fn try_from(raw: RawPrecomputedModes) -> Result<Self, Self::Error> {
        Self::new(raw.structure, raw.masses, raw.scattering_lengths, raw.modes)
    }
}

impl From<PrecomputedModes> for RawPrecomputedModes {
    fn from(modes: PrecomputedModes) -> Self {
        Self {
            structure: modes.structure,
            masses: modes.masses,
            scattering_lengths: modes.scattering_lengths,
            modes: modes.modes,
        }
    }
}

/// Input the structure-factor kernels accept.
#[derive(Debug, Clone, Copy)]
pub enum PhononSource<'a> {
    ForceConstants(&'a ForceConstantsRecord),
    Precomputed(&'a PrecomputedModes),
}

impl<'a> PhononSource<'a> {
    pub fn structure(&self) -> &'a Structure {
        match self {
            Self::ForceConstants(record) => record.primitive(),
            Self::Precomputed(modes) => modes.structure(),
        }
    }

    pub fn masses(&self) -> &'a [f64] {
        match self {
            Self::ForceConstants(record) => record.masses(),
            Self::Precomputed(modes) => modes.masses(),
        }
    }

    pub fn scattering_lengths(&self) -> &'a [f64] {
        match self {
            Self::ForceConstants(record) => record.scattering_lengths(),
            Self::Precomputed(modes) => modes.scattering_lengths(),
        }
    }

    pub fn force_constants(&self) -> Option<&'a ForceConstantsRecord> {
        match self {
            Self::ForceConstants(record) => Some(record),
            Self::Precomputed(_) => None,
        }
    }

    pub fn require_force_constants(&self, purpose: &str) -> VibroResult<&'a ForceConstantsRecord> {
        self.force_constants().ok_or_else(|| {
            VibroError::needs_force_constants(format!(
                "{purpose} needs force constants, only precomputed modes were given"
            ))
        })
    }
}

/// Wavevector plus, at Γ, the Cartesian direction it is approached from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeRequest {
    pub q: Vec3,
    pub direction: Option<Vec3>,
}

impl ModeRequest {
    pub fn at(q: Vec3) -> Self {
        Self { q, direction: None }
    }
}

/// Builds and diagonalises dynamical matrices from a force-constants record.
///
/// Phases are taken on lattice translations; supercell partners at equal
/// distance contribute with equal weight.
pub struct ModeSolver<'a> {
    record: &'a ForceConstantsRecord,
    /// `images[i][j]`: lattice translations (primitive fractional) of supercell
    /// atom `j` as seen from primitive atom `i`.
    images: Vec<Vec<Vec<Vec3>>>,
}

impl<'a> ModeSolver<'a> {
    pub fn new(record: &'a ForceConstantsRecord) -> Self {
        let primitive = record.primitive();
        let cell = primitive.cell();
        let supercell = record.supercell();
        let multiples = supercell.matrix.map(f64::from);
        let periodicity = primitive.periodicity();
        let shifts: Vec<Vec3> = {
            let range = |axis: usize| if periodicity.is_periodic(axis) { -1..=1 } else { 0..=0 };
            let mut shifts = Vec::with_capacity(27);
            for a in range(0) {
                for b in range(1) {
                    for c in range(2) {
                        shifts.push([
                            a as f64 * multiples[0],
                            b as f64 * multiples[1],
                            c as f64 * multiples[2],
                        ]);
                    }
                }
            }
            shifts
        };

        let images = primitive
            .sites()
            .iter()
            .map(|origin| {
                supercell
                    .positions
                    .iter()
                    .zip(&supercell.s2p)
                    .map(|(position, &partner)| {
                        let in_primitive: Vec3 =
                            std::array::from_fn(|axis| position[axis] * multiples[axis]);
                        let home = primitive.sites()[partner].position;
                        let candidates: Vec<(f64, Vec3)> = shifts
                            .iter()
                            .map(|shift| {
                                let image = vector::add(&in_primitive, shift);
                                let separation = vector::vec_mat(&vector::sub(&image, &origin.position), cell);
                                (vector::norm(&separation), vector::sub(&image, &home))
                            })
                            .collect();
                        let shortest = candidates
                            .iter()
                            .map(|(distance, _)| *distance)
                            .fold(f64::INFINITY, f64::min);
                        candidates
                            .into_iter()
                            .filter(|(distance, _)| *distance <= shortest + IMAGE_TOLERANCE * shortest.max(1.0))
                            .map(|(_, translation)| translation)
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Self { record, images }
    }

    pub fn record(&self) -> &'a ForceConstantsRecord {
        self.record
    }

    /// Mass-weighted dynamical matrix in eV/(Å²·amu).
    pub fn dynamical_matrix(&self, request: &ModeRequest) -> DenseComplexMatrix {
        let record = self.record;
        let n = record.num_atoms();
        let masses = record.masses();
        let s2p = &record.supercell().s2p;
        let mut matrix = DenseComplexMatrix::zeros(3 * n, 3 * n);

        for (i, row) in record.force_constants().iter().enumerate() {
            for (partner, tensor) in row.iter().enumerate() {
                let j = s2p[partner];
                let translations = &self.images[i][partner];
                let phase = translations
                    .iter()
                    .map(|translation| Complex64::from_polar(1.0, 2.0 * PI * vector::dot(&request.q, translation)))
                    .sum::<Complex64>()
                    / translations.len() as f64;
                let scale = 1.0 / (masses[i] * masses[j]).sqrt();
                for alpha in 0..3 {
                    for beta in 0..3 {
                        matrix[(3 * i + alpha, 3 * j + beta)] += phase * (tensor[alpha][beta] * scale);
                    }
                }
            }
        }

        let mut matrix = hermitian_part(&matrix);
        if let (Some(nac), Some(direction)) = (record.nac(), request.direction) {
            if vector::norm(&request.q) < GAMMA_TOLERANCE {
                if let Some(direction) = vector::normalized(&direction) {
                    let screening = vector::dot(&direction, &vector::mat_vec(&nac.dielectric, &direction));
                    if screening.abs() > f64::EPSILON {
                        let volume = record.primitive().volume();
                        let prefactor = 4.0 * PI * nac.factor / volume / screening;
                        let charges: Vec<Vec3> = nac
                            .born
                            .iter()
                            .map(|born| vector::vec_mat(&direction, born))
                            .collect();
                        for i in 0..n {
                            for j in 0..n {
                                let scale = prefactor / (masses[i] * masses[j]).sqrt();
                                for alpha in 0..3 {
                                    for beta in 0..3 {
                                        matrix[(3 * i + alpha, 3 * j + beta)] +=
                                            Complex64::new(charges[i][alpha] * charges[j][beta] * scale, 0.0);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        matrix
    }

    pub fn solve(&self, request: &ModeRequest) -> VibroResult<QModes> {
        let eigen = eigh(&self.dynamical_matrix(request))?;
        let energies = eigen.values.iter().map(|&value| eigenvalue_to_mev(value)).collect();
        let eigenvectors = (0..eigen.dimension()).map(|branch| eigen.vector(branch)).collect();
        Ok(QModes {
            q: request.q,
            energies,
            eigenvectors: Some(eigenvectors),
        })
    }

    /// Solves every request, splitting the list across `n_threads` scoped workers.
    pub fn solve_all(&self, requests: &[ModeRequest], n_threads: usize) -> VibroResult<Vec<QModes>> {
        let workers = n_threads.clamp(1, requests.len().max(1));
        if workers == 1 {
            return requests.iter().map(|request| self.solve(request)).collect();
        }
        let chunk = requests.len().div_ceil(workers);
        let batches: Vec<VibroResult<Vec<QModes>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .chunks(chunk)
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .iter()
                            .map(|request| self.solve(request))
                            .collect::<VibroResult<Vec<_>>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(VibroError::kernel_internal("mode worker panicked")))
                })
                .collect()
        });
        let mut modes = Vec::with_capacity(requests.len());
        for batch in batches {
            modes.extend(batch?);
        }
        Ok(modes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::EIGENVALUE_TO_MEV;
    use crate::domain::{Periodicity, Site};
    use crate::numerics::vector::Mat3;
    use crate::phonopy::SupercellMap;

    fn diagonal(value: f64) -> Mat3 {
        [[value, 0.0, 0.0], [0.0, value, 0.0], [0.0, 0.0, value]]
    }

    fn monatomic_chain(spring: f64) -> ForceConstantsRecord {
        let primitive = Structure::new(
            [[2.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec![Site::new("C", [0.0; 3])],
            Periodicity::Chain,
        )
        .expect("chain should be valid");
        let supercell = SupercellMap::build(&primitive, [3, 1, 1]).expect("supercell should build");
        let force_constants = vec![vec![diagonal(2.0 * spring), diagonal(-spring), diagonal(-spring)]];
        ForceConstantsRecord::new(primitive, vec![12.0], vec![6.646], supercell, force_constants, None)
            .expect("record should be valid")
    }

    #[test]
    fn acoustic_modes_vanish_at_gamma() {
        let record = monatomic_chain(5.0);
        let solver = ModeSolver::new(&record);
        let modes = solver.solve(&ModeRequest::at([0.0; 3])).expect("gamma should solve");
        assert!(modes.energies.iter().all(|energy| energy.abs() < 1.0e-6));
    }

    #[test]
    fn zone_boundary_matches_analytic_chain() {
        let record = monatomic_chain(5.0);
        let solver = ModeSolver::new(&record);
        let modes = solver
            .solve_all(&[ModeRequest::at([0.5, 0.0, 0.0]), ModeRequest::at([0.25, 0.0, 0.0])], 2)
            .expect("modes should solve");
        let expected = (20.0_f64 / 12.0).sqrt() * EIGENVALUE_TO_MEV;
        for energy in &modes[0].energies {
            assert!((energy - expected).abs() < 1.0e-8, "energy {energy}");
        }
        let quarter = (10.0_f64 / 12.0).sqrt() * EIGENVALUE_TO_MEV;
        assert!((modes[1].energies[0] - quarter).abs() < 1.0e-8);
    }

    #[test]
    fn precomputed_modes_check_branch_count() {
        let structure = monatomic_chain(1.0).primitive().clone();
        let modes = vec![QModes {
            q: [0.0; 3],
            energies: vec![0.0, 1.0],
            eigenvectors: None,
        }];
        assert!(PrecomputedModes::new(structure, vec![12.0], vec![6.6], modes).is_err());
    }

    #[test]
    fn deserialised_modes_are_validated() {
        let structure = monatomic_chain(1.0).primitive().clone();
        let modes = vec![QModes {
            q: [0.25, 0.0, 0.0],
            energies: vec![1.0, 1.0, 1.0],
            eigenvectors: None,
        }];
        let valid = PrecomputedModes::new(structure, vec![12.0], vec![6.6], modes).expect("modes should be valid");
        let mut tree = serde_json::to_value(&valid).expect("modes should serialise");
        let reread: PrecomputedModes = serde_json::from_value(tree.clone()).expect("valid modes read back");
        assert_eq!(reread, valid);

        tree["modes"] = serde_json::json!([]);
        let error = serde_json::from_value::<PrecomputedModes>(tree).expect_err("empty mode set");
        assert!(error.to_string().contains("empty"), "{error}");
    }
}
