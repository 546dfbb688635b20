use super::supercell::SupercellMap;
use crate::domain::{VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3, Vec3, ZERO_MAT3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One displaced supercell: 0-based atom index, Cartesian displacement (Å)
/// and, once computed, the forces on every supercell atom (eV/Å).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementRecord {
    pub atom: usize,
    pub displacement: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forces: Option<Vec<Vec3>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplacementDataset {
    pub records: Vec<DisplacementRecord>,
    /// Forces of the undisplaced supercell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_forces: Option<Vec<Vec3>>,
}

impl DisplacementDataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_forces(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(|record| record.forces.is_some())
    }
}

/// Least-squares force constants from finite displacements.
///
/// Each primitive atom needs displacements spanning all three directions;
/// no symmetry expansion is attempted.
pub fn produce_force_constants(
    supercell: &SupercellMap,
    dataset: &DisplacementDataset,
    subtract_residual_forces: bool,
) -> VibroResult<Vec<Vec<Mat3>>> {
    let n_super = supercell.num_atoms();
    let reference = match (&dataset.reference_forces, subtract_residual_forces) {
        (Some(forces), true) => {
            if forces.len() != n_super {
                return Err(VibroError::bad_phonopy_input(format!(
                    "reference forces cover {} atoms, supercell has {n_super}",
                    forces.len()
                )));
            }
            Some(forces.as_slice())
        }
        (None, true) => {
            return Err(VibroError::bad_phonopy_input(
                "residual-force subtraction requested without reference forces",
            ));
        }
        (_, false) => None,
    };

    let mut force_constants = Vec::with_capacity(supercell.p2s.len());
    for &image in &supercell.p2s {
        let records: Vec<&DisplacementRecord> = dataset
            .records
            .iter()
            .filter(|record| record.atom == image)
            .collect();
        if records.is_empty() {
            return Err(VibroError::bad_phonopy_input(format!(
                "no displacements of supercell atom {}",
                image + 1
            )));
        }

        let length = records
            .iter()
            .map(|record| vector::norm(&record.displacement))
            .fold(0.0_f64, f64::max);
        let mut normal = ZERO_MAT3;
        for record in &records {
            let d = vector::scale(&record.displacement, 1.0 / length);
            for row in 0..3 {
                for col in 0..3 {
                    normal[row][col] += d[row] * d[col];
                }
            }
        }
        let normal_inverse = vector::inverse(&normal).ok_or_else(|| {
            VibroError::bad_phonopy_input(format!(
                "displacements of supercell atom {} do not span three directions",
                image + 1
            ))
        })?;

        let mut row = vec![ZERO_MAT3; n_super];
        for record in &records {
            let forces = record.forces.as_deref().ok_or_else(|| {
                VibroError::bad_phonopy_input(format!(
                    "displacement of supercell atom {} has no forces",
                    record.atom + 1
                ))
            })?;
            if forces.len() != n_super {
                return Err(VibroError::bad_phonopy_input(format!(
                    "force set has {} atoms, supercell has {n_super}",
                    forces.len()
                )));
            }
            let d = vector::scale(&record.displacement, 1.0 / length);
            for (partner, force) in forces.iter().enumerate() {
                let force = match reference {
                    Some(reference) => vector::sub(force, &reference[partner]),
                    None => *force,
                };
                for alpha in 0..3 {
                    for beta in 0..3 {
                        row[partner][alpha][beta] += d[alpha] * force[beta] / length;
                    }
                }
            }
        }
        for tensor in row.iter_mut() {
            *tensor = vector::mat_scale(&vector::mat_mul(&normal_inverse, tensor), -1.0);
        }
        debug!(
            atom = image + 1,
            displacements = records.len(),
            "solved force-constant row"
        );
        force_constants.push(row);
    }
    Ok(force_constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, Periodicity, Site, Structure};

    fn chain_supercell() -> SupercellMap {
        let primitive = Structure::new(
            [[2.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec![Site::new("C", [0.0; 3])],
            Periodicity::Chain,
        )
        .expect("chain should be valid");
        SupercellMap::build(&primitive, [3, 1, 1]).expect("supercell should build")
    }

    /// Harmonic chain with nearest-neighbour springs `k` along x and `t` transverse.
    fn harmonic_forces(axis: usize, amount: f64, k: f64, t: f64) -> Vec<Vec3> {
        let stiffness = if axis == 0 { k } else { t };
        let mut forces = vec![[0.0; 3]; 3];
        forces[0][axis] = -2.0 * stiffness * amount;
        forces[1][axis] = stiffness * amount;
        forces[2][axis] = stiffness * amount;
        forces
    }

    #[test]
    fn recovers_nearest_neighbour_springs() {
        let supercell = chain_supercell();
        let records = (0..3)
            .map(|axis| {
                let mut displacement = [0.0; 3];
                displacement[axis] = 0.01;
                DisplacementRecord {
                    atom: 0,
                    displacement,
                    forces: Some(harmonic_forces(axis, 0.01, 5.0, 1.0)),
                }
            })
            .collect();
        let dataset = DisplacementDataset {
            records,
            reference_forces: None,
        };
        let fc = produce_force_constants(&supercell, &dataset, false).expect("fc should solve");
        assert!((fc[0][0][0][0] - 10.0).abs() < 1.0e-9);
        assert!((fc[0][1][0][0] + 5.0).abs() < 1.0e-9);
        assert!((fc[0][2][1][1] + 1.0).abs() < 1.0e-9);
        assert!(fc[0][1][0][1].abs() < 1.0e-12);
    }

    #[test]
    fn residual_forces_are_removed() {
        let supercell = chain_supercell();
        let residual = vec![[0.0, 0.0, 0.3]; 3];
        let records = (0..3)
            .map(|axis| {
                let mut displacement = [0.0; 3];
                displacement[axis] = 0.02;
                let forces = harmonic_forces(axis, 0.02, 5.0, 1.0)
                    .iter()
                    .zip(&residual)
                    .map(|(force, offset)| vector::add(force, offset))
                    .collect();
                DisplacementRecord {
                    atom: 0,
                    displacement,
                    forces: Some(forces),
                }
            })
            .collect();
        let dataset = DisplacementDataset {
            records,
            reference_forces: Some(residual),
        };
        let fc = produce_force_constants(&supercell, &dataset, true).expect("fc should solve");
        assert!(fc[0][0][0][2].abs() < 1.0e-9);
        assert!((fc[0][0][2][2] - 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn collinear_displacements_are_rejected() {
        let supercell = chain_supercell();
        let dataset = DisplacementDataset {
            records: vec![DisplacementRecord {
                atom: 0,
                displacement: [0.01, 0.0, 0.0],
                forces: Some(vec![[0.0; 3]; 3]),
            }],
            reference_forces: None,
        };
        let error = produce_force_constants(&supercell, &dataset, false).expect_err("rank deficient");
        assert_eq!(error.kind(), ErrorKind::BadPhonopyInput);
    }
}
