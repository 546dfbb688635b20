use super::supercell::SupercellMap;
use crate::common::constants::COULOMB_EV_ANGSTROM;
use crate::domain::{Structure, VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3, ZERO_MAT3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Post-processing switches carried over from the phonon calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhonopySettings {
    pub symmetrize_nac: bool,
    pub factor_nac: Option<f64>,
    pub subtract_residual_forces: bool,
}

impl Default for PhonopySettings {
    fn default() -> Self {
        Self {
            symmetrize_nac: true,
            factor_nac: None,
            subtract_residual_forces: false,
        }
    }
}

/// Born charges and dielectric tensor for the non-analytical term at Γ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NacParameters {
    /// `born[atom][field][displacement]`.
    pub born: Vec<Mat3>,
    pub dielectric: Mat3,
    /// e²/(4πε₀) in the force-constant unit system (eV·Å).
    #[serde(default = "default_nac_factor")]
    pub factor: f64,
}

fn default_nac_factor() -> f64 {
    COULOMB_EV_ANGSTROM
}

impl NacParameters {
    pub fn new(born: Vec<Mat3>, dielectric: Mat3) -> Self {
        Self {
            born,
            dielectric,
            factor: COULOMB_EV_ANGSTROM,
        }
    }

    /// Enforces charge neutrality of the Born charges and a symmetric dielectric tensor.
    pub fn symmetrized(&self) -> Self {
        let count = self.born.len().max(1) as f64;
        let mut mean = ZERO_MAT3;
        for charge in &self.born {
            mean = vector::mat_add(&mean, charge);
        }
        mean = vector::mat_scale(&mean, 1.0 / count);
        let born = self
            .born
            .iter()
            .map(|charge| vector::mat_add(charge, &vector::mat_scale(&mean, -1.0)))
            .collect();
        Self {
            born,
            dielectric: vector::symmetrized(&self.dielectric),
            factor: self.factor,
        }
    }

    pub fn validate(&self, atoms: usize) -> VibroResult<()> {
        if self.born.len() != atoms {
            return Err(VibroError::bad_phonopy_input(format!(
                "{} Born charges given for {atoms} atoms",
                self.born.len()
            )));
        }
        if !(self.factor.is_finite() && self.factor > 0.0) {
            return Err(VibroError::bad_phonopy_input(format!(
                "NAC factor must be positive, got {}",
                self.factor
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawForceConstantsRecord {
    primitive: Structure,
    masses: Vec<f64>,
    scattering_lengths: Vec<f64>,
    supercell: SupercellMap,
    force_constants: Vec<Vec<Mat3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nac: Option<NacParameters>,
}

/// Force constants of one phonon calculation, ready for the spectrum kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForceConstantsRecord", into = "RawForceConstantsRecord")]
pub struct ForceConstantsRecord {
    primitive: Structure,
    masses: Vec<f64>,
    scattering_lengths: Vec<f64>,
    supercell: SupercellMap,
    /// `force_constants[primitive atom][supercell atom]` in eV/Å².
    force_constants: Vec<Vec<Mat3>>,
    nac: Option<NacParameters>,
}

impl ForceConstantsRecord {
    pub fn new(
        primitive: Structure,
        masses: Vec<f64>,
        scattering_lengths: Vec<f64>,
        supercell: SupercellMap,
        force_constants: Vec<Vec<Mat3>>,
        nac: Option<NacParameters>,
    ) -> VibroResult<Self> {
        let n_prim = primitive.num_sites();
        if masses.len() != n_prim || scattering_lengths.len() != n_prim {
            return Err(VibroError::bad_phonopy_input(format!(
                "expected {n_prim} masses and scattering lengths, got {} and {}",
                masses.len(),
                scattering_lengths.len()
            )));
        }
        if let Some(mass) = masses.iter().find(|mass| !(mass.is_finite() && **mass > 0.0)) {
            return Err(VibroError::bad_phonopy_input(format!(
                "atomic masses must be positive, got {mass}"
            )));
        }
        if supercell.p2s.len() != n_prim {
            return Err(VibroError::corrupt_force_constants(format!(
                "supercell maps {} primitive atoms, structure has {n_prim}",
                supercell.p2s.len()
            )));
        }
        let n_super = supercell.num_atoms();
        if force_constants.len() != n_prim
            || force_constants.iter().any(|row| row.len() != n_super)
        {
            return Err(VibroError::corrupt_force_constants(format!(
                "force constants must have shape {n_prim}x{n_super}"
            )));
        }
        if force_constants
            .iter()
            .flatten()
            .flatten()
            .flatten()
            .any(|value| !value.is_finite())
        {
            return Err(VibroError::corrupt_force_constants(
                "force constants contain non-finite values",
            ));
        }
        if let Some(nac) = &nac {
            nac.validate(n_prim)?;
        }
        Ok(Self {
            primitive,
            masses,
            scattering_lengths,
            supercell,
            force_constants,
            nac,
        })
    }

    /// Reads a record from a JSON tree. Malformed trees are bad phonopy input;
    /// well-formed trees with inconsistent shapes keep the kind `new` reports.
    pub fn from_tree(tree: Value) -> VibroResult<Self> {
        let raw: RawForceConstantsRecord = serde_json::from_value(tree).map_err(|error| {
            VibroError::bad_phonopy_input(format!("tree does not hold force constants: {error}"))
        })?;
        Self::try_from(raw)
    }

    pub fn primitive(&self) -> &Structure {
        &self.primitive
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn scattering_lengths(&self) -> &[f64] {
        &self.scattering_lengths
    }

    pub fn supercell(&self) -> &SupercellMap {
        &self.supercell
    }

    pub fn force_constants(&self) -> &[Vec<Mat3>] {
        &self.force_constants
    }

    pub fn nac(&self) -> Option<&NacParameters> {
        self.nac.as_ref()
    }

    pub fn num_atoms(&self) -> usize {
        self.primitive.num_sites()
    }

    pub fn num_branches(&self) -> usize {
        3 * self.num_atoms()
    }
}

impl TryFrom<RawForceConstantsRecord> for ForceConstantsRecord {
    type Error = VibroError;

    fn try_from(raw: RawForceConstantsRecord) -> Result<Self, Self::Error> {
        Self::new(
            raw.primitive,
            raw.masses,
            raw.scattering_lengths,
            raw.supercell,
            raw.force_constants,
            raw.nac,
        )
    }
}

impl From<ForceConstantsRecord> for RawForceConstantsRecord {
    fn from(record: ForceConstantsRecord) -> Self {
        Self {
            primitive: record.primitive,
            masses: record.masses,
            scattering_lengths: record.scattering_lengths,
            supercell: record.supercell,
            force_constants: record.force_constants,
            nac: record.nac,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, Periodicity, Site};

    fn chain_record() -> ForceConstantsRecord {
        let primitive = Structure::new(
            [[2.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec![Site::new("C", [0.0; 3])],
            Periodicity::Chain,
        )
        .expect("chain should be valid");
        let supercell = SupercellMap::build(&primitive, [3, 1, 1]).expect("supercell should build");
        let spring = |k: f64| [[k, 0.0, 0.0], [0.0, k, 0.0], [0.0, 0.0, k]];
        ForceConstantsRecord::new(
            primitive,
            vec![12.0],
            vec![6.646],
            supercell,
            vec![vec![spring(10.0), spring(-5.0), spring(-5.0)]],
            None,
        )
        .expect("record should be valid")
    }

    #[test]
    fn trees_are_checked_like_constructed_records() {
        let record = chain_record();
        let tree = serde_json::to_value(&record).expect("record should serialise");
        assert_eq!(ForceConstantsRecord::from_tree(tree.clone()).expect("valid tree"), record);

        let mut truncated = tree.clone();
        truncated["force_constants"] = serde_json::json!([[]]);
        let error = ForceConstantsRecord::from_tree(truncated.clone()).expect_err("wrong shape");
        assert_eq!(error.kind(), ErrorKind::CorruptForceConstants);
        assert!(serde_json::from_value::<ForceConstantsRecord>(truncated).is_err());

        let error = ForceConstantsRecord::from_tree(serde_json::json!({"masses": [12.0]}))
            .expect_err("not a record");
        assert_eq!(error.kind(), ErrorKind::BadPhonopyInput);
    }

    #[test]
    fn symmetrized_nac_is_charge_neutral() {
        let z = |value: f64| [[value, 0.0, 0.0], [0.0, value, 0.0], [0.0, 0.0, value]];
        let nac = NacParameters::new(
            vec![z(2.1), z(-1.9)],
            [[10.0, 0.2, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 11.0]],
        )
        .symmetrized();
        for row in 0..3 {
            for col in 0..3 {
                let total = nac.born[0][row][col] + nac.born[1][row][col];
                assert!(total.abs() < 1.0e-12);
                assert_eq!(nac.dielectric[row][col], nac.dielectric[col][row]);
            }
        }
        assert!((nac.born[0][0][0] - 2.0).abs() < 1.0e-12);
    }
}
