use super::errors::{VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

/// Periodic-boundary signature; only the four physically meaningful patterns exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[bool; 3]", into = "[bool; 3]")]
pub enum Periodicity {
    Bulk,
    Sheet,
    Chain,
    Molecule,
}

impl Periodicity {
    pub const fn flags(self) -> [bool; 3] {
        match self {
            Self::Bulk => [true, true, true],
            Self::Sheet => [true, true, false],
            Self::Chain => [true, false, false],
            Self::Molecule => [false, false, false],
        }
    }

    pub fn from_flags(flags: [bool; 3]) -> VibroResult<Self> {
        match flags {
            [true, true, true] => Ok(Self::Bulk),
            [true, true, false] => Ok(Self::Sheet),
            [true, false, false] => Ok(Self::Chain),
            [false, false, false] => Ok(Self::Molecule),
            other => Err(VibroError::invalid_input(format!(
                "unsupported periodicity {other:?}; expected (T,T,T), (T,T,F), (T,F,F) or (F,F,F)"
            ))),
        }
    }

    pub const fn is_periodic(self, axis: usize) -> bool {
        axis < 3 && self.flags()[axis]
    }

    pub const fn dimensionality(self) -> usize {
        match self {
            Self::Bulk => 3,
            Self::Sheet => 2,
            Self::Chain => 1,
            Self::Molecule => 0,
        }
    }
}

impl TryFrom<[bool; 3]> for Periodicity {
    type Error = VibroError;

    fn try_from(flags: [bool; 3]) -> Result<Self, Self::Error> {
        Self::from_flags(flags)
    }
}

impl From<Periodicity> for [bool; 3] {
    fn from(periodicity: Periodicity) -> Self {
        periodicity.flags()
    }
}

impl Display for Periodicity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c] = self.flags().map(|flag| if flag { 'T' } else { 'F' });
        write!(f, "({a},{b},{c})")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub symbol: String,
    /// Fractional coordinates.
    pub position: Vec3,
}

impl Site {
    pub fn new(symbol: impl Into<String>, position: Vec3) -> Self {
        Self {
            symbol: symbol.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawStructure {
    cell: Mat3,
    sites: Vec<Site>,
    pbc: Periodicity,
}

/// Immutable crystal record. Rows of `cell` are lattice vectors in Å.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStructure", into = "RawStructure")]
pub struct Structure {
    cell: Mat3,
    sites: Vec<Site>,
    periodicity: Periodicity,
}

impl Structure {
    pub fn new(cell: Mat3, sites: Vec<Site>, periodicity: Periodicity) -> VibroResult<Self> {
        if cell.iter().any(|row| !vector::is_finite(row)) {
            return Err(VibroError::invalid_input("cell contains non-finite entries"));
        }
        if vector::determinant(&cell).abs() < 1.0e-8 {
            return Err(VibroError::invalid_input(
                "cell vectors are linearly dependent",
            ));
        }
        if sites.is_empty() {
            return Err(VibroError::invalid_input("structure has no sites"));
        }
        if let Some(site) = sites.iter().find(|site| !vector::is_finite(&site.position)) {
            return Err(VibroError::invalid_input(format!(
                "site {} has non-finite coordinates",
                site.symbol
            )));
        }
        Ok(Self {
            cell,
            sites,
            periodicity,
        })
    }

    pub fn cell(&self) -> &Mat3 {
        &self.cell
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.sites.iter().map(|site| site.symbol.clone()).collect()
    }

    pub fn lattice_lengths(&self) -> Vec3 {
        self.cell.map(|row| vector::norm(&row))
    }

    pub fn volume(&self) -> f64 {
        vector::determinant(&self.cell).abs()
    }

    /// Reciprocal vectors as rows, including the 2π factor.
    pub fn reciprocal_lattice(&self) -> Mat3 {
        reciprocal_lattice(&self.cell)
    }

    pub fn cartesian_positions(&self) -> Vec<Vec3> {
        self.sites
            .iter()
            .map(|site| vector::vec_mat(&site.position, &self.cell))
            .collect()
    }

    /// Returns a copy with another periodicity signature.
    pub fn with_periodicity(&self, periodicity: Periodicity) -> Self {
        Self {
            periodicity,
            ..self.clone()
        }
    }
}

impl TryFrom<RawStructure> for Structure {
    type Error = VibroError;

    fn try_from(raw: RawStructure) -> Result<Self, Self::Error> {
        Self::new(raw.cell, raw.sites, raw.pbc)
    }
}

impl From<Structure> for RawStructure {
    fn from(structure: Structure) -> Self {
        Self {
            cell: structure.cell,
            sites: structure.sites,
            pbc: structure.periodicity,
        }
    }
}

pub fn reciprocal_lattice(cell: &Mat3) -> Mat3 {
    match vector::inverse(cell) {
        Some(inverse) => vector::mat_scale(&vector::transpose(&inverse), 2.0 * PI),
        None => vector::ZERO_MAT3,
    }
}

/// Cartesian wavevector (Å⁻¹) for fractional reciprocal coordinates.
pub fn fractional_to_cartesian_q(q: &Vec3, reciprocal: &Mat3) -> Vec3 {
    vector::vec_mat(q, reciprocal)
}

/// Fractional reciprocal coordinates for a Cartesian wavevector.
pub fn cartesian_to_fractional_q(q: &Vec3, cell: &Mat3) -> Vec3 {
    vector::scale(&vector::mat_vec(cell, q), 1.0 / (2.0 * PI))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn cubic(a: f64) -> Structure {
        Structure::new(
            [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]],
            vec![Site::new("Si", [0.0, 0.0, 0.0])],
            Periodicity::Bulk,
        )
        .expect("cubic cell should be valid")
    }

    #[test]
    fn rejects_unsupported_periodicity() {
        let error = Periodicity::from_flags([false, true, false]).expect_err("(F,T,F) is invalid");
        assert_eq!(error.kind(), crate::domain::ErrorKind::InvalidInput);
    }

    #[test]
    fn reciprocal_lattice_is_dual_to_cell() {
        let structure = Structure::new(
            [[3.0, 0.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.5, 4.0]],
            vec![Site::new("C", [0.0, 0.0, 0.0])],
            Periodicity::Bulk,
        )
        .expect("structure should be valid");
        let reciprocal = structure.reciprocal_lattice();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 2.0 * PI } else { 0.0 };
                let value = vector::dot(&structure.cell()[i], &reciprocal[j]);
                assert!((value - expected).abs() < 1.0e-12);
            }
        }
    }

    #[test]
    fn wavevector_conversions_invert_each_other() {
        let structure = cubic(5.0);
        let q = [0.25, -0.5, 0.1];
        let cart = fractional_to_cartesian_q(&q, &structure.reciprocal_lattice());
        let back = cartesian_to_fractional_q(&cart, structure.cell());
        for axis in 0..3 {
            assert!((back[axis] - q[axis]).abs() < 1.0e-12);
        }
    }

    #[test]
    fn serde_uses_pbc_flags() {
        let json = serde_json::to_value(cubic(4.0)).expect("structure should serialise");
        assert_eq!(json["pbc"], serde_json::json!([true, true, true]));
        let bad = serde_json::json!({
            "cell": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            "sites": [{"symbol": "H", "position": [0.0, 0.0, 0.0]}],
            "pbc": [false, false, true]
        });
        assert!(serde_json::from_value::<Structure>(bad).is_err());
    }
}
