use crate::domain::{Periodicity, Structure, VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const LATTICE_TOLERANCE: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeTag {
    #[serde(rename = "bulk3D")]
    Bulk3D,
    Hex,
    Square,
    Rect,
    #[serde(rename = "crect")]
    CRect,
    Oblique,
    #[serde(rename = "chain1D")]
    Chain1D,
    Molecule,
}

impl LatticeTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bulk3D => "bulk3D",
            Self::Hex => "hex",
            Self::Square => "square",
            Self::Rect => "rect",
            Self::CRect => "crect",
            Self::Oblique => "oblique",
            Self::Chain1D => "chain1D",
            Self::Molecule => "molecule",
        }
    }
}

impl Display for LatticeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// In-plane metric of a sheet: |a|, |b| and the angle between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarMetric {
    pub a: f64,
    pub b: f64,
    pub cos_gamma: f64,
}

impl PlanarMetric {
    pub fn from_cell(cell: &Mat3) -> VibroResult<Self> {
        let a = vector::norm(&cell[0]);
        let b = vector::norm(&cell[1]);
        if !(a > LATTICE_TOLERANCE && b > LATTICE_TOLERANCE) {
            return Err(VibroError::invalid_lattice_kind(format!(
                "in-plane lattice vectors are degenerate (|a|={a}, |b|={b})"
            )));
        }
        let cos_gamma = (vector::dot(&cell[0], &cell[1]) / (a * b)).clamp(-1.0, 1.0);
        if 1.0 - cos_gamma.abs() < LATTICE_TOLERANCE * LATTICE_TOLERANCE {
            return Err(VibroError::invalid_lattice_kind(
                "in-plane lattice vectors are collinear",
            ));
        }
        Ok(Self { a, b, cos_gamma })
    }

    pub fn gamma_degrees(&self) -> f64 {
        self.cos_gamma.acos().to_degrees()
    }

    pub fn sin_gamma_sq(&self) -> f64 {
        1.0 - self.cos_gamma * self.cos_gamma
    }
}

pub fn classify(structure: &Structure) -> VibroResult<LatticeTag> {
    match structure.periodicity() {
        Periodicity::Bulk => Ok(LatticeTag::Bulk3D),
        Periodicity::Chain => Ok(LatticeTag::Chain1D),
        Periodicity::Molecule => Ok(LatticeTag::Molecule),
        Periodicity::Sheet => classify_planar(&PlanarMetric::from_cell(structure.cell())?),
    }
}

/// Checks run in a fixed order and the first match wins; oblique is the fall-through.
pub fn classify_planar(metric: &PlanarMetric) -> VibroResult<LatticeTag> {
    if !(metric.a.is_finite() && metric.b.is_finite() && metric.cos_gamma.is_finite()) {
        return Err(VibroError::invalid_lattice_kind(
            "in-plane metric contains non-finite values",
        ));
    }
    let equal_lengths = (metric.a - metric.b).abs() <= LATTICE_TOLERANCE;
    let right_angle = metric.cos_gamma.abs() <= LATTICE_TOLERANCE;
    let hexagonal_angle = (metric.cos_gamma + 0.5).abs() <= LATTICE_TOLERANCE;
    let centred = (metric.b * metric.cos_gamma - 0.5 * metric.a).abs() <= LATTICE_TOLERANCE;

    let tag = if equal_lengths && hexagonal_angle {
        LatticeTag::Hex
    } else if equal_lengths && right_angle {
        LatticeTag::Square
    } else if right_angle {
        LatticeTag::Rect
    } else if centred {
        LatticeTag::CRect
    } else {
        LatticeTag::Oblique
    };
    Ok(tag)
}
