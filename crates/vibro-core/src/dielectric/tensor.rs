use crate::numerics::vector::{self, Mat3};
use serde::{Deserialize, Serialize};

pub const ZERO_ABSOLUTE_TOLERANCE: f64 = 1.0e-8;
pub const ZERO_RELATIVE_TOLERANCE: f64 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensorCell {
    pub value: f64,
    /// Set when the entry vanishes within tolerance, as a symmetry zero would.
    pub zero_by_symmetry: bool,
}

/// A 3×3 tensor laid out for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorPanel {
    pub rows: [[TensorCell; 3]; 3],
}

impl TensorPanel {
    pub fn from_matrix(matrix: &Mat3) -> Self {
        Self::with_reference(matrix, vector::max_abs(matrix))
    }

    /// Panels of a rank-3 tensor, flagged against the maximum of the whole stack.
    pub fn from_stack(stack: &[Mat3; 3]) -> Vec<Self> {
        let reference = stack.iter().map(vector::max_abs).fold(0.0, f64::max);
        stack
            .iter()
            .map(|matrix| Self::with_reference(matrix, reference))
            .collect()
    }

    fn with_reference(matrix: &Mat3, reference: f64) -> Self {
        Self {
            rows: matrix.map(|row| {
                row.map(|value| TensorCell {
                    value,
                    zero_by_symmetry: is_symmetry_zero(value, reference),
                })
            }),
        }
    }
}

pub fn is_symmetry_zero(value: f64, reference: f64) -> bool {
    let magnitude = value.abs();
    magnitude < ZERO_ABSOLUTE_TOLERANCE || magnitude < ZERO_RELATIVE_TOLERANCE * reference
}
