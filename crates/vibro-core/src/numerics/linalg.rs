use super::DenseComplexMatrix;
use num_complex::Complex64;

const MAX_SWEEPS: usize = 100;
const HERMITIAN_RELATIVE_TOLERANCE: f64 = 1.0e-8;
const CONVERGENCE_RELATIVE_TOLERANCE: f64 = 1.0e-26;
const NEGLIGIBLE_ELEMENT: f64 = 1.0e-300;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EigenError {
    #[error("eigen decomposition requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("eigen decomposition requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix entry ({row}, {col}) is not finite")]
    NonFiniteEntry { row: usize, col: usize },
    #[error("matrix is not Hermitian at ({row}, {col}), deviation {deviation:e}")]
    NonHermitian {
        row: usize,
        col: usize,
        deviation: f64,
    },
    #[error("Jacobi iteration did not converge after {sweeps} sweeps")]
    NotConverged { sweeps: usize },
}

/// Eigenpairs of a Hermitian matrix, eigenvalues ascending.
///
/// Column `n` of `vectors` is the normalised eigenvector of `values[n]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HermitianEigen {
    pub values: Vec<f64>,
    pub vectors: DenseComplexMatrix,
}

impl HermitianEigen {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn vector(&self, index: usize) -> Vec<Complex64> {
        (0..self.vectors.nrows())
            .map(|row| self.vectors[(row, index)])
            .collect()
    }
}

/// Averages `A` with its conjugate transpose.
pub fn hermitian_part(matrix: &DenseComplexMatrix) -> DenseComplexMatrix {
    let dimension = matrix.nrows();
    let mut out = DenseComplexMatrix::zeros(dimension, dimension);
    for row in 0..dimension {
        for col in 0..dimension {
            out[(row, col)] = (matrix[(row, col)] + matrix[(col, row)].conj()) * 0.5;
        }
    }
    out
}

/// Cyclic complex Jacobi diagonalisation of a Hermitian matrix.
pub fn eigh(matrix: &DenseComplexMatrix) -> Result<HermitianEigen, EigenError> {
    let dimension = validate_hermitian(matrix)?;
    let mut a = matrix.clone();
    let mut v = DenseComplexMatrix::zeros(dimension, dimension);
    for index in 0..dimension {
        v[(index, index)] = Complex64::new(1.0, 0.0);
    }

    let scale = frobenius_norm_sq(&a).max(NEGLIGIBLE_ELEMENT);
    let mut converged = dimension == 1;
    for _sweep in 0..MAX_SWEEPS {
        if off_diagonal_norm_sq(&a) <= CONVERGENCE_RELATIVE_TOLERANCE * scale {
            converged = true;
            break;
        }
        for p in 0..dimension {
            for q in (p + 1)..dimension {
                rotate(&mut a, &mut v, p, q);
            }
        }
    }
    if !converged && off_diagonal_norm_sq(&a) > CONVERGENCE_RELATIVE_TOLERANCE * scale {
        return Err(EigenError::NotConverged { sweeps: MAX_SWEEPS });
    }

    let mut order: Vec<usize> = (0..dimension).collect();
    order.sort_by(|&left, &right| a[(left, left)].re.total_cmp(&a[(right, right)].re));

    let values = order.iter().map(|&index| a[(index, index)].re).collect();
    let mut vectors = DenseComplexMatrix::zeros(dimension, dimension);
    for (target, &source) in order.iter().enumerate() {
        for row in 0..dimension {
            vectors[(row, target)] = v[(row, source)];
        }
    }

    Ok(HermitianEigen { values, vectors })
}

fn rotate(a: &mut DenseComplexMatrix, v: &mut DenseComplexMatrix, p: usize, q: usize) {
    let apq = a[(p, q)];
    let magnitude = apq.norm();
    if magnitude < NEGLIGIBLE_ELEMENT {
        return;
    }

    // A phase on column q makes a_pq real, then a real Jacobi rotation zeroes it.
    let phase = apq / magnitude;
    let phase_conj = phase.conj();
    let app = a[(p, p)].re;
    let aqq = a[(q, q)].re;
    let theta = (aqq - app) / (2.0 * magnitude);
    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
    let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    let dimension = a.nrows();
    // A <- A U with U_pp = c, U_pq = s, U_qp = -s e^{-i phi}, U_qq = c e^{-i phi}
    for k in 0..dimension {
        let akp = a[(k, p)];
        let akq = a[(k, q)];
        a[(k, p)] = akp * c - akq * phase_conj * s;
        a[(k, q)] = akp * s + akq * phase_conj * c;
    }
    // A <- U^H A
    for k in 0..dimension {
        let apk = a[(p, k)];
        let aqk = a[(q, k)];
        a[(p, k)] = apk * c - aqk * phase * s;
        a[(q, k)] = apk * s + aqk * phase * c;
    }
    a[(p, q)] = Complex64::new(0.0, 0.0);
    a[(q, p)] = Complex64::new(0.0, 0.0);
    a[(p, p)] = Complex64::new(a[(p, p)].re, 0.0);
    a[(q, q)] = Complex64::new(a[(q, q)].re, 0.0);

    for k in 0..dimension {
        let vkp = v[(k, p)];
        let vkq = v[(k, q)];
        v[(k, p)] = vkp * c - vkq * phase_conj * s;
        v[(k, q)] = vkp * s + vkq * phase_conj * c;
    }
}

fn validate_hermitian(matrix: &DenseComplexMatrix) -> Result<usize, EigenError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows != cols {
        return Err(EigenError::NonSquareMatrix { rows, cols });
    }
    if rows == 0 {
        return Err(EigenError::EmptyMatrix);
    }

    let mut largest = 0.0_f64;
    for row in 0..rows {
        for col in 0..cols {
            let value = matrix[(row, col)];
            if !value.re.is_finite() || !value.im.is_finite() {
                return Err(EigenError::NonFiniteEntry { row, col });
            }
            largest = largest.max(value.norm());
        }
    }

    let tolerance = HERMITIAN_RELATIVE_TOLERANCE * largest.max(1.0);
    for row in 0..rows {
        for col in row..cols {
            let deviation = (matrix[(row, col)] - matrix[(col, row)].conj()).norm();
            if deviation > tolerance {
                return Err(EigenError::NonHermitian {
                    row,
                    col,
                    deviation,
                });
            }
        }
    }
    Ok(rows)
}

fn frobenius_norm_sq(matrix: &DenseComplexMatrix) -> f64 {
    let mut total = 0.0;
    for row in 0..matrix.nrows() {
        for col in 0..matrix.ncols() {
            total += matrix[(row, col)].norm_sqr();
        }
    }
    total
}

fn off_diagonal_norm_sq(matrix: &DenseComplexMatrix) -> f64 {
    let mut total = 0.0;
    for row in 0..matrix.nrows() {
        for col in 0..matrix.ncols() {
            if row != col {
                total += matrix[(row, col)].norm_sqr();
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn matrix_from_rows(rows: &[Vec<Complex64>]) -> DenseComplexMatrix {
        let n = rows.len();
        let mut m = DenseComplexMatrix::zeros(n, n);
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                m[(row, col)] = *value;
            }
        }
        m
    }

    #[test]
    fn diagonalises_real_symmetric_pair() {
        let m = matrix_from_rows(&[vec![c(2.0, 0.0), c(1.0, 0.0)], vec![c(1.0, 0.0), c(2.0, 0.0)]]);
        let eigen = eigh(&m).expect("real symmetric matrix should diagonalise");
        assert!((eigen.values[0] - 1.0).abs() < 1.0e-12);
        assert!((eigen.values[1] - 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn reconstructs_complex_hermitian_matrix() {
        let m = matrix_from_rows(&[
            vec![c(4.0, 0.0), c(1.0, 2.0), c(0.0, -1.0)],
            vec![c(1.0, -2.0), c(3.0, 0.0), c(0.5, 0.5)],
            vec![c(0.0, 1.0), c(0.5, -0.5), c(-1.0, 0.0)],
        ]);
        let eigen = eigh(&m).expect("hermitian matrix should diagonalise");

        for pair in eigen.values.windows(2) {
            assert!(pair[0] <= pair[1]);
        }

        for row in 0..3 {
            for col in 0..3 {
                let mut value = c(0.0, 0.0);
                for n in 0..3 {
                    value += eigen.vectors[(row, n)]
                        * eigen.values[n]
                        * eigen.vectors[(col, n)].conj();
                }
                assert!(
                    (value - m[(row, col)]).norm() < 1.0e-10,
                    "entry ({row}, {col}) reconstructed as {value}"
                );
            }
        }

        for left in 0..3 {
            for right in 0..3 {
                let overlap: Complex64 = (0..3)
                    .map(|row| eigen.vectors[(row, left)].conj() * eigen.vectors[(row, right)])
                    .sum();
                let expected = if left == right { 1.0 } else { 0.0 };
                assert!((overlap - c(expected, 0.0)).norm() < 1.0e-10);
            }
        }
    }

    #[test]
    fn rejects_non_hermitian_input() {
        let m = matrix_from_rows(&[vec![c(1.0, 0.0), c(2.0, 0.0)], vec![c(0.0, 0.0), c(1.0, 0.0)]]);
        assert!(matches!(eigh(&m), Err(EigenError::NonHermitian { .. })));
    }

    #[test]
    fn rejects_empty_input() {
        let m = DenseComplexMatrix::zeros(0, 0);
        assert_eq!(eigh(&m), Err(EigenError::EmptyMatrix));
    }
}
