//! Fixed-size 3-vector and 3x3 matrix helpers.
//!
//! Matrices are row-major `[[f64; 3]; 3]`; lattice matrices store one lattice
//! vector per row.

pub type Vec3 = [f64; 3];
pub type Mat3 = [[f64; 3]; 3];

pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
pub const ZERO_MAT3: Mat3 = [[0.0; 3]; 3];

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: &Vec3, factor: f64) -> Vec3 {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

/// Returns `None` for a zero vector.
pub fn normalized(a: &Vec3) -> Option<Vec3> {
    let length = norm(a);
    (length > 0.0 && length.is_finite()).then(|| scale(a, 1.0 / length))
}

pub fn is_finite(a: &Vec3) -> bool {
    a.iter().all(|value| value.is_finite())
}

pub fn mat_vec(m: &Mat3, v: &Vec3) -> Vec3 {
    [dot(&m[0], v), dot(&m[1], v), dot(&m[2], v)]
}

/// Row vector times matrix: `v^T M`.
pub fn vec_mat(v: &Vec3, m: &Mat3) -> Vec3 {
    let mut out = [0.0; 3];
    for (row, coefficient) in m.iter().zip(v.iter()) {
        for col in 0..3 {
            out[col] += coefficient * row[col];
        }
    }
    out
}

pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = ZERO_MAT3;
    for row in 0..3 {
        for col in 0..3 {
            out[row][col] = (0..3).map(|k| a[row][k] * b[k][col]).sum();
        }
    }
    out
}

pub fn transpose(m: &Mat3) -> Mat3 {
    let mut out = ZERO_MAT3;
    for row in 0..3 {
        for col in 0..3 {
            out[row][col] = m[col][row];
        }
    }
    out
}

pub fn determinant(m: &Mat3) -> f64 {
    dot(&m[0], &cross(&m[1], &m[2]))
}

pub fn inverse(m: &Mat3) -> Option<Mat3> {
    let det = determinant(m);
    if det.abs() < 1.0e-12 || !det.is_finite() {
        return None;
    }
    let c0 = cross(&m[1], &m[2]);
    let c1 = cross(&m[2], &m[0]);
    let c2 = cross(&m[0], &m[1]);
    // columns of the inverse are the cofactor rows divided by det
    let mut out = ZERO_MAT3;
    for row in 0..3 {
        out[row][0] = c0[row] / det;
        out[row][1] = c1[row] / det;
        out[row][2] = c2[row] / det;
    }
    Some(out)
}

pub fn mat_add(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = ZERO_MAT3;
    for row in 0..3 {
        for col in 0..3 {
            out[row][col] = a[row][col] + b[row][col];
        }
    }
    out
}

pub fn mat_scale(a: &Mat3, factor: f64) -> Mat3 {
    let mut out = *a;
    for row in out.iter_mut() {
        for value in row.iter_mut() {
            *value *= factor;
        }
    }
    out
}

pub fn symmetrized(a: &Mat3) -> Mat3 {
    mat_scale(&mat_add(a, &transpose(a)), 0.5)
}

pub fn max_abs(a: &Mat3) -> f64 {
    a.iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, value| acc.max(value.abs()))
}

/// Evenly spaced values including both ends; a single point sits at the midpoint.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.5 * (start + end)],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|index| start + step * index as f64).collect()
        }
    }
}

/// Bin edges around ordered sample positions.
///
/// Interior edges sit at midpoints; the outer edges mirror the neighbouring
/// half-gap, or use `fallback_width` when there is a single sample.
pub fn edges_around(centres: &[f64], fallback_width: f64) -> Vec<f64> {
    match centres.len() {
        0 => Vec::new(),
        1 => vec![
            centres[0] - 0.5 * fallback_width,
            centres[0] + 0.5 * fallback_width,
        ],
        count => {
            let mut edges = Vec::with_capacity(count + 1);
            edges.push(centres[0] - 0.5 * (centres[1] - centres[0]));
            for pair in centres.windows(2) {
                edges.push(0.5 * (pair[0] + pair[1]));
            }
            edges.push(centres[count - 1] + 0.5 * (centres[count - 1] - centres[count - 2]));
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_recovers_identity() {
        let m = [[2.0, 0.5, 0.0], [0.1, 3.0, 0.2], [0.0, -0.4, 1.5]];
        let inv = inverse(&m).expect("matrix should be invertible");
        let product = mat_mul(&m, &inv);
        for row in 0..3 {
            for col in 0..3 {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert!((product[row][col] - expected).abs() < 1.0e-12);
            }
        }
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]];
        assert!(inverse(&m).is_none());
    }

    #[test]
    fn edges_bracket_samples() {
        let edges = edges_around(&[0.0, 1.0, 3.0], 1.0);
        assert_eq!(edges, vec![-0.5, 0.5, 2.0, 4.0]);
        assert_eq!(edges_around(&[2.0], 0.5), vec![1.75, 2.25]);
    }

    #[test]
    fn linspace_single_point_is_midpoint() {
        assert_eq!(linspace(-1.0, 1.0, 1), vec![0.0]);
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
    }
}
