use super::vector::{Mat3, Vec3, norm};

/// Subdivisions per reciprocal axis for a target spacing (Å⁻¹).
///
/// Non-periodic axes always get a single division.
pub fn mesh_from_spacing(reciprocal: &Mat3, periodic: [bool; 3], spacing: f64) -> [u32; 3] {
    let mut mesh = [1u32; 3];
    for axis in 0..3 {
        if !periodic[axis] || !(spacing > 0.0) {
            continue;
        }
        let divisions = (norm(&reciprocal[axis]) / spacing).ceil();
        mesh[axis] = if divisions.is_finite() {
            (divisions as u32).max(1)
        } else {
            1
        };
    }
    mesh
}

/// Monkhorst–Pack points in fractional reciprocal coordinates.
pub fn monkhorst_pack(mesh: [u32; 3]) -> Vec<Vec3> {
    let [n1, n2, n3] = mesh.map(|n| n.max(1));
    let coordinate = |index: u32, n: u32| (2.0 * index as f64 - n as f64 + 1.0) / (2.0 * n as f64);
    let mut points = Vec::with_capacity((n1 * n2 * n3) as usize);
    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n3 {
                points.push([coordinate(i, n1), coordinate(j, n2), coordinate(k, n3)]);
            }
        }
    }
    points
}
