use super::qpath::{DEFAULT_Q_SPACING, QPath, QPoint};
use crate::domain::{Structure, VibroResult};
use crate::numerics::vector;

const LENGTH_TOLERANCE: f64 = 1.0e-3;
const COSINE_TOLERANCE: f64 = 1.0e-3;

/// Source of standard Brillouin-zone paths for 3-D cells.
pub trait BulkPathOracle {
    fn bulk_path(&self, structure: &Structure) -> VibroResult<QPath>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkLattice {
    Cubic,
    Tetragonal,
    Orthorhombic,
    Hexagonal,
    Other,
}

/// Built-in conventional-cell paths for the common Bravais families.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBulkPaths;

impl BulkPathOracle for StandardBulkPaths {
    fn bulk_path(&self, structure: &Structure) -> VibroResult<QPath> {
        let runs = standard_runs(identify_bulk_lattice(structure));
        QPath::through_runs(&runs, DEFAULT_Q_SPACING)
    }
}

pub fn identify_bulk_lattice(structure: &Structure) -> BulkLattice {
    let cell = structure.cell();
    let [a, b, c] = structure.lattice_lengths();
    let cos_alpha = vector::dot(&cell[1], &cell[2]) / (b * c);
    let cos_beta = vector::dot(&cell[0], &cell[2]) / (a * c);
    let cos_gamma = vector::dot(&cell[0], &cell[1]) / (a * b);

    let same = |x: f64, y: f64| (x - y).abs() <= LENGTH_TOLERANCE;
    let right = |cosine: f64| cosine.abs() <= COSINE_TOLERANCE;
    let all_right = right(cos_alpha) && right(cos_beta) && right(cos_gamma);

    if all_right && same(a, b) && same(b, c) {
        BulkLattice::Cubic
    } else if all_right && same(a, b) {
        BulkLattice::Tetragonal
    } else if all_right {
        BulkLattice::Orthorhombic
    } else if right(cos_alpha) && right(cos_beta) && same(a, b) && (cos_gamma + 0.5).abs() <= COSINE_TOLERANCE
    {
        BulkLattice::Hexagonal
    } else {
        BulkLattice::Other
    }
}

fn point(label: &str, coords: [f64; 3]) -> QPoint {
    QPoint::new(label, coords)
}

fn standard_runs(lattice: BulkLattice) -> Vec<Vec<QPoint>> {
    let g = QPoint::gamma;
    match lattice {
        BulkLattice::Cubic => {
            let x = point("X", [0.0, 0.5, 0.0]);
            let m = point("M", [0.5, 0.5, 0.0]);
            let r = point("R", [0.5, 0.5, 0.5]);
            vec![
                vec![g(), x.clone(), m.clone(), g(), r.clone(), x],
                vec![m, r],
            ]
        }
        BulkLattice::Tetragonal => {
            let x = point("X", [0.0, 0.5, 0.0]);
            let m = point("M", [0.5, 0.5, 0.0]);
            let z = point("Z", [0.0, 0.0, 0.5]);
            let r = point("R", [0.0, 0.5, 0.5]);
            let a = point("A", [0.5, 0.5, 0.5]);
            vec![
                vec![g(), x.clone(), m.clone(), g(), z.clone(), r.clone(), a.clone(), z],
                vec![x, r],
                vec![m, a],
            ]
        }
        BulkLattice::Orthorhombic => {
            let x = point("X", [0.5, 0.0, 0.0]);
            let y = point("Y", [0.0, 0.5, 0.0]);
            let z = point("Z", [0.0, 0.0, 0.5]);
            let s = point("S", [0.5, 0.5, 0.0]);
            let u = point("U", [0.5, 0.0, 0.5]);
            let t = point("T", [0.0, 0.5, 0.5]);
            let r = point("R", [0.5, 0.5, 0.5]);
            vec![
                vec![g(), x.clone(), s.clone(), y.clone(), g(), z.clone(), u.clone(), r.clone(), t.clone(), z],
                vec![y, t],
                vec![u, x],
                vec![s, r],
            ]
        }
        BulkLattice::Hexagonal => {
            let m = point("M", [0.5, 0.0, 0.0]);
            let k = point("K", [1.0 / 3.0, 1.0 / 3.0, 0.0]);
            let a = point("A", [0.0, 0.0, 0.5]);
            let l = point("L", [0.5, 0.0, 0.5]);
            let h = point("H", [1.0 / 3.0, 1.0 / 3.0, 0.5]);
            vec![
                vec![g(), m.clone(), k.clone(), g(), a.clone(), l.clone(), h.clone(), a],
                vec![l, m],
                vec![k, h],
            ]
        }
        BulkLattice::Other => vec![
            vec![point("X", [0.5, 0.0, 0.0]), g(), point("Y", [0.0, 0.5, 0.0])],
            vec![g(), point("Z", [0.0, 0.0, 0.5])],
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Periodicity, Site};

    fn bulk(cell: [[f64; 3]; 3]) -> Structure {
        Structure::new(cell, vec![Site::new("Si", [0.0; 3])], Periodicity::Bulk)
            .expect("structure should be valid")
    }

    #[test]
    fn identifies_common_families() {
        let cubic = bulk([[5.43, 0.0, 0.0], [0.0, 5.43, 0.0], [0.0, 0.0, 5.43]]);
        assert_eq!(identify_bulk_lattice(&cubic), BulkLattice::Cubic);
        let tetragonal = bulk([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 6.0]]);
        assert_eq!(identify_bulk_lattice(&tetragonal), BulkLattice::Tetragonal);
        let s3 = 3.0_f64.sqrt();
        let hexagonal = bulk([[3.0, 0.0, 0.0], [-1.5, 1.5 * s3, 0.0], [0.0, 0.0, 5.0]]);
        assert_eq!(identify_bulk_lattice(&hexagonal), BulkLattice::Hexagonal);
    }

    #[test]
    fn cubic_path_joins_runs_with_bar() {
        let cubic = bulk([[5.43, 0.0, 0.0], [0.0, 5.43, 0.0], [0.0, 0.0, 5.43]]);
        let path = StandardBulkPaths
            .bulk_path(&cubic)
            .expect("cubic path should build");
        assert_eq!(path.ticks(), vec!["Γ", "X", "M", "Γ", "R", "X|M", "R"]);
    }
}
