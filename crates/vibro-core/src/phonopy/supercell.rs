use crate::domain::{Structure, VibroError, VibroResult};
use crate::numerics::vector::{self, Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Diagonal supercell of a primitive cell and its index tables.
///
/// Atoms are ordered primitive-atom major, so supercell atom `j` is an image
/// of primitive atom `s2p[j]` and `p2s[i]` is the image of atom `i` in the
/// origin cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupercellMap {
    pub matrix: [u32; 3],
    pub cell: Mat3,
    pub symbols: Vec<String>,
    /// Fractional coordinates in the supercell basis.
    pub positions: Vec<Vec3>,
    pub p2s: Vec<usize>,
    pub s2p: Vec<usize>,
}

impl SupercellMap {
    pub fn build(primitive: &Structure, matrix: [u32; 3]) -> VibroResult<Self> {
        if matrix.contains(&0) {
            return Err(VibroError::bad_phonopy_input(format!(
                "supercell matrix entries must be >= 1, got {matrix:?}"
            )));
        }
        let periodicity = primitive.periodicity();
        if let Some(axis) = (0..3).find(|&axis| !periodicity.is_periodic(axis) && matrix[axis] != 1) {
            return Err(VibroError::bad_phonopy_input(format!(
                "supercell must be 1 along non-periodic axis {axis}, got {matrix:?}"
            )));
        }

        let primitive_cell = primitive.cell();
        let mut cell = *primitive_cell;
        for axis in 0..3 {
            cell[axis] = vector::scale(&primitive_cell[axis], matrix[axis] as f64);
        }

        let cells = Self::cell_count_of(matrix);
        let mut symbols = Vec::with_capacity(primitive.num_sites() * cells);
        let mut positions = Vec::with_capacity(primitive.num_sites() * cells);
        let mut p2s = Vec::with_capacity(primitive.num_sites());
        let mut s2p = Vec::with_capacity(primitive.num_sites() * cells);
        for (atom, site) in primitive.sites().iter().enumerate() {
            p2s.push(positions.len());
            for a in 0..matrix[0] {
                for b in 0..matrix[1] {
                    for c in 0..matrix[2] {
                        let shift = [a as f64, b as f64, c as f64];
                        positions.push([
                            (site.position[0] + shift[0]) / matrix[0] as f64,
                            (site.position[1] + shift[1]) / matrix[1] as f64,
                            (site.position[2] + shift[2]) / matrix[2] as f64,
                        ]);
                        symbols.push(site.symbol.clone());
                        s2p.push(atom);
                    }
                }
            }
        }

        Ok(Self {
            matrix,
            cell,
            symbols,
            positions,
            p2s,
            s2p,
        })
    }

    fn cell_count_of(matrix: [u32; 3]) -> usize {
        matrix.iter().map(|&n| n as usize).product()
    }

    pub fn cell_count(&self) -> usize {
        Self::cell_count_of(self.matrix)
    }

    pub fn num_atoms(&self) -> usize {
        self.s2p.len()
    }

    pub fn cartesian_positions(&self) -> Vec<Vec3> {
        self.positions
            .iter()
            .map(|position| vector::vec_mat(position, &self.cell))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Periodicity, Site};

    #[test]
    fn index_tables_are_consistent() {
        let primitive = Structure::new(
            [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 10.0]],
            vec![Site::new("B", [0.0, 0.0, 0.5]), Site::new("N", [0.5, 0.5, 0.5])],
            Periodicity::Sheet,
        )
        .expect("sheet should be valid");
        let supercell = SupercellMap::build(&primitive, [2, 3, 1]).expect("supercell should build");
        assert_eq!(supercell.num_atoms(), 12);
        assert_eq!(supercell.p2s, vec![0, 6]);
        for (atom, &image) in supercell.p2s.iter().enumerate() {
            assert_eq!(supercell.s2p[image], atom);
        }
        assert_eq!(supercell.positions[6], [0.25, 0.5 / 3.0, 0.5]);
    }

    #[test]
    fn rejects_repeats_along_vacuum() {
        let primitive = Structure::new(
            [[2.0, 0.0, 0.0], [0.0, 9.0, 0.0], [0.0, 0.0, 9.0]],
            vec![Site::new("C", [0.0; 3])],
            Periodicity::Chain,
        )
        .expect("chain should be valid");
        assert!(SupercellMap::build(&primitive, [4, 2, 1]).is_err());
    }
}
