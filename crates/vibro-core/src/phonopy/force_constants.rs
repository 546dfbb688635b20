//! Phonopy's `FORCE_CONSTANTS` text layout.
//!
//! The header holds `n_rows n_cols` (compact, rows are the primitive atoms) or
//! a single `n` (full square matrix). Every block is a line with the two
//! 1-based supercell indices followed by three rows of the 3×3 tensor.

use crate::domain::{VibroError, VibroResult};
use crate::numerics::vector::{Mat3, ZERO_MAT3};
use std::fmt::Write as _;
use std::iter::Enumerate;
use std::str::Lines;

pub const FORCE_CONSTANTS_FILE: &str = "FORCE_CONSTANTS";

/// Writes compact force constants; `p2s` names the supercell index of each row.
pub fn write_force_constants(force_constants: &[Vec<Mat3>], p2s: &[usize]) -> String {
    let n_super = force_constants.first().map_or(0, Vec::len);
    let mut out = String::new();
    let _ = writeln!(out, "{:4} {:4}", force_constants.len(), n_super);
    for (row, &image) in force_constants.iter().zip(p2s) {
        for (col, tensor) in row.iter().enumerate() {
            let _ = writeln!(out, "{:4} {:4}", image + 1, col + 1);
            for line in tensor {
                let _ = writeln!(out, "{:22.15} {:22.15} {:22.15}", line[0], line[1], line[2]);
            }
        }
    }
    out
}

struct TokenLines<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl<'a> TokenLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    fn next_tokens(&mut self, what: &str) -> VibroResult<(usize, Vec<&'a str>)> {
        for (index, line) in self.lines.by_ref() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !tokens.is_empty() {
                return Ok((index + 1, tokens));
            }
        }
        Err(VibroError::corrupt_force_constants(format!(
            "unexpected end of file while reading {what}"
        )))
    }

    fn indices<const N: usize>(&mut self, what: &str) -> VibroResult<(usize, [usize; N])> {
        let (line, tokens) = self.next_tokens(what)?;
        if tokens.len() != N {
            return Err(VibroError::corrupt_force_constants(format!(
                "line {line}: expected {N} integers in {what}, found {}",
                tokens.len()
            )));
        }
        let mut values = [0usize; N];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = token.parse().map_err(|_| {
                VibroError::corrupt_force_constants(format!(
                    "line {line}: '{token}' is not an index in {what}"
                ))
            })?;
        }
        Ok((line, values))
    }

    fn tensor(&mut self) -> VibroResult<Mat3> {
        let mut tensor = ZERO_MAT3;
        for row in tensor.iter_mut() {
            let (line, tokens) = self.next_tokens("a tensor row")?;
            if tokens.len() != 3 {
                return Err(VibroError::corrupt_force_constants(format!(
                    "line {line}: expected 3 values, found {}",
                    tokens.len()
                )));
            }
            for (value, token) in row.iter_mut().zip(&tokens) {
                *value = token
                    .parse::<f64>()
                    .ok()
                    .filter(|parsed| parsed.is_finite())
                    .ok_or_else(|| {
                        VibroError::corrupt_force_constants(format!(
                            "line {line}: '{token}' is not a finite number"
                        ))
                    })?;
            }
        }
        Ok(tensor)
    }
}

/// Reads compact or full force constants and returns the primitive rows.
pub fn read_force_constants(
    text: &str,
    p2s: &[usize],
    n_super: usize,
) -> VibroResult<Vec<Vec<Mat3>>> {
    let mut lines = TokenLines::new(text);
    let (line, header) = lines.next_tokens("the header")?;
    let parse_count = |token: &str| {
        token.parse::<usize>().map_err(|_| {
            VibroError::corrupt_force_constants(format!("line {line}: bad header '{token}'"))
        })
    };
    let (n_rows, n_cols) = match header.as_slice() {
        [n] => {
            let n = parse_count(n)?;
            (n, n)
        }
        [rows, cols] => (parse_count(rows)?, parse_count(cols)?),
        _ => {
            return Err(VibroError::corrupt_force_constants(format!(
                "line {line}: header must hold one or two counts"
            )));
        }
    };
    if n_cols != n_super {
        return Err(VibroError::corrupt_force_constants(format!(
            "file has {n_cols} supercell atoms, supercell has {n_super}"
        )));
    }
    let full = n_rows == n_super && n_rows != p2s.len();
    if !full && n_rows != p2s.len() {
        return Err(VibroError::corrupt_force_constants(format!(
            "file has {n_rows} rows, expected {} or {n_super}",
            p2s.len()
        )));
    }

    let mut rows: Vec<Option<Vec<Mat3>>> = vec![None; p2s.len()];
    for row in 0..n_rows {
        let mut tensors = Vec::with_capacity(n_cols);
        let mut row_atom = None;
        for col in 0..n_cols {
            let (line, [atom, partner]) = lines.indices::<2>("a pair line")?;
            if atom == 0 || atom > n_super || partner != col + 1 {
                return Err(VibroError::corrupt_force_constants(format!(
                    "line {line}: unexpected pair ({atom}, {partner})"
                )));
            }
            if *row_atom.get_or_insert(atom) != atom {
                return Err(VibroError::corrupt_force_constants(format!(
                    "line {line}: row {} switches atom to {atom}",
                    row + 1
                )));
            }
            tensors.push(lines.tensor()?);
        }
        let Some(atom) = row_atom else {
            continue;
        };
        match p2s.iter().position(|&image| image + 1 == atom) {
            Some(slot) => rows[slot] = Some(tensors),
            None if full => {}
            None => {
                return Err(VibroError::corrupt_force_constants(format!(
                    "row atom {atom} is not a primitive-cell image"
                )));
            }
        }
    }

    rows.into_iter()
        .zip(p2s)
        .map(|(row, image)| {
            row.ok_or_else(|| {
                VibroError::corrupt_force_constants(format!(
                    "no force constants for supercell atom {}",
                    image + 1
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    fn sample() -> Vec<Vec<Mat3>> {
        vec![vec![
            [[1.5, 0.0, 0.0], [0.0, 1.5, 0.0], [0.0, 0.0, 1.5]],
            [[-0.75, 0.125, 0.0], [0.125, -0.75, 0.0], [0.0, 0.0, -0.75]],
        ]]
    }

    #[test]
    fn compact_layout_reads_back() {
        let text = write_force_constants(&sample(), &[0]);
        assert!(text.starts_with("   1    2\n"));
        let read = read_force_constants(&text, &[0], 2).expect("written file should parse");
        assert_eq!(read, sample());
    }

    #[test]
    fn full_layout_keeps_primitive_rows() {
        let text = "2\n1 1\n1 0 0\n0 1 0\n0 0 1\n1 2\n2 0 0\n0 2 0\n0 0 2\n\
                    2 1\n3 0 0\n0 3 0\n0 0 3\n2 2\n4 0 0\n0 4 0\n0 0 4\n";
        let read = read_force_constants(text, &[1], 2).expect("full file should parse");
        assert_eq!(read[0][0][0][0], 3.0);
        assert_eq!(read[0][1][2][2], 4.0);
    }

    #[test]
    fn reports_truncated_and_mismatched_files() {
        let text = write_force_constants(&sample(), &[0]);
        let truncated: String = text.lines().take(5).map(|line| format!("{line}\n")).collect();
        let error = read_force_constants(&truncated, &[0], 2).expect_err("truncated file");
        assert_eq!(error.kind(), ErrorKind::CorruptForceConstants);

        let error = read_force_constants(&text, &[0], 4).expect_err("wrong supercell size");
        assert_eq!(error.kind(), ErrorKind::CorruptForceConstants);

        let garbage = text.replace("1.500000000000000", "nan");
        assert!(read_force_constants(&garbage, &[0], 2).is_err());
    }
}
