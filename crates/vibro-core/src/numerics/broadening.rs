use std::f64::consts::PI;

/// FWHM to standard deviation for a Gaussian.
pub const FWHM_TO_SIGMA: f64 = 0.424_660_900_144_009_5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BroadeningError {
    #[error("broadening width must be finite and >= 0, got {value}")]
    InvalidWidth { value: f64 },
    #[error("broadening input length mismatch: positions={positions}, values={values}")]
    LengthMismatch { positions: usize, values: usize },
    #[error("bin edges must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingEdges {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("broadening requires at least one bin")]
    EmptyGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAxis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSmoothingInput<'a> {
    pub edges: &'a [f64],
    pub fwhm: f64,
    pub axis: MapAxis,
}

impl<'a> GaussianSmoothingInput<'a> {
    pub fn new(edges: &'a [f64], fwhm: f64, axis: MapAxis) -> Self {
        Self { edges, fwhm, axis }
    }
}

/// Convolves a binned 2-D map with a normalised Gaussian along one axis.
///
/// `map` is indexed `[x][y]`. A zero FWHM leaves the map untouched.
pub fn gaussian_smooth_map(
    map: &mut [Vec<f64>],
    input: GaussianSmoothingInput<'_>,
) -> Result<(), BroadeningError> {
    if !input.fwhm.is_finite() || input.fwhm < 0.0 {
        return Err(BroadeningError::InvalidWidth { value: input.fwhm });
    }
    if input.fwhm == 0.0 {
        return Ok(());
    }
    let centres = bin_centres(input.edges)?;
    let widths: Vec<f64> = input.edges.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let kernel = gaussian_kernel(&centres, &widths, input.fwhm * FWHM_TO_SIGMA);

    match input.axis {
        MapAxis::X => {
            if map.len() != centres.len() {
                return Err(BroadeningError::LengthMismatch {
                    positions: centres.len(),
                    values: map.len(),
                });
            }
            let columns = map.first().map_or(0, Vec::len);
            let mut smoothed = vec![vec![0.0; columns]; map.len()];
            for (target, weights) in kernel.iter().enumerate() {
                for (source, weight) in weights.iter().enumerate() {
                    if *weight == 0.0 {
                        continue;
                    }
                    for col in 0..columns {
                        smoothed[target][col] += weight * map[source][col];
                    }
                }
            }
            for (row, values) in map.iter_mut().zip(smoothed) {
                *row = values;
            }
        }
        MapAxis::Y => {
            for row in map.iter_mut() {
                if row.len() != centres.len() {
                    return Err(BroadeningError::LengthMismatch {
                        positions: centres.len(),
                        values: row.len(),
                    });
                }
                let smoothed: Vec<f64> = kernel
                    .iter()
                    .map(|weights| weights.iter().zip(row.iter()).map(|(w, v)| w * v).sum())
                    .collect();
                *row = smoothed;
            }
        }
    }
    Ok(())
}

// kernel[target][source] = g(c_target - c_source) * width_target
fn gaussian_kernel(centres: &[f64], widths: &[f64], sigma: f64) -> Vec<Vec<f64>> {
    let norm = 1.0 / (sigma * (2.0 * PI).sqrt());
    centres
        .iter()
        .zip(widths)
        .map(|(target, width)| {
            centres
                .iter()
                .map(|source| {
                    let u = (target - source) / sigma;
                    if u.abs() > 8.0 {
                        0.0
                    } else {
                        norm * (-0.5 * u * u).exp() * width
                    }
                })
                .collect()
        })
        .collect()
}

pub fn bin_centres(edges: &[f64]) -> Result<Vec<f64>, BroadeningError> {
    if edges.len() < 2 {
        return Err(BroadeningError::EmptyGrid);
    }
    for (index, pair) in edges.windows(2).enumerate() {
        if !(pair[1] > pair[0]) {
            return Err(BroadeningError::NonIncreasingEdges {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(edges
        .windows(2)
        .map(|pair| 0.5 * (pair[0] + pair[1]))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LorentzianSumInput<'a> {
    pub grid: &'a [f64],
    pub centres: &'a [f64],
    pub intensities: &'a [f64],
    pub fwhm: f64,
}

impl<'a> LorentzianSumInput<'a> {
    pub fn new(grid: &'a [f64], centres: &'a [f64], intensities: &'a [f64], fwhm: f64) -> Self {
        Self {
            grid,
            centres,
            intensities,
            fwhm,
        }
    }
}

/// Sum of area-normalised Lorentzians, one per peak.
pub fn multilorentz(input: LorentzianSumInput<'_>) -> Result<Vec<f64>, BroadeningError> {
    if !input.fwhm.is_finite() || input.fwhm <= 0.0 {
        return Err(BroadeningError::InvalidWidth { value: input.fwhm });
    }
    if input.centres.len() != input.intensities.len() {
        return Err(BroadeningError::LengthMismatch {
            positions: input.centres.len(),
            values: input.intensities.len(),
        });
    }
    let gamma = 0.5 * input.fwhm;
    Ok(input
        .grid
        .iter()
        .map(|x| {
            input
                .centres
                .iter()
                .zip(input.intensities)
                .map(|(centre, intensity)| {
                    let delta = x - centre;
                    intensity * gamma / (PI * (delta * delta + gamma * gamma))
                })
                .sum()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_smoothing_conserves_interior_weight() {
        let edges: Vec<f64> = (0..=100).map(|index| index as f64 * 0.1).collect();
        let mut map = vec![vec![0.0; 100]];
        map[0][50] = 1.0;
        gaussian_smooth_map(&mut map, GaussianSmoothingInput::new(&edges, 0.5, MapAxis::Y))
            .expect("smoothing should succeed");
        let total: f64 = map[0].iter().sum();
        assert!((total - 1.0).abs() < 1.0e-6, "total weight {total}");
        assert!(map[0][50] < 1.0);
        assert!((map[0][49] - map[0][51]).abs() < 1.0e-12);
    }

    #[test]
    fn zero_width_is_identity() {
        let edges = [0.0, 1.0, 2.0];
        let mut map = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        gaussian_smooth_map(&mut map, GaussianSmoothingInput::new(&edges, 0.0, MapAxis::X))
            .expect("zero width should be accepted");
        assert_eq!(map, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn lorentzian_peak_height_matches_closed_form() {
        let grid = [100.0];
        let curve = multilorentz(LorentzianSumInput::new(&grid, &[100.0], &[2.0], 10.0))
            .expect("lorentzian sum should succeed");
        let expected = 2.0 / (PI * 5.0);
        assert!((curve[0] - expected).abs() < 1.0e-12);
    }

    #[test]
    fn rejects_non_positive_lorentzian_width() {
        let result = multilorentz(LorentzianSumInput::new(&[0.0], &[0.0], &[1.0], 0.0));
        assert_eq!(result, Err(BroadeningError::InvalidWidth { value: 0.0 }));
    }
}
