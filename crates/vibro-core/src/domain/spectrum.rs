use super::errors::{VibroError, VibroResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub edges: Vec<f64>,
    pub unit: String,
}

impl Axis {
    pub fn new(edges: Vec<f64>, unit: impl Into<String>) -> Self {
        Self {
            edges,
            unit: unit.into(),
        }
    }

    pub fn bins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    pub fn centres(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|pair| 0.5 * (pair[0] + pair[1]))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XTick {
    pub index: usize,
    pub label: String,
}

impl XTick {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawSpectrum2D {
    x: Axis,
    y: Axis,
    z: Vec<Vec<f64>>,
    z_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x_ticks: Option<Vec<XTick>>,
}

/// Binned 2-D map; `z[i][j]` is the value in x-bin `i` and y-bin `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpectrum2D", into = "RawSpectrum2D")]
pub struct Spectrum2D {
    x: Axis,
    y: Axis,
    z: Vec<Vec<f64>>,
    z_unit: String,
    x_ticks: Option<Vec<XTick>>,
}

impl Spectrum2D {
    pub fn new(x: Axis, y: Axis, z: Vec<Vec<f64>>, z_unit: impl Into<String>) -> VibroResult<Self> {
        if x.edges.len() != z.len() + 1 {
            return Err(VibroError::invalid_input(format!(
                "x axis has {} edges for {} rows",
                x.edges.len(),
                z.len()
            )));
        }
        if let Some((row, values)) = z
            .iter()
            .enumerate()
            .find(|(_, values)| y.edges.len() != values.len() + 1)
        {
            return Err(VibroError::invalid_input(format!(
                "y axis has {} edges but row {row} has {} columns",
                y.edges.len(),
                values.len()
            )));
        }
        if z.is_empty() && y.edges.len() < 2 {
            return Err(VibroError::invalid_input("y axis needs at least two edges"));
        }
        Ok(Self {
            x,
            y,
            z,
            z_unit: z_unit.into(),
            x_ticks: None,
        })
    }

    pub fn with_ticks(mut self, ticks: Vec<XTick>) -> VibroResult<Self> {
        if let Some(tick) = ticks.iter().find(|tick| tick.index >= self.x.edges.len()) {
            return Err(VibroError::invalid_input(format!(
                "tick '{}' index {} is outside the x axis",
                tick.label, tick.index
            )));
        }
        self.x_ticks = Some(ticks);
        Ok(self)
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn z(&self) -> &[Vec<f64>] {
        &self.z
    }

    pub fn z_unit(&self) -> &str {
        &self.z_unit
    }

    pub fn x_ticks(&self) -> Option<&[XTick]> {
        self.x_ticks.as_deref()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.z.len(), self.y.bins())
    }

    /// Splits the map into contiguous x ranges; each range is `[start, end)` in bins.
    pub fn split_rows(&self, ranges: &[(usize, usize)]) -> VibroResult<Vec<Spectrum2D>> {
        ranges
            .iter()
            .map(|&(start, end)| {
                if start >= end || end > self.z.len() {
                    return Err(VibroError::invalid_input(format!(
                        "row range {start}..{end} is outside 0..{}",
                        self.z.len()
                    )));
                }
                let x = Axis::new(self.x.edges[start..=end].to_vec(), self.x.unit.clone());
                let piece = Spectrum2D::new(
                    x,
                    self.y.clone(),
                    self.z[start..end].to_vec(),
                    self.z_unit.clone(),
                )?;
                let ticks: Vec<XTick> = self
                    .x_ticks
                    .iter()
                    .flatten()
                    .filter(|tick| tick.index >= start && tick.index <= end)
                    .map(|tick| XTick::new(tick.index - start, tick.label.clone()))
                    .collect();
                if ticks.is_empty() {
                    Ok(piece)
                } else {
                    piece.with_ticks(ticks)
                }
            })
            .collect()
    }
}

impl TryFrom<RawSpectrum2D> for Spectrum2D {
    type Error = VibroError;

    fn try_from(raw: RawSpectrum2D) -> Result<Self, Self::Error> {
        let spectrum = Spectrum2D::new(raw.x, raw.y, raw.z, raw.z_unit)?;
        match raw.x_ticks {
            Some(ticks) => spectrum.with_ticks(ticks),
            None => Ok(spectrum),
        }
    }
}

impl From<Spectrum2D> for RawSpectrum2D {
    fn from(spectrum: Spectrum2D) -> Self {
        Self {
            x: spectrum.x,
            y: spectrum.y,
            z: spectrum.z,
            z_unit: spectrum.z_unit,
            x_ticks: spectrum.x_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Spectrum2D {
        Spectrum2D::new(
            Axis::new(vec![0.0, 1.0, 2.0, 3.0], "1/Å"),
            Axis::new(vec![0.0, 5.0, 10.0], "meV"),
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            "arb. units",
        )
        .expect("shape should be consistent")
    }

    #[test]
    fn rejects_inconsistent_shapes() {
        let result = Spectrum2D::new(
            Axis::new(vec![0.0, 1.0], "1/Å"),
            Axis::new(vec![0.0, 1.0, 2.0], "meV"),
            vec![vec![1.0]],
            "arb. units",
        );
        assert!(result.is_err());
    }

    #[test]
    fn split_rows_keeps_ticks_local() {
        let spectrum = sample()
            .with_ticks(vec![XTick::new(0, "Γ"), XTick::new(2, "X"), XTick::new(3, "M")])
            .expect("ticks should fit");
        let pieces = spectrum
            .split_rows(&[(0, 2), (2, 3)])
            .expect("ranges should be valid");
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].shape(), (2, 2));
        assert_eq!(pieces[1].x().edges, vec![2.0, 3.0]);
        assert_eq!(
            pieces[1].x_ticks(),
            Some(&[XTick::new(0, "X"), XTick::new(1, "M")][..])
        );
    }
}
