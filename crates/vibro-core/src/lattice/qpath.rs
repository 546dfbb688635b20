use super::bulk::BulkPathOracle;
use super::classify::{LatticeTag, PlanarMetric};
use crate::domain::{Structure, VibroError, VibroResult, XTick};
use crate::numerics::vector::{self, Mat3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GAMMA: &str = "Γ";
pub const DEFAULT_Q_SPACING: f64 = 0.025;
const COINCIDENCE_TOLERANCE: f64 = 1.0e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QPoint {
    pub label: String,
    /// Fractional reciprocal coordinates.
    pub coords: Vec3,
}

impl QPoint {
    pub fn new(label: impl Into<String>, coords: Vec3) -> Self {
        Self {
            label: label.into(),
            coords,
        }
    }

    pub fn gamma() -> Self {
        Self::new(GAMMA, [0.0; 3])
    }

    /// A point labelled by its own coordinates.
    pub fn unlabelled(coords: Vec3) -> Self {
        Self::new(point_label(&coords), coords)
    }

    pub fn coincides_with(&self, other: &QPoint) -> bool {
        (0..3).all(|axis| (self.coords[axis] - other.coords[axis]).abs() < COINCIDENCE_TOLERANCE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QSegment {
    pub start: QPoint,
    pub end: QPoint,
}

impl QSegment {
    pub fn new(start: QPoint, end: QPoint) -> Self {
        Self { start, end }
    }

    pub fn delta(&self) -> Vec3 {
        vector::sub(&self.end.coords, &self.start.coords)
    }

    pub fn is_degenerate(&self) -> bool {
        self.start.coincides_with(&self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QPath {
    segments: Vec<QSegment>,
    q_spacing: f64,
}

/// Band path in the layout phonopy expects: connected runs of points plus one label per point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonopyBand {
    pub paths: Vec<Vec<Vec3>>,
    pub labels: Vec<String>,
}

/// Concrete q samples of a path with their plotting coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPath {
    pub qpoints: Vec<Vec3>,
    /// Plot coordinate of every sample, strictly increasing (Å⁻¹).
    pub distances: Vec<f64>,
    /// Sample index range `[start, end)` covered by each segment.
    pub segment_ranges: Vec<(usize, usize)>,
    /// Fractional direction of the owning segment, used as the approach direction at Γ.
    pub directions: Vec<Vec3>,
    pub ticks: Vec<XTick>,
}

impl QPath {
    pub fn new(segments: Vec<QSegment>, q_spacing: f64) -> VibroResult<Self> {
        if segments.is_empty() {
            return Err(VibroError::invalid_input("a q-path needs at least one segment"));
        }
        validate_spacing(q_spacing)?;
        Ok(Self {
            segments,
            q_spacing,
        })
    }

    /// Connects consecutive points into segments.
    pub fn through(points: &[QPoint], q_spacing: f64) -> VibroResult<Self> {
        let segments: Vec<QSegment> = match points {
            [] => Vec::new(),
            [single] => vec![QSegment::new(single.clone(), single.clone())],
            _ => points
                .windows(2)
                .map(|pair| QSegment::new(pair[0].clone(), pair[1].clone()))
                .collect(),
        };
        Self::new(segments, q_spacing)
    }

    /// Several connected runs, e.g. for paths with discontinuities.
    pub fn through_runs(runs: &[Vec<QPoint>], q_spacing: f64) -> VibroResult<Self> {
        let mut segments = Vec::new();
        for run in runs {
            segments.extend(Self::through(run, q_spacing)?.segments);
        }
        Self::new(segments, q_spacing)
    }

    pub fn segments(&self) -> &[QSegment] {
        &self.segments
    }

    pub fn q_spacing(&self) -> f64 {
        self.q_spacing
    }

    pub fn with_q_spacing(mut self, q_spacing: f64) -> VibroResult<Self> {
        validate_spacing(q_spacing)?;
        self.q_spacing = q_spacing;
        Ok(self)
    }

    pub fn is_gamma_only(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| segment.is_degenerate() && segment.start.coincides_with(&QPoint::gamma()))
    }

    /// Start and end label of every segment, in order.
    pub fn endpoint_labels(&self) -> Vec<String> {
        self.segments
            .iter()
            .flat_map(|segment| [segment.start.label.clone(), segment.end.label.clone()])
            .collect()
    }

    /// One label per tick: equal labels at a join appear once, different ones merge as `A|B`.
    pub fn ticks(&self) -> Vec<String> {
        let mut ticks: Vec<String> = Vec::with_capacity(self.segments.len() + 1);
        for segment in &self.segments {
            match ticks.pop() {
                None => ticks.push(segment.start.label.clone()),
                Some(previous_end) => ticks.push(merge_labels(&previous_end, &segment.start.label)),
            }
            if !(segment.is_degenerate() && segment.start.label == segment.end.label) {
                ticks.push(segment.end.label.clone());
            }
        }
        ticks
    }

    pub fn to_phonopy_band(&self) -> PhonopyBand {
        let mut paths: Vec<Vec<Vec3>> = Vec::new();
        let mut labels = Vec::new();
        let mut previous_end: Option<&QPoint> = None;
        for segment in &self.segments {
            let continues = previous_end.is_some_and(|end| end.coincides_with(&segment.start));
            if !continues {
                paths.push(vec![segment.start.coords]);
                labels.push(segment.start.label.clone());
            }
            if !segment.is_degenerate() {
                if let Some(run) = paths.last_mut() {
                    run.push(segment.end.coords);
                }
                labels.push(segment.end.label.clone());
            }
            previous_end = Some(&segment.end);
        }
        PhonopyBand { paths, labels }
    }

    /// Samples every segment with `max(⌊‖G·Δk‖/Δq⌋, 2)` points, where G holds the
    /// reciprocal vector norms. Continuous joins share their point.
    pub fn sample(&self, reciprocal: &Mat3) -> SampledPath {
        let norms = reciprocal.map(|row| vector::norm(&row));
        let mut sampled = SampledPath {
            qpoints: Vec::new(),
            distances: Vec::new(),
            segment_ranges: Vec::with_capacity(self.segments.len()),
            directions: Vec::new(),
            ticks: Vec::new(),
        };
        let mut previous: Option<&QSegment> = None;

        for (index, segment) in self.segments.iter().enumerate() {
            let delta = segment.delta();
            let length = (0..3)
                .map(|axis| (norms[axis] * delta[axis]).powi(2))
                .sum::<f64>()
                .sqrt();
            let count = if length < COINCIDENCE_TOLERANCE {
                1
            } else {
                ((length / self.q_spacing).floor() as usize).max(2)
            };
            debug!(segment = index, points = count, length, "sampled q-path segment");

            let continuous = previous.is_some_and(|prev| prev.end.coincides_with(&segment.start));
            let skip_first = continuous && !sampled.qpoints.is_empty();
            let range_start = sampled.qpoints.len();

            if let Some(prev) = previous {
                let tick_index = range_start.saturating_sub(1);
                let label = merge_labels(&prev.end.label, &segment.start.label);
                match sampled.ticks.last_mut() {
                    Some(last) if last.index == tick_index => last.label = label,
                    _ => sampled.ticks.push(XTick::new(tick_index, label)),
                }
            } else {
                sampled.ticks.push(XTick::new(0, segment.start.label.clone()));
            }

            let cartesian_step = if count > 1 { length / (count - 1) as f64 } else { 0.0 };
            for point in 0..count {
                if point == 0 && skip_first {
                    continue;
                }
                let fraction = if count > 1 {
                    point as f64 / (count - 1) as f64
                } else {
                    0.0
                };
                let q = vector::add(&segment.start.coords, &vector::scale(&delta, fraction));
                let distance = match sampled.distances.last() {
                    None => 0.0,
                    Some(last) if point == 0 => last + self.q_spacing,
                    Some(last) => last + cartesian_step,
                };
                sampled.qpoints.push(q);
                sampled.distances.push(distance);
                sampled.directions.push(delta);
            }

            let range_end = sampled.qpoints.len();
            if range_end > range_start {
                sampled.segment_ranges.push((range_start, range_end));
                if !segment.is_degenerate() || index == 0 {
                    let end_index = range_end - 1;
                    if sampled.ticks.last().is_none_or(|tick| tick.index != end_index) {
                        sampled.ticks.push(XTick::new(end_index, segment.end.label.clone()));
                    }
                }
            }
            previous = Some(segment);
        }
        sampled
    }
}

fn validate_spacing(q_spacing: f64) -> VibroResult<()> {
    if q_spacing.is_finite() && q_spacing > 0.0 {
        Ok(())
    } else {
        Err(VibroError::invalid_input(format!(
            "q spacing must be finite and > 0, got {q_spacing}"
        )))
    }
}

pub fn merge_labels(left: &str, right: &str) -> String {
    if left == right {
        left.to_string()
    } else {
        format!("{left}|{right}")
    }
}

/// `Γ` for the origin, otherwise `(x,y,z)` with the shortest decimal forms.
pub fn point_label(coords: &Vec3) -> String {
    if coords.iter().all(|value| value.abs() < COINCIDENCE_TOLERANCE) {
        return GAMMA.to_string();
    }
    let parts: Vec<String> = coords
        .iter()
        .map(|value| {
            let value = if *value == 0.0 { 0.0 } else { *value };
            format!("{value}")
        })
        .collect();
    format!("({})", parts.join(","))
}

/// Parses `"q0x q0y q0z - q1x q1y q1z | ..."` into a path of independent segments.
pub fn parse_custom_path(text: &str, q_spacing: f64) -> VibroResult<QPath> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(VibroError::bad_custom_path("wrong syntax: the q-path is empty"));
    }
    let mut segments = Vec::new();
    for (index, part) in trimmed.split('|').enumerate() {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        let separator = tokens.iter().position(|token| *token == "-");
        let (start_tokens, end_tokens) = match separator {
            Some(position) if tokens.iter().filter(|token| **token == "-").count() == 1 => {
                (&tokens[..position], &tokens[position + 1..])
            }
            _ => {
                return Err(VibroError::bad_custom_path(format!(
                    "wrong syntax in segment {}: expected 'x y z - x y z', got '{}'",
                    index + 1,
                    part.trim()
                )));
            }
        };
        let start = parse_point(start_tokens, index)?;
        let end = parse_point(end_tokens, index)?;
        segments.push(QSegment::new(QPoint::unlabelled(start), QPoint::unlabelled(end)));
    }
    QPath::new(segments, q_spacing)
}

fn parse_point(tokens: &[&str], segment: usize) -> VibroResult<Vec3> {
    if tokens.len() != 3 {
        return Err(VibroError::bad_custom_path(format!(
            "wrong syntax in segment {}: expected 3 coordinates, got {}",
            segment + 1,
            tokens.len()
        )));
    }
    let mut point = [0.0; 3];
    for (axis, token) in tokens.iter().enumerate() {
        point[axis] = token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                VibroError::bad_custom_path(format!(
                    "wrong syntax in segment {}: '{token}' is not a decimal number",
                    segment + 1
                ))
            })?;
    }
    Ok(point)
}

/// Canonical high-symmetry path for a classified lattice.
pub fn high_symmetry_path(
    tag: LatticeTag,
    structure: &Structure,
    oracle: &dyn BulkPathOracle,
    q_spacing: f64,
) -> VibroResult<QPath> {
    let points = match tag {
        LatticeTag::Bulk3D => return oracle.bulk_path(structure)?.with_q_spacing(q_spacing),
        LatticeTag::Molecule => vec![QPoint::gamma()],
        LatticeTag::Chain1D => vec![QPoint::gamma(), QPoint::new("X", [0.5, 0.0, 0.0])],
        LatticeTag::Hex => vec![
            QPoint::gamma(),
            QPoint::new("M", [0.5, 0.0, 0.0]),
            QPoint::new("K", [1.0 / 3.0, 1.0 / 3.0, 0.0]),
            QPoint::gamma(),
        ],
        LatticeTag::Square => vec![
            QPoint::gamma(),
            QPoint::new("X", [0.5, 0.0, 0.0]),
            QPoint::new("M", [0.5, 0.5, 0.0]),
            QPoint::gamma(),
        ],
        LatticeTag::Rect => vec![
            QPoint::gamma(),
            QPoint::new("X", [0.5, 0.0, 0.0]),
            QPoint::new("S", [0.5, 0.5, 0.0]),
            QPoint::new("Y", [0.0, 0.5, 0.0]),
            QPoint::gamma(),
        ],
        LatticeTag::CRect | LatticeTag::Oblique => {
            let metric = PlanarMetric::from_cell(structure.cell())?;
            let (eta, nu) = centred_parameters(&metric);
            let mut points = vec![
                QPoint::gamma(),
                QPoint::new("X", [0.5, 0.0, 0.0]),
                QPoint::new("H₁", [1.0 - eta, nu, 0.0]),
                QPoint::new("C", [0.5, 0.5, 0.0]),
                QPoint::new("H", [eta, 1.0 - nu, 0.0]),
            ];
            if tag == LatticeTag::Oblique {
                points.push(QPoint::new("Y", [0.0, 0.5, 0.0]));
            }
            points.push(QPoint::gamma());
            points
        }
    };
    QPath::through(&points, q_spacing)
}

/// η and ν locating H and H₁ on the zone boundary of a centred or oblique sheet.
pub fn centred_parameters(metric: &PlanarMetric) -> (f64, f64) {
    let eta = (1.0 - (metric.a / metric.b) * metric.cos_gamma) / (2.0 * metric.sin_gamma_sq());
    let nu = 0.5 - eta * (metric.b * metric.cos_gamma) / metric.a;
    (eta, nu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn custom_path_collapses_shared_join_label() {
        let path = parse_custom_path("0 0 0 - 1 1 1 | 1 1 1 - 0.5 0.5 0.5", DEFAULT_Q_SPACING)
            .expect("path should parse");
        assert_eq!(path.segments().len(), 2);
        assert_eq!(
            path.endpoint_labels(),
            vec!["Γ", "(1,1,1)", "(1,1,1)", "(0.5,0.5,0.5)"]
        );
        assert_eq!(path.ticks(), vec!["Γ", "(1,1,1)", "(0.5,0.5,0.5)"]);
    }

    #[test]
    fn negative_coordinates_are_not_separators() {
        let path = parse_custom_path("0 -0.5 0 - 0 0.5 0", DEFAULT_Q_SPACING)
            .expect("negative coordinates should parse");
        assert_eq!(path.segments()[0].start.coords, [0.0, -0.5, 0.0]);
    }

    #[test]
    fn rejects_malformed_paths() {
        for text in [
            "",
            "0 0 0 - 1 1",
            "0 0 0 1 1 1",
            "0 0 0 - 1/2 0 0",
            "a b c - 0 0 0",
            "0 0 0 - 1 1 1 |",
            "0 0 0 - - 1 1 1",
            "nan 0 0 - 1 1 1",
        ] {
            let error = parse_custom_path(text, DEFAULT_Q_SPACING)
                .expect_err("malformed path should be rejected");
            assert_eq!(error.kind(), ErrorKind::BadCustomPath, "input '{text}'");
        }
    }

    #[test]
    fn different_join_labels_merge_with_bar() {
        let path = QPath::new(
            vec![
                QSegment::new(QPoint::gamma(), QPoint::new("X", [0.5, 0.0, 0.0])),
                QSegment::new(QPoint::new("Y", [0.0, 0.5, 0.0]), QPoint::gamma()),
            ],
            DEFAULT_Q_SPACING,
        )
        .expect("path should be valid");
        assert_eq!(path.ticks(), vec!["Γ", "X|Y", "Γ"]);
    }

    #[test]
    fn single_gamma_point_has_one_tick() {
        let path = QPath::through(&[QPoint::gamma()], DEFAULT_Q_SPACING)
            .expect("gamma path should be valid");
        assert!(path.is_gamma_only());
        assert_eq!(path.ticks(), vec!["Γ"]);
        let band = path.to_phonopy_band();
        assert_eq!(band.paths, vec![vec![[0.0; 3]]]);
        assert_eq!(band.labels, vec!["Γ"]);
    }

    #[test]
    fn sampling_shares_continuous_joins() {
        let path = QPath::through(
            &[
                QPoint::gamma(),
                QPoint::new("X", [0.5, 0.0, 0.0]),
                QPoint::new("M", [0.5, 0.5, 0.0]),
            ],
            0.125,
        )
        .expect("path should be valid");
        let reciprocal = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let sampled = path.sample(&reciprocal);
        // 0.5 / 0.125 = 4 points per segment, the join is shared
        assert_eq!(sampled.qpoints.len(), 7);
        assert_eq!(sampled.segment_ranges, vec![(0, 4), (4, 7)]);
        let ticks: Vec<(usize, &str)> = sampled
            .ticks
            .iter()
            .map(|tick| (tick.index, tick.label.as_str()))
            .collect();
        assert_eq!(ticks, vec![(0, "Γ"), (3, "X"), (6, "M")]);
        for pair in sampled.distances.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn sampling_breaks_discontinuous_joins() {
        let path = parse_custom_path("0 0 0 - 0.5 0 0 | 0 0.5 0 - 0 0 0", 0.25)
            .expect("path should parse");
        let reciprocal = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let sampled = path.sample(&reciprocal);
        assert_eq!(sampled.qpoints.len(), 4);
        let labels: Vec<&str> = sampled.ticks.iter().map(|tick| tick.label.as_str()).collect();
        assert_eq!(labels, vec!["Γ", "(0.5,0,0)|(0,0.5,0)", "Γ"]);
        assert_eq!(sampled.ticks[1].index, 1);
        assert!(sampled.distances[2] - sampled.distances[1] >= 0.25);
    }

    #[test]
    fn centred_parameters_for_hexagonal_metric() {
        let metric = PlanarMetric {
            a: 1.0,
            b: 1.0,
            cos_gamma: 0.5,
        };
        let (eta, nu) = centred_parameters(&metric);
        assert!((eta - 1.0 / 3.0).abs() < 1.0e-12);
        assert!((nu - 1.0 / 3.0).abs() < 1.0e-12);
    }
}
