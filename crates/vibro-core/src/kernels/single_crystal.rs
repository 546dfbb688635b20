use super::SpectrumResult;
use super::debye_waller::{DEFAULT_GRID_SPACING, debye_waller_tensors};
use super::modes::{ModeRequest, ModeSolver, PhononSource, QModes};
use super::sampling::{DEFAULT_ENERGY_BINS, ModeWeighter, Weighting, accumulate, energy_edges};
use crate::domain::structure::fractional_to_cartesian_q;
use crate::domain::{Axis, Spectrum2D, VibroError, VibroResult, XTick};
use crate::lattice::{BulkPathOracle, DEFAULT_Q_SPACING, QPath, classify, high_symmetry_path, point_label};
use crate::numerics::vector::{self, Vec3};
use crate::numerics::{GaussianSmoothingInput, MapAxis, gaussian_smooth_map};
use crate::support::kernel_boundary;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const GAMMA_TOLERANCE: f64 = 1.0e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleCrystalParameters {
    pub weighting: Weighting,
    /// Kelvin.
    pub temperature: f64,
    /// Target sample spacing along the path (Å⁻¹).
    pub q_spacing: f64,
    /// Custom path; the lattice's standard path is used when absent.
    pub path: Option<QPath>,
    /// Gaussian FWHM along energy (meV).
    pub energy_fwhm: f64,
    /// Gaussian FWHM along the path (Å⁻¹).
    pub q_fwhm: Option<f64>,
    pub energy_bins: usize,
    pub energy_window: Option<[f64; 2]>,
    pub debye_waller: bool,
    pub grid_spacing: f64,
    pub n_threads: usize,
}

impl Default for SingleCrystalParameters {
    fn default() -> Self {
        Self {
            weighting: Weighting::Coherent,
            temperature: 0.0,
            q_spacing: DEFAULT_Q_SPACING,
            path: None,
            energy_fwhm: 0.5,
            q_fwhm: None,
            energy_bins: DEFAULT_ENERGY_BINS,
            energy_window: None,
            debye_waller: true,
            grid_spacing: DEFAULT_GRID_SPACING,
            n_threads: 1,
        }
    }
}

impl SingleCrystalParameters {
    fn wants_debye_waller(&self) -> bool {
        self.debye_waller && self.weighting == Weighting::Coherent && self.temperature > 0.0
    }
}

/// Where the map samples q, with plot coordinates and labels.
struct PathSamples {
    requests: Vec<ModeRequest>,
    distances: Vec<f64>,
    ticks: Vec<XTick>,
    segments: Option<Vec<(usize, usize)>>,
}

fn path_samples(
    source: &PhononSource<'_>,
    parameters: &SingleCrystalParameters,
    oracle: &dyn BulkPathOracle,
) -> VibroResult<PathSamples> {
    let structure = source.structure();
    let reciprocal = structure.reciprocal_lattice();

    if let PhononSource::Precomputed(precomputed) = source {
        let qpoints: Vec<Vec3> = precomputed.modes().iter().map(|set| set.q).collect();
        let (Some(first), Some(last_q)) = (qpoints.first(), qpoints.last()) else {
            return Err(VibroError::invalid_input("precomputed mode set is empty"));
        };
        let mut distances = Vec::with_capacity(qpoints.len());
        for (index, q) in qpoints.iter().enumerate() {
            let distance = match index {
                0 => 0.0,
                _ => {
                    let step = vector::sub(q, &qpoints[index - 1]);
                    let length = vector::norm(&fractional_to_cartesian_q(&step, &reciprocal));
                    distances[index - 1] + length.max(parameters.q_spacing * 1.0e-3)
                }
            };
            distances.push(distance);
        }
        let last = qpoints.len() - 1;
        let mut ticks = vec![XTick::new(0, point_label(first))];
        if last > 0 {
            ticks.push(XTick::new(last, point_label(last_q)));
        }
        return Ok(PathSamples {
            requests: qpoints.into_iter().map(ModeRequest::at).collect(),
            distances,
            ticks,
            segments: None,
        });
    }

    let path = match &parameters.path {
        Some(path) => path.clone().with_q_spacing(parameters.q_spacing)?,
        None => {
            let tag = classify(structure)?;
            high_symmetry_path(tag, structure, oracle, parameters.q_spacing)?
        }
    };
    let sampled = path.sample(&reciprocal);
    let with_nac = source.force_constants().is_some_and(|record| record.nac().is_some());
    let requests = sampled
        .qpoints
        .iter()
        .zip(&sampled.directions)
        .map(|(q, direction)| {
            let at_gamma = vector::norm(q) < GAMMA_TOLERANCE;
            ModeRequest {
                q: *q,
                direction: (with_nac && at_gamma)
                    .then(|| fractional_to_cartesian_q(direction, &reciprocal)),
            }
        })
        .collect();
    debug!(
        segments = sampled.segment_ranges.len(),
        points = sampled.qpoints.len(),
        "sampled single-crystal path"
    );
    Ok(PathSamples {
        requests,
        distances: sampled.distances,
        ticks: sampled.ticks,
        segments: Some(sampled.segment_ranges),
    })
}

/// Coherent S(q,ω) or mode density along a q-path, as a (q, E) map.
pub fn single_crystal_map(
    source: PhononSource<'_>,
    parameters: &SingleCrystalParameters,
    oracle: &dyn BulkPathOracle,
) -> VibroResult<SpectrumResult> {
    if parameters.wants_debye_waller() {
        source.require_force_constants("Debye-Waller factor")?;
    }
    if let PhononSource::Precomputed(precomputed) = source {
        if parameters.weighting == Weighting::Coherent && !precomputed.has_eigenvectors() {
            return Err(VibroError::needs_eigenvectors(
                "coherent weighting needs eigenvectors, only frequencies are available",
            ));
        }
    }
    let samples = path_samples(&source, parameters, oracle)?;
    let structure = source.structure();
    let reciprocal = structure.reciprocal_lattice();

    let spectrum = kernel_boundary("single-crystal S(q,w)", || {
        let modes: Vec<QModes> = match source {
            PhononSource::ForceConstants(record) => {
                ModeSolver::new(record).solve_all(&samples.requests, parameters.n_threads)?
            }
            PhononSource::Precomputed(precomputed) => precomputed.modes().to_vec(),
        };
        let debye_waller = match source.force_constants() {
            Some(record) if parameters.wants_debye_waller() => Some(debye_waller_tensors(
                &ModeSolver::new(record),
                parameters.temperature,
                parameters.grid_spacing,
                parameters.n_threads,
            )?),
            _ => None,
        };
        let weighter = ModeWeighter {
            weighting: parameters.weighting,
            temperature: parameters.temperature,
            cartesian_positions: structure.cartesian_positions(),
            masses: source.masses(),
            scattering_lengths: source.scattering_lengths(),
            debye_waller,
        };

        let energy_edges = energy_edges(
            modes.iter().flat_map(|set| set.energies.iter().copied()),
            parameters.energy_bins,
            parameters.energy_window,
        )?;
        let mut z = vec![vec![0.0; parameters.energy_bins]; modes.len()];
        for (row, set) in z.iter_mut().zip(&modes) {
            let q_cart = fractional_to_cartesian_q(&set.q, &reciprocal);
            let weights = weighter.weights(&q_cart, set)?;
            accumulate(row, &energy_edges, &set.energies, &weights, 1.0);
        }

        let q_edges = vector::edges_around(&samples.distances, parameters.q_spacing);
        gaussian_smooth_map(
            &mut z,
            GaussianSmoothingInput::new(&energy_edges, parameters.energy_fwhm, MapAxis::Y),
        )?;
        if let Some(q_fwhm) = parameters.q_fwhm {
            gaussian_smooth_map(&mut z, GaussianSmoothingInput::new(&q_edges, q_fwhm, MapAxis::X))?;
        }

        let z_unit = match parameters.weighting {
            Weighting::Coherent => "arb. units",
            Weighting::Dos => "modes/meV",
        };
        Spectrum2D::new(Axis::new(q_edges, "1/Å"), Axis::new(energy_edges, "meV"), z, z_unit)?
            .with_ticks(samples.ticks.clone())
    })?;

    info!(
        q_points = spectrum.shape().0,
        energy_bins = spectrum.shape().1,
        weighting = ?parameters.weighting,
        "computed single-crystal map"
    );
    Ok(SpectrumResult {
        parameters: super::parameter_snapshot(parameters)?,
        spectrum,
        segments: samples.segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, Periodicity, Site, Structure};
    use crate::kernels::modes::PrecomputedModes;
    use crate::lattice::{QPoint, StandardBulkPaths};
    use crate::numerics::vector::Mat3;
    use crate::phonopy::{ForceConstantsRecord, SupercellMap};

    fn diagonal(value: f64) -> Mat3 {
        [[value, 0.0, 0.0], [0.0, value, 0.0], [0.0, 0.0, value]]
    }

    fn chain() -> ForceConstantsRecord {
        let primitive = Structure::new(
            [[2.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec![Site::new("C", [0.0; 3])],
            Periodicity::Chain,
        )
        .expect("chain should be valid");
        let supercell = SupercellMap::build(&primitive, [3, 1, 1]).expect("supercell should build");
        ForceConstantsRecord::new(
            primitive,
            vec![12.0],
            vec![6.646],
            supercell,
            vec![vec![diagonal(10.0), diagonal(-5.0), diagonal(-5.0)]],
            None,
        )
        .expect("record should be valid")
    }

    #[test]
    fn chain_map_follows_the_default_path() {
        let record = chain();
        let parameters = SingleCrystalParameters {
            weighting: Weighting::Dos,
            energy_fwhm: 0.0,
            energy_bins: 50,
            ..SingleCrystalParameters::default()
        };
        let result = single_crystal_map(PhononSource::ForceConstants(&record), &parameters, &StandardBulkPaths)
            .expect("map should compute");
        let (rows, columns) = result.spectrum.shape();
        assert!(rows >= 2);
        assert_eq!(columns, 50);
        let ticks = result.spectrum.x_ticks().expect("path map has ticks");
        assert_eq!(ticks.first().map(|tick| tick.label.as_str()), Some("Γ"));
        assert_eq!(ticks.last().map(|tick| tick.label.as_str()), Some("X"));
        // the Γ row is left out: its zero-energy modes sit on the window edge
        let total: f64 = result.spectrum.z().iter().skip(1).map(|row| row.iter().sum::<f64>()).sum();
        assert!((total - 3.0 * (rows - 1) as f64).abs() < 1.0e-9);
        assert_eq!(result.parameters["weighting"], "dos");
    }

    #[test]
    fn custom_path_coherent_map_is_non_negative() {
        let record = chain();
        let path = QPath::through(
            &[QPoint::new("A", [0.1, 0.0, 0.0]), QPoint::new("B", [0.4, 0.0, 0.0])],
            0.05,
        )
        .expect("path should build");
        let parameters = SingleCrystalParameters {
            temperature: 100.0,
            path: Some(path),
            q_spacing: 0.05,
            grid_spacing: 0.5,
            q_fwhm: Some(0.1),
            ..SingleCrystalParameters::default()
        };
        let result = single_crystal_map(PhononSource::ForceConstants(&record), &parameters, &StandardBulkPaths)
            .expect("map should compute");
        let z = result.spectrum.z();
        assert!(z.iter().flatten().all(|value| *value >= 0.0));
        assert!(z.iter().flatten().any(|value| *value > 0.0));
        assert_eq!(result.segments.as_deref().map(<[_]>::len), Some(1));
    }

    #[test]
    fn precomputed_modes_reject_debye_waller_and_missing_vectors() {
        let record = chain();
        let modes = vec![QModes {
            q: [0.25, 0.0, 0.0],
            energies: vec![5.0, 5.0, 5.0],
            eigenvectors: None,
        }];
        let precomputed = PrecomputedModes::new(record.primitive().clone(), vec![12.0], vec![6.646], modes)
            .expect("modes should be valid");
        let hot = SingleCrystalParameters {
            temperature: 300.0,
            ..SingleCrystalParameters::default()
        };
        let error = single_crystal_map(PhononSource::Precomputed(&precomputed), &hot, &StandardBulkPaths)
            .expect_err("DW needs force constants");
        assert_eq!(error.kind(), ErrorKind::NeedsForceConstants);

        let cold = SingleCrystalParameters::default();
        let error = single_crystal_map(PhononSource::Precomputed(&precomputed), &cold, &StandardBulkPaths)
            .expect_err("coherent needs eigenvectors");
        assert_eq!(error.kind(), ErrorKind::NeedsEigenvectors);

        let dos = SingleCrystalParameters {
            weighting: Weighting::Dos,
            ..SingleCrystalParameters::default()
        };
        let result = single_crystal_map(PhononSource::Precomputed(&precomputed), &dos, &StandardBulkPaths)
            .expect("dos map from frequencies");
        assert_eq!(result.spectrum.shape().0, 1);
    }
}
