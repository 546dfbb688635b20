use super::SpectrumResult;
use super::debye_waller::{DEFAULT_GRID_SPACING, debye_waller_tensors};
use super::modes::{ModeRequest, ModeSolver, PhononSource};
use super::sampling::{DEFAULT_ENERGY_BINS, ModeWeighter, Weighting, accumulate, energy_edges};
use crate::common::constants::NEUTRON_ENERGY_PER_K2;
use crate::domain::structure::cartesian_to_fractional_q;
use crate::domain::{Axis, Spectrum2D, VibroError, VibroResult};
use crate::numerics::vector::{self, Vec3};
use crate::numerics::{GaussianSmoothingInput, MapAxis, SphereSampling, gaussian_smooth_map, sample_sphere};
use crate::support::kernel_boundary;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

pub const DEFAULT_SHELL_POINTS: usize = 150;

/// Instrument geometry limiting which (|Q|, E) pairs are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "geometry", rename_all = "snake_case")]
pub enum KinematicConstraint {
    /// Fixed incident energy (meV); scattering angles in degrees.
    Direct { incident_energy: f64, angle_range: [f64; 2] },
    /// Fixed final energy (meV).
    Indirect { final_energy: f64, angle_range: [f64; 2] },
}

impl KinematicConstraint {
    fn energies(&self, transfer: f64) -> Option<(f64, f64)> {
        let (incident, scattered) = match *self {
            Self::Direct { incident_energy, .. } => (incident_energy, incident_energy - transfer),
            Self::Indirect { final_energy, .. } => (final_energy + transfer, final_energy),
        };
        (incident > 0.0 && scattered > 0.0).then_some((incident, scattered))
    }

    fn angle_range(&self) -> [f64; 2] {
        match *self {
            Self::Direct { angle_range, .. } | Self::Indirect { angle_range, .. } => angle_range,
        }
    }

    /// Whether momentum transfer `q` (Å⁻¹) at energy transfer `transfer` (meV) is reachable.
    pub fn accessible(&self, q: f64, transfer: f64) -> bool {
        let Some((incident, scattered)) = self.energies(transfer) else {
            return false;
        };
        let k_in = (incident / NEUTRON_ENERGY_PER_K2).sqrt();
        let k_out = (scattered / NEUTRON_ENERGY_PER_K2).sqrt();
        let transfer_at = |degrees: f64| {
            (k_in * k_in + k_out * k_out - 2.0 * k_in * k_out * degrees.to_radians().cos())
                .max(0.0)
                .sqrt()
        };
        let [low, high] = self.angle_range();
        let (low, high) = (low.min(high).clamp(0.0, 180.0), low.max(high).clamp(0.0, 180.0));
        q >= transfer_at(low) && q <= transfer_at(high)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowderParameters {
    pub weighting: Weighting,
    pub temperature: f64,
    pub q_min: f64,
    pub q_max: f64,
    pub q_spacing: f64,
    /// Orientations per shell.
    pub npts: usize,
    /// Orientations per Å⁻² of shell surface; overrides `npts` when set.
    pub npts_density: Option<f64>,
    pub sampling: SphereSampling,
    pub jitter: bool,
    pub energy_fwhm: f64,
    pub q_fwhm: Option<f64>,
    pub energy_bins: usize,
    pub energy_window: Option<[f64; 2]>,
    pub debye_waller: bool,
    pub grid_spacing: f64,
    pub constraint: Option<KinematicConstraint>,
    pub n_threads: usize,
}

impl Default for PowderParameters {
    fn default() -> Self {
        Self {
            weighting: Weighting::Coherent,
            temperature: 0.0,
            q_min: 0.5,
            q_max: 5.0,
            q_spacing: 0.1,
            npts: DEFAULT_SHELL_POINTS,
            npts_density: None,
            sampling: SphereSampling::Golden,
            jitter: false,
            energy_fwhm: 0.5,
            q_fwhm: None,
            energy_bins: DEFAULT_ENERGY_BINS,
            energy_window: None,
            debye_waller: true,
            grid_spacing: DEFAULT_GRID_SPACING,
            constraint: None,
            n_threads: 1,
        }
    }
}

impl PowderParameters {
    /// Shell edges: `max(1, ⌈(q_max − q_min)/Δq⌉)` shells over the range, or
    /// one shell of width Δq when the range is a single value.
    pub fn shell_edges(&self) -> VibroResult<Vec<f64>> {
        let valid = self.q_min.is_finite()
            && self.q_max.is_finite()
            && self.q_min >= 0.0
            && self.q_max >= self.q_min
            && self.q_spacing.is_finite()
            && self.q_spacing > 0.0;
        if !valid {
            return Err(VibroError::invalid_input(format!(
                "powder range needs 0 <= q_min <= q_max and q_spacing > 0, got [{}, {}] step {}",
                self.q_min, self.q_max, self.q_spacing
            )));
        }
        let span = self.q_max - self.q_min;
        if span == 0.0 {
            let half = 0.5 * self.q_spacing;
            return Ok(vec![(self.q_min - half).max(0.0), self.q_min + half]);
        }
        let shells = ((span / self.q_spacing).ceil() as usize).max(1);
        Ok(vector::linspace(self.q_min, self.q_max, shells + 1))
    }

    fn shell_points(&self, q: f64) -> usize {
        match self.npts_density {
            Some(density) => ((density * 4.0 * PI * q * q).round() as usize).max(1),
            None => self.npts.max(1),
        }
    }

    fn wants_debye_waller(&self) -> bool {
        self.debye_waller && self.weighting == Weighting::Coherent && self.temperature > 0.0
    }
}

/// Orientation-averaged S(|Q|, E), one row per |Q| shell.
pub fn powder_map(source: PhononSource<'_>, parameters: &PowderParameters) -> VibroResult<SpectrumResult> {
    let record = source.require_force_constants("powder averaging")?;
    let edges = parameters.shell_edges()?;
    let shells: Vec<f64> = if parameters.q_max == parameters.q_min {
        vec![parameters.q_min]
    } else {
        Axis::new(edges.clone(), "1/Å").centres()
    };
    let structure = record.primitive();
    let cell = *structure.cell();

    let mut requests = Vec::new();
    let mut shell_weights: Vec<Vec<(Vec3, f64)>> = Vec::with_capacity(shells.len());
    for &q in &shells {
        let directions = sample_sphere(parameters.sampling, parameters.shell_points(q), parameters.jitter);
        debug!(q, orientations = directions.len(), "sampled powder shell");
        let mut shell = Vec::with_capacity(directions.len());
        for sample in directions {
            let q_cart = vector::scale(&sample.direction, q);
            requests.push(ModeRequest::at(cartesian_to_fractional_q(&q_cart, &cell)));
            shell.push((q_cart, sample.weight));
        }
        shell_weights.push(shell);
    }

    let spectrum = kernel_boundary("powder S(|q|,w)", || {
        let solver = ModeSolver::new(record);
        let modes = solver.solve_all(&requests, parameters.n_threads)?;
        let debye_waller = if parameters.wants_debye_waller() {
            Some(debye_waller_tensors(
                &solver,
                parameters.temperature,
                parameters.grid_spacing,
                parameters.n_threads,
            )?)
        } else {
            None
        };
        let weighter = ModeWeighter {
            weighting: parameters.weighting,
            temperature: parameters.temperature,
            cartesian_positions: structure.cartesian_positions(),
            masses: record.masses(),
            scattering_lengths: record.scattering_lengths(),
            debye_waller,
        };
        let energy_edges = energy_edges(
            modes.iter().flat_map(|set| set.energies.iter().copied()),
            parameters.energy_bins,
            parameters.energy_window,
        )?;

        let mut z = vec![vec![0.0; parameters.energy_bins]; shells.len()];
        let mut cursor = modes.iter();
        for (row, shell) in z.iter_mut().zip(&shell_weights) {
            for ((q_cart, weight), set) in shell.iter().zip(cursor.by_ref()) {
                let weights = weighter.weights(q_cart, set)?;
                accumulate(row, &energy_edges, &set.energies, &weights, *weight);
            }
        }

        gaussian_smooth_map(
            &mut z,
            GaussianSmoothingInput::new(&energy_edges, parameters.energy_fwhm, MapAxis::Y),
        )?;
        if let Some(q_fwhm) = parameters.q_fwhm {
            gaussian_smooth_map(&mut z, GaussianSmoothingInput::new(&edges, q_fwhm, MapAxis::X))?;
        }

        if let Some(constraint) = &parameters.constraint {
            let energies = Axis::new(energy_edges.clone(), "meV").centres();
            for (row, &q) in z.iter_mut().zip(&shells) {
                for (value, &energy) in row.iter_mut().zip(&energies) {
                    if !constraint.accessible(q, energy) {
                        *value = 0.0;
                    }
                }
            }
        }

        let z_unit = match parameters.weighting {
            Weighting::Coherent => "arb. units",
            Weighting::Dos => "modes/meV",
        };
        Spectrum2D::new(Axis::new(edges.clone(), "1/Å"), Axis::new(energy_edges, "meV"), z, z_unit)
    })?;

    info!(
        shells = spectrum.shape().0,
        energy_bins = spectrum.shape().1,
        orientations = requests.len(),
        "computed powder map"
    );
    Ok(SpectrumResult {
        parameters: super::parameter_snapshot(parameters)?,
        spectrum,
        segments: None,
    })
}
