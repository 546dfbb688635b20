use super::SpectrumResult;
use super::debye_waller::{DEFAULT_GRID_SPACING, debye_waller_tensors};
use super::modes::{ModeRequest, ModeSolver, PhononSource};
use super::sampling::{ModeWeighter, Weighting, accumulate};
use crate::domain::structure::fractional_to_cartesian_q;
use crate::domain::{Axis, Spectrum2D, VibroError, VibroResult};
use crate::numerics::vector::{self, Vec3};
use crate::support::kernel_boundary;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_WINDOW_BINS: usize = 20;

/// Constant-energy cut through reciprocal space, Q = Q0 + α·h + β·k (r.l.u.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QPlaneParameters {
    pub origin: Vec3,
    pub h: Vec3,
    pub k: Vec3,
    pub h_extent: f64,
    pub k_extent: f64,
    pub h_points: usize,
    pub k_points: usize,
    /// Centre of the energy window (meV).
    pub energy_centre: f64,
    /// Half-width of the energy window (meV).
    pub energy_half_width: f64,
    pub energy_bins: usize,
    pub temperature: f64,
    pub weighting: Weighting,
    pub debye_waller: bool,
    pub grid_spacing: f64,
    pub n_threads: usize,
}

impl Default for QPlaneParameters {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            h: [1.0, 0.0, 0.0],
            k: [0.0, 1.0, 0.0],
            h_extent: 1.0,
            k_extent: 1.0,
            h_points: 40,
            k_points: 40,
            energy_centre: 10.0,
            energy_half_width: 1.0,
            energy_bins: DEFAULT_WINDOW_BINS,
            temperature: 0.0,
            weighting: Weighting::Coherent,
            debye_waller: true,
            grid_spacing: DEFAULT_GRID_SPACING,
            n_threads: 1,
        }
    }
}

impl QPlaneParameters {
    fn validate(&self) -> VibroResult<()> {
        let finite = [self.h_extent, self.k_extent, self.energy_centre, self.energy_half_width]
            .iter()
            .all(|value| value.is_finite())
            && [self.origin, self.h, self.k].iter().all(vector::is_finite);
        if !finite || self.h_extent < 0.0 || self.k_extent < 0.0 {
            return Err(VibroError::invalid_input("q-plane extents and vectors must be finite, extents >= 0"));
        }
        if self.energy_half_width <= 0.0 || self.energy_bins == 0 {
            return Err(VibroError::invalid_input(format!(
                "q-plane energy window needs a positive half-width and bins, got {} meV / {} bins",
                self.energy_half_width, self.energy_bins
            )));
        }
        Ok(())
    }

    fn wants_debye_waller(&self) -> bool {
        self.debye_waller && self.weighting == Weighting::Coherent && self.temperature > 0.0
    }
}

fn plane_axis(extent: f64, points: usize) -> (Vec<f64>, Vec<f64>) {
    let values = vector::linspace(-extent, extent, points + 1);
    let fallback = if extent > 0.0 { 2.0 * extent } else { 1.0 };
    let edges = vector::edges_around(&values, fallback);
    (values, edges)
}

/// Gaussian-weighted mean of S(Q, E) over the window `e_c ± ΔE` on a Q-plane grid.
pub fn q_plane_section(source: PhononSource<'_>, parameters: &QPlaneParameters) -> VibroResult<SpectrumResult> {
    let record = source.require_force_constants("Q-plane sections")?;
    parameters.validate()?;
    let (alphas, alpha_edges) = plane_axis(parameters.h_extent, parameters.h_points);
    let (betas, beta_edges) = plane_axis(parameters.k_extent, parameters.k_points);
    let requests: Vec<ModeRequest> = alphas
        .iter()
        .flat_map(|&alpha| {
            betas.iter().map(move |&beta| {
                let q = vector::add(
                    &parameters.origin,
                    &vector::add(&vector::scale(&parameters.h, alpha), &vector::scale(&parameters.k, beta)),
                );
                ModeRequest::at(q)
            })
        })
        .collect();

    let structure = record.primitive();
    let reciprocal = structure.reciprocal_lattice();
    let spectrum = kernel_boundary("Q-plane section", || {
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

        let centre = parameters.energy_centre;
        let half_width = parameters.energy_half_width;
        let energy_edges = vector::linspace(centre - half_width, centre + half_width, parameters.energy_bins + 1);
        let sigma = 0.5 * half_width;
        let window: Vec<f64> = Axis::new(energy_edges.clone(), "meV")
            .centres()
            .iter()
            .map(|energy| (-(energy - centre).powi(2) / (2.0 * sigma * sigma)).exp())
            .collect();

        let mut z = vec![vec![0.0; betas.len()]; alphas.len()];
        let mut histogram = vec![0.0; parameters.energy_bins];
        for (index, set) in modes.iter().enumerate() {
            let q_cart = fractional_to_cartesian_q(&set.q, &reciprocal);
            let weights = weighter.weights(&q_cart, set)?;
            histogram.fill(0.0);
            accumulate(&mut histogram, &energy_edges, &set.energies, &weights, 1.0);
            let mean = histogram.iter().zip(&window).map(|(value, factor)| value * factor).sum::<f64>()
                / parameters.energy_bins as f64;
            z[index / betas.len()][index % betas.len()] = mean;
        }
        Spectrum2D::new(Axis::new(alpha_edges, "r.l.u."), Axis::new(beta_edges, "r.l.u."), z, "arb. units")
    })?;

    info!(
        grid = ?spectrum.shape(),
        energy_centre = parameters.energy_centre,
        "computed Q-plane section"
    );
    Ok(SpectrumResult {
        parameters: super::parameter_snapshot(parameters)?,
        spectrum,
        segments: None,
    })
}
