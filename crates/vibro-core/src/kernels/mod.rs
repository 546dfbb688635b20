//! Inelastic neutron-scattering kernels over force constants or precomputed modes.

pub mod debye_waller;
pub mod modes;
pub mod powder;
pub mod qplane;
pub mod sampling;
pub mod single_crystal;

pub use debye_waller::{DEFAULT_GRID_SPACING, debye_waller_exponent, debye_waller_tensors};
pub use modes::{ModeRequest, ModeSolver, PhononSource, PrecomputedModes, QModes};
pub use powder::{KinematicConstraint, PowderParameters, powder_map};
pub use qplane::{QPlaneParameters, q_plane_section};
pub use sampling::{DEFAULT_ENERGY_BINS, Weighting};
pub use single_crystal::{SingleCrystalParameters, single_crystal_map};

use crate::domain::{Spectrum2D, VibroError, VibroResult};
use serde::Serialize;
use serde_json::Value;

/// A kernel's map together with the parameters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumResult {
    pub spectrum: Spectrum2D,
    pub parameters: Value,
    /// Row ranges of the path segments, for maps along a q-path.
    pub segments: Option<Vec<(usize, usize)>>,
}

fn parameter_snapshot<T: Serialize>(parameters: &T) -> VibroResult<Value> {
    serde_json::to_value(parameters)
        .map_err(|error| VibroError::invalid_input(format!("cannot record kernel parameters: {error}")))
}
