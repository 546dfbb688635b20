pub mod errors;
pub mod spectrum;
pub mod structure;
pub mod vibrational;

pub use errors::{ErrorCategory, ErrorKind, ExitStatus, VibroError, VibroResult};
pub use spectrum::{Axis, Spectrum2D, XTick};
pub use structure::{
    Periodicity, Site, Structure, cartesian_to_fractional_q, fractional_to_cartesian_q,
    reciprocal_lattice,
};
pub use vibrational::{AccuracyTier, Rank3, VibrationalData, VibrationalTiers};
