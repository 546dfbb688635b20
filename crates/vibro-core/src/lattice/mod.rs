//! Lattice classification and reciprocal-space paths.

pub mod bulk;
pub mod classify;
pub mod polarization;
pub mod qpath;

pub use bulk::{BulkLattice, BulkPathOracle, StandardBulkPaths, identify_bulk_lattice};
pub use classify::{LATTICE_TOLERANCE, LatticeTag, PlanarMetric, classify};
pub use polarization::parse_polarization;
pub use qpath::{
    DEFAULT_Q_SPACING, GAMMA, PhonopyBand, QPath, QPoint, QSegment, SampledPath,
    high_symmetry_path, merge_labels, parse_custom_path, point_label,
};
