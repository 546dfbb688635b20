pub mod broadening;
pub mod grid;
pub mod linalg;
pub mod sphere;
pub mod vector;

pub type DenseComplexMatrix = faer::Mat<num_complex::Complex64>;

pub use broadening::{
    BroadeningError, GaussianSmoothingInput, LorentzianSumInput, MapAxis, gaussian_smooth_map,
    multilorentz,
};
pub use linalg::{EigenError, HermitianEigen, eigh, hermitian_part};
pub use sphere::{SphereSampling, WeightedDirection, sample_sphere};
pub use vector::{Mat3, Vec3};
