pub mod constants;
pub mod elements;

pub use elements::{ElementData, atomic_mass, coherent_scattering_length, element_by_symbol};
