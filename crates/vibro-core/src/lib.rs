pub mod common;
pub mod dielectric;
pub mod domain;
pub mod export;
pub mod kernels;
pub mod lattice;
pub mod numerics;
pub mod phonopy;
pub mod planner;
pub mod spectra;
pub mod support;
pub mod workflow;
