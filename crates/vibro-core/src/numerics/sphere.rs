use super::vector::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const JITTER_SEED: u64 = 0x5eed_0f_5e11;
const RANDOM_SPHERE_SEED: u64 = 0x0dd_ba11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SphereSampling {
    #[default]
    Golden,
    SphericalPolarGrid,
    RandomSphere,
}

/// Unit direction with its quadrature weight; weights of one sampling sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedDirection {
    pub direction: Vec3,
    pub weight: f64,
}

pub fn sample_sphere(scheme: SphereSampling, count: usize, jitter: bool) -> Vec<WeightedDirection> {
    let count = count.max(1);
    let directions = match scheme {
        SphereSampling::Golden => golden_sphere(count, jitter),
        SphereSampling::SphericalPolarGrid => return spherical_polar_grid(count),
        SphereSampling::RandomSphere => random_sphere(count),
    };
    let weight = 1.0 / directions.len() as f64;
    directions
        .into_iter()
        .map(|direction| WeightedDirection { direction, weight })
        .collect()
}

/// Fibonacci spiral over the sphere; jitter perturbs the azimuth of every point.
pub fn golden_sphere(count: usize, jitter: bool) -> Vec<Vec3> {
    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    let mut rng = StdRng::seed_from_u64(JITTER_SEED);
    (0..count)
        .map(|index| {
            let z = 1.0 - (2.0 * index as f64 + 1.0) / count as f64;
            let radius = (1.0 - z * z).max(0.0).sqrt();
            let mut phi = golden_angle * index as f64;
            if jitter {
                phi += golden_angle * (rng.random::<f64>() - 0.5);
            }
            [radius * phi.cos(), radius * phi.sin(), z]
        })
        .collect()
}

fn spherical_polar_grid(count: usize) -> Vec<WeightedDirection> {
    let n_theta = ((count as f64 / 2.0).sqrt().round() as usize).max(1);
    let n_phi = count.div_ceil(n_theta).max(1);
    let mut points = Vec::with_capacity(n_theta * n_phi);
    for itheta in 0..n_theta {
        let theta = PI * (itheta as f64 + 0.5) / n_theta as f64;
        for iphi in 0..n_phi {
            let phi = 2.0 * PI * (iphi as f64 + 0.5) / n_phi as f64;
            points.push(WeightedDirection {
                direction: [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()],
                weight: theta.sin(),
            });
        }
    }
    let total: f64 = points.iter().map(|point| point.weight).sum();
    for point in &mut points {
        point.weight /= total;
    }
    points
}

fn random_sphere(count: usize) -> Vec<Vec3> {
    let mut rng = StdRng::seed_from_u64(RANDOM_SPHERE_SEED);
    (0..count)
        .map(|_| {
            let z: f64 = rng.random_range(-1.0..=1.0);
            let phi: f64 = rng.random_range(0.0..2.0 * PI);
            let radius = (1.0 - z * z).max(0.0).sqrt();
            [radius * phi.cos(), radius * phi.sin(), z]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::vector::norm;

    #[test]
    fn all_schemes_produce_unit_vectors_with_unit_weight() {
        for scheme in [
            SphereSampling::Golden,
            SphereSampling::SphericalPolarGrid,
            SphereSampling::RandomSphere,
        ] {
            let points = sample_sphere(scheme, 50, true);
            assert!(!points.is_empty());
            let total: f64 = points.iter().map(|point| point.weight).sum();
            assert!((total - 1.0).abs() < 1.0e-12, "{scheme:?} weight {total}");
            for point in &points {
                assert!((norm(&point.direction) - 1.0).abs() < 1.0e-12);
            }
        }
    }

    #[test]
    fn golden_sphere_averages_to_isotropic_second_moment() {
        let points = golden_sphere(400, false);
        let zz: f64 = points.iter().map(|p| p[2] * p[2]).sum::<f64>() / points.len() as f64;
        assert!((zz - 1.0 / 3.0).abs() < 1.0e-3);
    }

    #[test]
    fn jitter_is_deterministic() {
        assert_eq!(golden_sphere(20, true), golden_sphere(20, true));
    }
}
