use std::ops::RangeInclusive;

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{AngleAxis, SweepConfiguration};

/// Number of angles drawn when an axis is randomized.
pub const RANDOM_SAMPLES: usize = 10;

/// Random phi angles fall in `[0, 360)`.
pub const RANDOM_PHI_DEG: std::ops::Range<u32> = 0..360;
/// Random theta angles fall in `[5, 50]`.
pub const RANDOM_THETA_DEG: RangeInclusive<u32> = 5..=50;

pub fn select_phi_angles<R: Rng + ?Sized>(config: &SweepConfiguration, rng: &mut R) -> Vec<f64> {
    match config.phi.expand() {
        Some(angles) => {
            info!("Using predefined phi angles: {:?}", angles);
            angles
        }
        None => {
            let angles = draw(rng, RANDOM_PHI_DEG.start, RANDOM_PHI_DEG.end - 1);
            info!("Randomly selected phi angles: {:?}", angles);
            angles
        }
    }
}

pub fn select_theta_angles<R: Rng + ?Sized>(config: &SweepConfiguration, rng: &mut R) -> Vec<f64> {
    match config.theta.expand() {
        Some(angles) => {
            info!("Using predefined theta angles: {:?}", angles);
            angles
        }
        None => {
            let angles = draw(rng, *RANDOM_THETA_DEG.start(), *RANDOM_THETA_DEG.end());
            info!("Randomly selected theta angles: {:?}", angles);
            angles
        }
    }
}

// whole degrees, both bounds inclusive
fn draw<R: Rng + ?Sized>(rng: &mut R, low: u32, high: u32) -> Vec<f64> {
    (0..RANDOM_SAMPLES)
        .map(|_| f64::from(rng.random_range(low..=high)))
        .collect()
}

/// Random source for angle selection, reproducible when a seed is given.
pub fn angle_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

/// Number of points one frequency pass visits, when both axes are fixed.
pub fn points_per_frequency(config: &SweepConfiguration) -> Option<usize> {
    let axis_len = |axis: &AngleAxis| axis.expand().map(|a| a.len());
    Some(axis_len(&config.phi)? * axis_len(&config.theta)?)
}
