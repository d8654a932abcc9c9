//! Seeded count distributions for hourly sales draws.
//!
//! Every random draw is made from an RNG seeded for that exact draw, derived
//! from the run seed. Nothing shares a mutable generator, so results do not
//! depend on thread scheduling or on which other locales are in the run.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution, Poisson};
use sha2::{Digest, Sha256};

/// Derive an independent sub-seed from a parent seed and a labelled key.
pub fn derive_seed(parent: u64, label: &str, key: i64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(parent.to_le_bytes());
    hasher.update(label.as_bytes());
    hasher.update(key.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// RNG for one labelled draw under `seed`.
pub fn seeded_rng(seed: u64, label: &str, key: i64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(seed, label, key))
}

/// Distribution of the homogeneous baseline count for one hour.
pub trait BaselineDistribution: Send + Sync + std::fmt::Debug {
    /// Mean count per hour.
    fn rate(&self) -> f64;

    fn sample(&self, rng: &mut StdRng) -> u64;
}

/// Poisson-distributed hourly count with mean `rate`.
#[derive(Debug, Clone)]
pub struct PoissonBaseline {
    rate: f64,
    dist: Option<Poisson<f64>>,
}

impl PoissonBaseline {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            dist: Poisson::new(rate).ok(),
        }
    }
}

impl BaselineDistribution for PoissonBaseline {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn sample(&self, rng: &mut StdRng) -> u64 {
        match &self.dist {
            Some(dist) => dist.sample(rng) as u64,
            None => 0,
        }
    }
}

/// Noise-free baseline: always the rounded-up mean.
#[derive(Debug, Clone)]
pub struct ExpectedBaseline {
    pub rate: f64,
}

impl BaselineDistribution for ExpectedBaseline {
    fn rate(&self) -> f64 {
        self.rate
    }

    fn sample(&self, _rng: &mut StdRng) -> u64 {
        self.rate.max(0.0).ceil() as u64
    }
}

/// Keep each of `count` events independently with probability `accept`.
///
/// Binomial thinning of a Poisson count yields a Poisson count with mean
/// `rate * accept`.
pub fn thin(rng: &mut StdRng, count: u64, accept: f64) -> u64 {
    let accept = if accept.is_nan() {
        0.0
    } else {
        accept.clamp(0.0, 1.0)
    };
    if count == 0 || accept == 0.0 {
        return 0;
    }
    if accept == 1.0 {
        return count;
    }
    match Binomial::new(count, accept) {
        Ok(dist) => dist.sample(rng).min(count),
        Err(_) => 0,
    }
}
