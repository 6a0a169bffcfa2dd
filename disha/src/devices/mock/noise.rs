//! Echo noise model
//!
//! Gaussian range jitter plus random missed echoes, seeded for reproducible
//! runs.

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, StandardNormal, Uniform};

pub struct EchoNoise {
    rng: SmallRng,
    range_stddev_cm: f32,
    dropout: f32,
}

impl EchoNoise {
    /// `seed == 0` draws from OS entropy
    pub fn new(seed: u64, range_stddev_cm: f32, dropout: f32) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self {
            rng,
            range_stddev_cm,
            dropout: dropout.clamp(0.0, 1.0),
        }
    }

    /// Jittered range, never below zero
    pub fn perturb(&mut self, range_cm: f32) -> f32 {
        if self.range_stddev_cm == 0.0 {
            return range_cm;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        (range_cm + n * self.range_stddev_cm).max(0.0)
    }

    /// True when this ping should get no echo
    pub fn drops_echo(&mut self) -> bool {
        self.dropout > 0.0 && Uniform::new(0.0f32, 1.0).sample(&mut self.rng) < self.dropout
    }
}
