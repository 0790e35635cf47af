//! Seeded transmission delay sources for deterministic runs.

use dvroute_env::{DelaySource, FixedDelay, NodeId, SimError};
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Exp;
use serde::{Deserialize, Serialize};

/// Uniformly distributed delays drawn from a seeded ChaCha8 RNG.
///
/// The default range `[1, 10)` matches the classic exercise's
/// `1 + 9 * rand()` per transmission.
pub struct UniformDelay {
    /// Seed this source was built from
    seed: u64,

    rng: ChaCha8Rng,

    dist: Uniform<f64>,
}

impl UniformDelay {
    /// Creates a source producing delays in `[min, max)`.
    pub fn new(seed: u64, min: f64, max: f64) -> Result<Self, SimError> {
        if !min.is_finite() || min < 0.0 {
            return Err(SimError::InvalidDelay(min));
        }
        if !max.is_finite() || max <= min {
            return Err(SimError::InvalidDelay(max));
        }

        Ok(Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            dist: Uniform::new(min, max),
        })
    }

    /// Returns the seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl DelaySource for UniformDelay {
    fn delay(&mut self, _from: NodeId, _to: NodeId) -> f64 {
        self.dist.sample(&mut self.rng)
    }
}

/// A fixed propagation delay plus exponentially distributed jitter.
pub struct ExponentialDelay {
    base: f64,

    rng: ChaCha8Rng,

    jitter: Exp<f64>,
}

impl ExponentialDelay {
    /// Creates a source producing `base + Exp(1 / mean_jitter)`.
    pub fn new(seed: u64, base: f64, mean_jitter: f64) -> Result<Self, SimError> {
        if !base.is_finite() || base < 0.0 {
            return Err(SimError::InvalidDelay(base));
        }
        if !mean_jitter.is_finite() || mean_jitter <= 0.0 {
            return Err(SimError::InvalidDelay(mean_jitter));
        }
        let jitter = Exp::new(1.0 / mean_jitter).map_err(|_| SimError::InvalidDelay(mean_jitter))?;

        Ok(Self {
            base,
            rng: ChaCha8Rng::seed_from_u64(seed),
            jitter,
        })
    }
}

impl DelaySource for ExponentialDelay {
    fn delay(&mut self, _from: NodeId, _to: NodeId) -> f64 {
        self.base + self.jitter.sample(&mut self.rng)
    }
}

/// Serializable description of a delay source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DelayModel {
    /// Every transmission takes `delay`
    Fixed { delay: f64 },

    /// Uniform in `[min, max)`
    Uniform { min: f64, max: f64 },

    /// `base` plus exponential jitter with mean `mean_jitter`
    Exponential { base: f64, mean_jitter: f64 },
}

impl DelayModel {
    /// Builds the delay source, seeding any RNG from `seed`.
    pub fn build(&self, seed: u64) -> Result<Box<dyn DelaySource>, SimError> {
        Ok(match *self {
            DelayModel::Fixed { delay } => {
                if !delay.is_finite() || delay < 0.0 {
                    return Err(SimError::InvalidDelay(delay));
                }
                Box::new(FixedDelay(delay))
            }
            DelayModel::Uniform { min, max } => Box::new(UniformDelay::new(seed, min, max)?),
            DelayModel::Exponential { base, mean_jitter } => {
                Box::new(ExponentialDelay::new(seed, base, mean_jitter)?)
            }
        })
    }
}

impl Default for DelayModel {
    fn default() -> Self {
        DelayModel::Uniform {
            min: 1.0,
            max: 10.0,
        }
    }
}
