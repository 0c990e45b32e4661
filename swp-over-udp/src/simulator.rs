//! Synthetic datagram loss.
//!
//! Real networks drop packets.  To exercise retransmission without depending
//! on actual network conditions, every [`crate::link::Link`] implementation
//! in this crate consults a [`LossModel`] on each send and each receive
//! attempt and silently discards the datagram when it says so.
//!
//! The model is a plain Bernoulli trial per datagram.  Pass a seed to make a
//! lossy test run reproducible.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{check_probability, ConfigError};

/// Per-datagram drop decision with a fixed probability.
#[derive(Debug)]
pub struct LossModel {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl LossModel {
    /// A model that never drops anything.
    pub fn lossless() -> Self {
        Self {
            probability: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Drop each datagram with `probability`, seeding from `seed` when given
    /// and from the OS otherwise.
    pub fn new(probability: f64, seed: Option<u64>) -> Result<Self, ConfigError> {
        check_probability(probability)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            probability,
            rng: Mutex::new(rng),
        })
    }

    /// Configured drop probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Roll the dice for one datagram.
    pub fn should_drop(&self) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        if self.probability >= 1.0 {
            return true;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random::<f64>() < self.probability
    }
}

impl Default for LossModel {
    fn default() -> Self {
        Self::lossless()
    }
}
