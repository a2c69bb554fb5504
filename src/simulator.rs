//! Artificial segment loss.
//!
//! Real networks drop datagrams.  To exercise the retransmission machinery on
//! a loopback link, the receiver runs every inbound forward segment (SYN, DATA,
//! FIN) through one [`LossSimulator`] and every outbound ACK through another.
//! A dropped segment is simply never delivered; recovering from it is the
//! sender's retransmission timer's job.
//!
//! Each decision is an independent Bernoulli draw.  Seed the simulator with
//! [`LossSimulator::seeded`] to make a lossy run reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Errors raised when constructing a [`LossSimulator`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulatorError {
    #[error("loss probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),
}

/// Per-segment drop decision with a fixed probability.
#[derive(Debug)]
pub struct LossSimulator {
    probability: f64,
    rng: StdRng,
}

impl LossSimulator {
    /// Create a simulator dropping with `probability`, seeded from the OS.
    pub fn new(probability: f64) -> Result<Self, SimulatorError> {
        Self::with_rng(probability, StdRng::from_os_rng())
    }

    /// Create a simulator whose drop decisions are reproducible for `seed`.
    pub fn seeded(probability: f64, seed: u64) -> Result<Self, SimulatorError> {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }

    /// A simulator that never drops anything.
    pub fn lossless() -> Self {
        Self {
            probability: 0.0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    fn with_rng(probability: f64, rng: StdRng) -> Result<Self, SimulatorError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SimulatorError::ProbabilityOutOfRange(probability));
        }
        Ok(Self { probability, rng })
    }

    /// Decide the fate of one segment: `true` means drop it.
    pub fn should_drop(&mut self) -> bool {
        self.probability > 0.0 && self.rng.random_bool(self.probability)
    }
}
