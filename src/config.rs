//! Endpoint configuration.
//!
//! `main.rs` turns command-line arguments into a [`SenderConfig`] or a
//! [`ReceiverConfig`]; the library only ever sees these validated structs.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::packet::MSS;
use crate::simulator::{LossSimulator, SimulatorError};

/// SYN and FIN are each sent at most this many times by default.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Errors raised while validating configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("window of {0} bytes cannot hold a single 1000-byte segment")]
    WindowTooSmall(usize),
    #[error("retransmission timeout must be greater than zero")]
    ZeroTimeout,
    #[error("attempt bound must be at least 1")]
    ZeroAttempts,
    #[error(transparent)]
    Loss(#[from] SimulatorError),
}

/// Sender-side protocol knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Maximum number of unacknowledged DATA segments.
    pub window_segments: NonZeroUsize,
    /// Retransmission timeout, also the wait per SYN/FIN attempt.
    pub rto: Duration,
    /// Bound on SYN attempts and on FIN attempts.
    pub attempts: u32,
}

impl TransferConfig {
    /// Derive the window from a byte budget: `max_window_bytes / MSS` segments.
    pub fn new(max_window_bytes: usize, rto: Duration, attempts: u32) -> Result<Self, ConfigError> {
        let window_segments = NonZeroUsize::new(max_window_bytes / MSS)
            .ok_or(ConfigError::WindowTooSmall(max_window_bytes))?;
        if rto.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self {
            window_segments,
            rto,
            attempts,
        })
    }
}

/// Everything the sender process needs.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub local: SocketAddr,
    pub peer: SocketAddr,
    pub input: PathBuf,
    pub transfer: TransferConfig,
}

/// Everything the receiver process needs.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub local: SocketAddr,
    pub peer: SocketAddr,
    pub output: PathBuf,
    /// Drop probability for inbound SYN, DATA and FIN segments.
    pub forward_loss: f64,
    /// Drop probability for outbound ACK segments.
    pub reverse_loss: f64,
    /// Seed for reproducible loss decisions; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl ReceiverConfig {
    /// Build the forward and reverse loss simulators.
    pub fn loss_simulators(&self) -> Result<(LossSimulator, LossSimulator), ConfigError> {
        let pair = match self.seed {
            Some(seed) => (
                LossSimulator::seeded(self.forward_loss, seed)?,
                // Distinct stream so the two directions are independent.
                LossSimulator::seeded(self.reverse_loss, seed.wrapping_add(1))?,
            ),
            None => (
                LossSimulator::new(self.forward_loss)?,
                LossSimulator::new(self.reverse_loss)?,
            ),
        };
        Ok(pair)
    }
}
