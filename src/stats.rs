//! Sender-side lifecycle counters.
//!
//! The control loop bumps the data counters while the ACK listener task bumps
//! the ACK counter concurrently, so every counter is an atomic.  None of them
//! feed back into protocol decisions; they exist for the final report.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the control loop and the ACK listener.
#[derive(Debug, Default)]
pub struct TransferStats {
    original_bytes: AtomicU64,
    data_segments: AtomicU64,
    retransmissions: AtomicU64,
    acks_received: AtomicU64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// First transmission of a DATA segment carrying `len` payload bytes.
    pub fn record_data_sent(&self, len: usize) {
        self.original_bytes.fetch_add(len as u64, Ordering::Relaxed);
        self.data_segments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retransmission(&self) {
        self.retransmissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Every ACK counts, duplicates included.
    pub fn record_ack(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransferReport {
        TransferReport {
            original_bytes: self.original_bytes.load(Ordering::Relaxed),
            data_segments: self.data_segments.load(Ordering::Relaxed),
            retransmitted_segments: self.retransmissions.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TransferStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferReport {
    /// Payload bytes sent, excluding retransmissions.
    pub original_bytes: u64,
    /// DATA segments sent, excluding retransmissions.
    pub data_segments: u64,
    pub retransmitted_segments: u64,
    /// ACK segments received, duplicates included.
    pub acks_received: u64,
}

impl std::fmt::Display for TransferReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Amount of (original) Data Transferred (in bytes) (excluding retransmissions): {}",
            self.original_bytes
        )?;
        writeln!(
            f,
            "Number of Data Segments Sent (excluding retransmissions): {}",
            self.data_segments
        )?;
        writeln!(
            f,
            "Number of Retransmitted Data Segments: {}",
            self.retransmitted_segments
        )?;
        write!(f, "Number of Acknowledgements Received: {}", self.acks_received)
    }
}
