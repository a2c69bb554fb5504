//! Per-segment trace lines.
//!
//! Every segment an endpoint sends, receives or (receiver only) drops is
//! logged on the [`TARGET`] log target as one line:
//!
//! ```text
//! snd      12.34  DATA   4322  1000
//! ```
//!
//! direction, milliseconds since the clock started, segment type, sequence
//! number modulo 65536, payload length.  The lines are observability only.

use std::time::Instant;

use crate::packet::{Segment, SegmentKind, DISPLAY_SEQ_MODULUS};

/// Log target for trace lines, so `RUST_LOG=ptp::trace=info` isolates them.
pub const TARGET: &str = "ptp::trace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Snd,
    Rcv,
    Drp,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Snd => "snd",
            Direction::Rcv => "rcv",
            Direction::Drp => "drp",
        }
    }
}

/// Time origin for trace lines.  Copy it freely; all copies share the origin.
#[derive(Debug, Clone, Copy)]
pub struct TraceClock {
    origin: Instant,
}

impl TraceClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Log `segment` travelling in `direction`.
    pub fn segment(&self, direction: Direction, segment: &Segment) {
        self.record(direction, segment.kind, segment.seq, segment.payload.len());
    }

    /// Log a segment known only by its header fields (e.g. a stored retransmission).
    pub fn record(&self, direction: Direction, kind: SegmentKind, seq: u64, len: usize) {
        log::info!(
            target: TARGET,
            "{}",
            format_line(direction, self.elapsed_ms(), kind, seq, len)
        );
    }
}

fn format_line(direction: Direction, elapsed_ms: f64, kind: SegmentKind, seq: u64, len: usize) -> String {
    format!(
        "{:<4}{:>10.2}  {:<6}{:>5}  {:>4}",
        direction.as_str(),
        elapsed_ms,
        kind.as_str(),
        seq % DISPLAY_SEQ_MODULUS,
        len
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_reduces_sequence_to_sixteen_bits() {
        let line = format_line(Direction::Snd, 1.5, SegmentKind::Data, 65_536 + 17, 1000);
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields, ["snd", "1.50", "DATA", "17", "1000"]);
    }

    #[test]
    fn control_segment_has_zero_length() {
        let line = format_line(Direction::Rcv, 0.0, SegmentKind::Ack, 42, 0);
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields, ["rcv", "0.00", "ACK", "42", "0"]);
    }
}
