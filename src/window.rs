//! Sender window manager: the outstanding-segment table and its timers.
//!
//! [`SendWindow`] keeps every DATA segment that has been sent but not yet
//! acknowledged, keyed by slot (the segment's index in the file).
//!
//! # Protocol contract
//!
//! - A slot is present **iff** its segment was sent and not yet acknowledged.
//! - At most `capacity` slots are present at once.
//! - An ACK removes exactly the slot whose `seq + payload_len` equals the ACK
//!   value.  An ACK matching no slot (duplicate, stale) changes nothing.
//! - Each slot carries the time of its most recent transmission; once that is
//!   `rto` old the slot is resent unchanged (selective, per-slot timers, not
//!   go-back-N).
//!
//! The table is shared between the control loop (which inserts and sweeps)
//! and the ACK listener task (which removes).  A slot's bytes and deadline
//! live in one entry behind one lock, so neither side can observe half an
//! update.  Removals wake the control loop through a [`Notify`] instead of
//! letting it spin.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::config::TransferConfig;
use crate::connection::{ConnError, Signals};
use crate::packet::{Segment, SegmentKind, MSS};
use crate::socket::{Socket, SocketError};
use crate::stats::TransferStats;
use crate::trace::{Direction, TraceClock};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split `data` into DATA segments of at most [`MSS`] bytes.
///
/// Segment `i` carries sequence number `first_seq + MSS * i`; only the last
/// segment may be shorter than [`MSS`].  Empty input yields no segments.
pub fn segmentize(data: &[u8], first_seq: u64) -> Vec<Segment> {
    data.chunks(MSS)
        .enumerate()
        .map(|(i, chunk)| Segment::data(first_seq + (i * MSS) as u64, chunk.to_vec()))
        .collect()
}

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/// One outstanding segment.
#[derive(Debug)]
struct InFlight {
    /// Encoded segment, resent verbatim on timeout.
    bytes: Vec<u8>,
    seq: u64,
    len: usize,
    /// Start of the most recent transmission.
    sent_at: Instant,
}

impl InFlight {
    fn end_seq(&self) -> u64 {
        self.seq + self.len as u64
    }
}

// ---------------------------------------------------------------------------
// SendWindow
// ---------------------------------------------------------------------------

/// Outstanding-segment table plus the machinery to (re)transmit its entries.
#[derive(Debug)]
pub struct SendWindow {
    socket: Arc<Socket>,
    peer: SocketAddr,
    capacity: usize,
    rto: Duration,
    table: Mutex<BTreeMap<usize, InFlight>>,
    /// Signalled whenever a slot is acknowledged.
    room: Notify,
    stats: Arc<TransferStats>,
    clock: TraceClock,
}

impl SendWindow {
    pub fn new(
        socket: Arc<Socket>,
        peer: SocketAddr,
        config: &TransferConfig,
        stats: Arc<TransferStats>,
        clock: TraceClock,
    ) -> Self {
        Self {
            socket,
            peer,
            capacity: config.window_segments.get(),
            rto: config.rto,
            table: Mutex::new(BTreeMap::new()),
            room: Notify::new(),
            stats,
            clock,
        }
    }

    /// Number of segments awaiting acknowledgement.
    pub async fn in_flight(&self) -> usize {
        self.table.lock().await.len()
    }

    /// Slots currently awaiting acknowledgement, ascending.
    pub async fn outstanding_slots(&self) -> Vec<usize> {
        self.table.lock().await.keys().copied().collect()
    }

    /// Transmit `segment` for the first time and record it under `slot`.
    ///
    /// The entry is inserted before the datagram leaves, and the lock is held
    /// across the send, so an ACK can never race ahead of its own slot.
    pub async fn submit(&self, slot: usize, segment: &Segment) -> Result<(), ConnError> {
        let bytes = segment.encode().map_err(SocketError::from)?;
        let len = segment.payload.len();

        let mut table = self.table.lock().await;
        debug_assert!(
            table.len() < self.capacity,
            "submit called on a full window ({} / {})",
            table.len(),
            self.capacity
        );
        let entry = table.entry(slot).or_insert(InFlight {
            bytes,
            seq: segment.seq,
            len,
            sent_at: Instant::now(),
        });
        self.socket.send_bytes(&entry.bytes, self.peer).await?;
        drop(table);

        self.clock.segment(Direction::Snd, segment);
        self.stats.record_data_sent(len);
        Ok(())
    }

    /// Remove the slot acknowledged by cumulative ACK value `ack`.
    ///
    /// Returns the removed slot, or `None` when no outstanding segment ends
    /// at `ack` (a duplicate or stale ACK); in that case nothing changes.
    pub async fn acknowledge(&self, ack: u64) -> Option<usize> {
        let mut table = self.table.lock().await;
        let slot = table
            .iter()
            .find_map(|(slot, entry)| (entry.end_seq() == ack).then_some(*slot))?;
        table.remove(&slot);
        drop(table);

        self.room.notify_one();
        Some(slot)
    }

    /// Retransmit every slot whose last transmission is at least `rto` old.
    ///
    /// Returns how many segments were resent.
    pub async fn sweep(&self) -> Result<usize, ConnError> {
        let mut table = self.table.lock().await;
        let now = Instant::now();
        let mut resent = 0;

        for entry in table.values_mut() {
            if now.duration_since(entry.sent_at) < self.rto {
                continue;
            }
            self.socket.send_bytes(&entry.bytes, self.peer).await?;
            entry.sent_at = now;
            resent += 1;
            self.stats.record_retransmission();
            self.clock.record(Direction::Snd, SegmentKind::Data, entry.seq, entry.len);
        }

        if resent > 0 {
            log::debug!("[window] timeout: retransmitted {resent} segment(s)");
        }
        Ok(resent)
    }

    /// Earliest instant at which some outstanding slot times out.
    async fn next_deadline(&self) -> Option<Instant> {
        let table = self.table.lock().await;
        table.values().map(|e| e.sent_at).min().map(|t| t + self.rto)
    }

    /// Sleep until an ACK frees a slot or the earliest timer expires.
    async fn wait_for_progress(&self) {
        if let Some(deadline) = self.next_deadline().await {
            let _ = tokio::time::timeout_at(deadline, self.room.notified()).await;
        }
    }

    /// Run the bulk transfer of `segments` to completion.
    ///
    /// Segment `i` uses slot `i`.  Before each submission the window is swept
    /// for timeouts until fewer than `capacity` slots are outstanding; after
    /// the last submission the window keeps sweeping until it drains.
    pub async fn transfer(&self, segments: &[Segment], signals: &Signals) -> Result<(), ConnError> {
        for (slot, segment) in segments.iter().enumerate() {
            loop {
                if signals.status().listener_down {
                    return Err(ConnError::ListenerStopped);
                }
                self.sweep().await?;
                if self.in_flight().await < self.capacity {
                    break;
                }
                self.wait_for_progress().await;
            }
            self.submit(slot, segment).await?;
        }

        while self.in_flight().await > 0 {
            if signals.status().listener_down {
                return Err(ConnError::ListenerStopped);
            }
            self.sweep().await?;
            self.wait_for_progress().await;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
