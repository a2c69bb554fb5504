//! Sender-side acknowledgement listener.
//!
//! Runs as its own tokio task next to the control loop, sharing the socket,
//! the [`SendWindow`] and the [`Signals`] channel.  For every ACK it
//! receives it decides, in priority order:
//!
//! 1. `ACK == ISN + 1`: the handshake completed; raise `syn_acked`.
//! 2. `ACK` is the end sequence of an outstanding DATA segment (a full
//!    1000-byte chunk or the short final one): release that slot.
//! 3. `ACK == FIN_seq + 1`: teardown completed; raise `fin_acked`.
//! 4. Anything else is a duplicate or stale ACK and is ignored.
//!
//! Every ACK is counted, whichever branch it takes.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::connection::Signals;
use crate::packet::{Segment, SegmentKind};
use crate::socket::Socket;
use crate::stats::TransferStats;
use crate::trace::{Direction, TraceClock};
use crate::window::SendWindow;

/// How one ACK was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Handshake,
    Data { slot: usize },
    Teardown,
    Unmatched,
}

/// ACK values that complete the handshake and the teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    /// `ISN + 1`.
    pub syn_ack: u64,
    /// `FIN_seq + 1`, where `FIN_seq` is the end-of-data sequence number.
    pub fin_ack: u64,
}

/// State owned by the listener task.
#[derive(Debug)]
pub struct AckListener {
    pub socket: Arc<Socket>,
    pub peer: SocketAddr,
    pub window: Arc<SendWindow>,
    pub signals: Arc<Signals>,
    pub stats: Arc<TransferStats>,
    pub clock: TraceClock,
    pub expected: Expected,
}

impl AckListener {
    /// Receive until `shutdown` fires (or its sender is dropped).
    ///
    /// An unrecoverable socket error ends the loop early and is reported via
    /// [`Signals::mark_listener_down`].
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.socket.recv_from() => match result {
                    Ok((segment, addr)) => {
                        if addr != self.peer {
                            log::debug!("[listener] ignoring datagram from {addr}");
                            continue;
                        }
                        self.on_segment(&segment).await;
                    }
                    Err(e) if e.is_transient() => {
                        log::debug!("[listener] skipping datagram: {e}");
                    }
                    Err(e) => {
                        log::error!("[listener] stopping: {e}");
                        self.signals.mark_listener_down();
                        return;
                    }
                },
            }
        }
        log::debug!("[listener] shut down");
    }

    /// Apply one inbound segment.  Non-ACK segments are ignored.
    pub async fn on_segment(&self, segment: &Segment) -> Option<AckOutcome> {
        if segment.kind != SegmentKind::Ack {
            log::debug!("[listener] ignoring {} segment", segment.kind);
            return None;
        }
        self.stats.record_ack();
        self.clock.segment(Direction::Rcv, segment);

        let ack = segment.seq;
        let outcome = if ack == self.expected.syn_ack {
            self.signals.mark_syn_acked();
            AckOutcome::Handshake
        } else if let Some(slot) = self.window.acknowledge(ack).await {
            AckOutcome::Data { slot }
        } else if ack == self.expected.fin_ack {
            self.signals.mark_fin_acked();
            AckOutcome::Teardown
        } else {
            log::debug!("[listener] ACK {ack} matches no outstanding segment");
            AckOutcome::Unmatched
        };
        Some(outcome)
    }
}
