//! Sender control loop.
//!
//! Drives one connection through its whole life:
//!
//! 1. **Handshake**: send `SYN(ISN)` up to `attempts` times, each time waiting
//!    one RTO for the listener to report `ACK(ISN + 1)`.  If every attempt
//!    goes unanswered, send `ABORT` and fail with
//!    [`ConnError::HandshakeFailed`].
//! 2. **Transfer**: cut the file into 1000-byte DATA segments starting at
//!    `ISN + 1` and push them through the [`SendWindow`] until all are ACKed.
//! 3. **Teardown**: send `FIN(FIN_seq)` (the end-of-data sequence number) up
//!    to `attempts` times, waiting for `ACK(FIN_seq + 1)`.  If every attempt
//!    goes unanswered the connection is abandoned: an `ABORT` is sent so a
//!    still-listening receiver stops, and [`ConnError::TeardownFailed`] is
//!    returned.
//!
//! The ACK listener runs as a separate task for the whole connection and is
//! shut down before [`Sender::run`] returns.

use std::net::SocketAddr;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::oneshot;

use crate::config::{SenderConfig, TransferConfig};
use crate::connection::{ConnError, LinkStatus, Signals};
use crate::listener::{AckListener, Expected};
use crate::packet::{Segment, SegmentKind};
use crate::socket::Socket;
use crate::state::SenderState;
use crate::stats::{TransferReport, TransferStats};
use crate::trace::{Direction, TraceClock};
use crate::window::{segmentize, SendWindow};

/// ISNs are drawn uniformly from this range.
const ISN_SPACE: u64 = 65_536;

/// Sequence number carried by ABORT segments.
const ABORT_SEQ: u64 = 0;

pub struct Sender {
    socket: Arc<Socket>,
    peer: SocketAddr,
    data: Vec<u8>,
    config: TransferConfig,
    isn: u64,
    state: SenderState,
    stats: Arc<TransferStats>,
}

impl Sender {
    /// Create a sender for `data` with a random ISN.
    pub fn new(socket: Socket, peer: SocketAddr, data: Vec<u8>, config: TransferConfig) -> Self {
        Self {
            socket: Arc::new(socket),
            peer,
            data,
            config,
            isn: rand::rng().random_range(0..ISN_SPACE),
            state: SenderState::Init,
            stats: Arc::new(TransferStats::new()),
        }
    }

    /// Read the input file and bind the configured port.
    ///
    /// Both failures are fatal before any segment is sent.
    pub async fn bind(config: &SenderConfig) -> Result<Self, ConnError> {
        let data = tokio::fs::read(&config.input)
            .await
            .map_err(|source| ConnError::File {
                path: config.input.clone(),
                source,
            })?;
        let socket = Socket::bind(config.local).await?;
        log::info!(
            "sender bound to {}; {} bytes to send to {}",
            socket.local_addr,
            data.len(),
            config.peer
        );
        Ok(Self::new(socket, config.peer, data, config.transfer.clone()))
    }

    /// Replace the random ISN (tests use this for predictable sequence numbers).
    pub fn with_isn(mut self, isn: u64) -> Self {
        self.isn = isn;
        self
    }

    pub fn isn(&self) -> u64 {
        self.isn
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Counters so far; complete once [`run`](Self::run) has returned.
    pub fn report(&self) -> TransferReport {
        self.stats.snapshot()
    }

    /// End-of-data sequence number carried by the FIN.
    pub fn fin_seq(&self) -> u64 {
        self.isn + 1 + self.data.len() as u64
    }

    /// Run the connection to completion or abandonment.
    pub async fn run(&mut self) -> Result<TransferReport, ConnError> {
        let clock = TraceClock::start();
        let signals = Arc::new(Signals::new());
        let window = Arc::new(SendWindow::new(
            Arc::clone(&self.socket),
            self.peer,
            &self.config,
            Arc::clone(&self.stats),
            clock,
        ));

        let listener = AckListener {
            socket: Arc::clone(&self.socket),
            peer: self.peer,
            window: Arc::clone(&window),
            signals: Arc::clone(&signals),
            stats: Arc::clone(&self.stats),
            clock,
            expected: Expected {
                syn_ack: self.isn + 1,
                fin_ack: self.fin_seq() + 1,
            },
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let listener = tokio::spawn(listener.run(shutdown_rx));

        let result = self.drive(&window, &signals, clock).await;

        let _ = shutdown_tx.send(());
        if let Err(e) = listener.await {
            log::error!("[sender] ACK listener panicked: {e}");
        }

        let report = self.stats.snapshot();
        match &result {
            Ok(()) => log::info!("transfer complete\n{report}"),
            Err(e) => log::error!("transfer failed in state {}: {e}\n{report}", self.state),
        }
        result.map(|()| report)
    }

    async fn drive(
        &mut self,
        window: &SendWindow,
        signals: &Signals,
        clock: TraceClock,
    ) -> Result<(), ConnError> {
        self.transition(SenderState::SynSent);
        let syn = Segment::control(SegmentKind::Syn, self.isn);
        if !self.exchange(&syn, signals, clock, |s| s.syn_acked).await? {
            self.abort(clock).await?;
            return Err(ConnError::HandshakeFailed {
                attempts: self.config.attempts,
            });
        }

        self.transition(SenderState::Transferring);
        let segments = segmentize(&self.data, self.isn + 1);
        window.transfer(&segments, signals).await?;

        self.transition(SenderState::FinSent);
        let fin = Segment::control(SegmentKind::Fin, self.fin_seq());
        if !self.exchange(&fin, signals, clock, |s| s.fin_acked).await? {
            log::warn!("[sender] FIN never acknowledged; abandoning connection");
            self.abort(clock).await?;
            return Err(ConnError::TeardownFailed {
                attempts: self.config.attempts,
            });
        }

        self.transition(SenderState::Closed);
        Ok(())
    }

    /// Send `segment` up to `attempts` times until `done` holds.
    async fn exchange(
        &self,
        segment: &Segment,
        signals: &Signals,
        clock: TraceClock,
        mut done: impl FnMut(&LinkStatus) -> bool,
    ) -> Result<bool, ConnError> {
        for attempt in 1..=self.config.attempts {
            self.socket.send_to(segment, self.peer).await?;
            clock.segment(Direction::Snd, segment);

            if signals.wait_for(self.config.rto, &mut done).await {
                return Ok(true);
            }
            if signals.status().listener_down {
                return Err(ConnError::ListenerStopped);
            }
            log::debug!(
                "[sender] {} attempt {attempt}/{} unanswered",
                segment.kind,
                self.config.attempts
            );
        }
        Ok(false)
    }

    async fn abort(&mut self, clock: TraceClock) -> Result<(), ConnError> {
        let abort = Segment::control(SegmentKind::Abort, ABORT_SEQ);
        self.socket.send_to(&abort, self.peer).await?;
        clock.segment(Direction::Snd, &abort);
        self.transition(SenderState::Aborted);
        Ok(())
    }

    fn transition(&mut self, next: SenderState) {
        log::debug!("[sender] {} → {}", self.state, next);
        self.state = next;
    }
}
