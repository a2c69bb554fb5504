//! Receiver engine.
//!
//! A single-threaded loop that serves exactly one connection:
//!
//! - **SYN**: `relative_0 = ISN + 1`; reply `ACK(relative_0)`.
//! - **DATA**: store the payload at slot `(seq - relative_0) / 1000`; reply
//!   `ACK(seq + len)`.
//! - **FIN**: `relative_0 = FIN_seq + 1`; reply `ACK(relative_0)`, write the
//!   reassembled file and close.
//! - **ABORT**: close without writing anything.
//!
//! Inbound SYN/DATA/FIN segments pass through the forward loss simulator and
//! outbound ACKs through the reverse one.  When the FIN's ACK is dropped the
//! receiver keeps listening, so the sender's retried FIN can still close the
//! connection cleanly.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::ReceiverConfig;
use crate::connection::ConnError;
use crate::packet::{Segment, SegmentKind};
use crate::reassembly::ReassemblyBuffer;
use crate::simulator::LossSimulator;
use crate::socket::Socket;
use crate::state::ReceiverState;
use crate::trace::{Direction, TraceClock};

/// How a receiver run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// FIN handled; `bytes` were written to the output file.
    Completed { bytes: usize },
    /// ABORT received; no file was written.
    Aborted,
}

/// What the engine wants done after handling one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ignore,
    Ack(Segment),
    /// ACK the FIN, then persist and close if the ACK got out.
    Close(Segment),
    Abort,
}

pub struct Receiver {
    socket: Socket,
    peer: SocketAddr,
    output: PathBuf,
    forward: LossSimulator,
    reverse: LossSimulator,
    relative_0: Option<u64>,
    buffer: ReassemblyBuffer,
    state: ReceiverState,
    clock: TraceClock,
}

impl Receiver {
    pub fn new(
        socket: Socket,
        peer: SocketAddr,
        output: impl Into<PathBuf>,
        forward: LossSimulator,
        reverse: LossSimulator,
    ) -> Self {
        Self {
            socket,
            peer,
            output: output.into(),
            forward,
            reverse,
            relative_0: None,
            buffer: ReassemblyBuffer::new(),
            state: ReceiverState::Listening,
            clock: TraceClock::start(),
        }
    }

    /// Bind the configured port and build the loss simulators.
    pub async fn bind(config: &ReceiverConfig) -> Result<Self, ConnError> {
        let (forward, reverse) = config.loss_simulators()?;
        let socket = Socket::bind(config.local).await?;
        log::info!("receiver listening on {}", socket.local_addr);
        Ok(Self::new(socket, config.peer, config.output.clone(), forward, reverse))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Serve one connection until FIN or ABORT.
    pub async fn run(&mut self) -> Result<ReceiveOutcome, ConnError> {
        loop {
            let (segment, addr) = match self.socket.recv_from().await {
                Ok(v) => v,
                Err(e) if e.is_transient() => {
                    log::debug!("[receiver] skipping datagram: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if addr != self.peer {
                log::debug!("[receiver] ignoring datagram from {addr}");
                continue;
            }

            let forward = matches!(
                segment.kind,
                SegmentKind::Syn | SegmentKind::Data | SegmentKind::Fin
            );
            if forward && self.forward.should_drop() {
                self.clock.segment(Direction::Drp, &segment);
                continue;
            }
            self.clock.segment(Direction::Rcv, &segment);

            match self.on_segment(&segment) {
                Response::Ignore => {}
                Response::Ack(ack) => {
                    self.reply(&ack).await?;
                }
                Response::Close(ack) => {
                    if self.reply(&ack).await? {
                        let bytes = self.persist().await?;
                        self.state = ReceiverState::Closed;
                        log::info!("[receiver] connection closed; wrote {bytes} bytes");
                        return Ok(ReceiveOutcome::Completed { bytes });
                    }
                }
                Response::Abort => {
                    self.state = ReceiverState::Closed;
                    log::warn!("[receiver] connection aborted by sender");
                    return Ok(ReceiveOutcome::Aborted);
                }
            }
        }
    }

    /// Update connection state for one delivered segment.
    ///
    /// Pure state transition: no I/O and no loss simulation.
    pub fn on_segment(&mut self, segment: &Segment) -> Response {
        match segment.kind {
            SegmentKind::Syn => {
                let relative_0 = segment.seq + 1;
                self.relative_0 = Some(relative_0);
                Response::Ack(Segment::control(SegmentKind::Ack, relative_0))
            }
            SegmentKind::Data => {
                let Some(base) = self.relative_0 else {
                    log::debug!("[receiver] DATA before SYN; ignoring");
                    return Response::Ignore;
                };
                match self.buffer.insert(base, segment.seq, &segment.payload) {
                    Some(index) => {
                        self.state = ReceiverState::Established;
                        log::debug!("[receiver] stored slot {index}");
                    }
                    None => log::debug!("[receiver] DATA {} precedes offset {base}", segment.seq),
                }
                Response::Ack(Segment::control(SegmentKind::Ack, segment.end_seq()))
            }
            SegmentKind::Fin => {
                let relative_0 = segment.seq + 1;
                self.relative_0 = Some(relative_0);
                Response::Close(Segment::control(SegmentKind::Ack, relative_0))
            }
            SegmentKind::Abort => Response::Abort,
            SegmentKind::Ack => Response::Ignore,
        }
    }

    /// Send `ack` unless the reverse loss simulator drops it.
    ///
    /// Returns whether the ACK was actually sent.
    async fn reply(&mut self, ack: &Segment) -> Result<bool, ConnError> {
        if self.reverse.should_drop() {
            self.clock.segment(Direction::Drp, ack);
            return Ok(false);
        }
        self.socket.send_to(ack, self.peer).await?;
        self.clock.segment(Direction::Snd, ack);
        Ok(true)
    }

    /// Write the reassembled file.
    async fn persist(&self) -> Result<usize, ConnError> {
        if let Some(gap) = self.buffer.first_gap() {
            log::warn!("[receiver] segment {gap} never arrived; output will be incomplete");
        }
        let data = self.buffer.assemble();
        tokio::fs::write(&self.output, &data)
            .await
            .map_err(|source| ConnError::File {
                path: self.output.clone(),
                source,
            })?;
        Ok(data.len())
    }
}
