//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`crate::packet::Segment`] instead of raw bytes.  All protocol logic lives
//! elsewhere; this module owns only byte I/O.

use std::io::ErrorKind;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::packet::{Segment, SegmentError};

/// Maximum UDP payload size (theoretical limit; PTP datagrams stay far below).
const MAX_DATAGRAM: usize = 65_535;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from socket operations.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The datagram could not be encoded or decoded as a valid segment.
    #[error("malformed segment: {0}")]
    Segment(#[from] SegmentError),
}

impl SocketError {
    /// `true` for errors that affect one datagram rather than the socket:
    /// a datagram that failed to parse, or an ICMP-induced refusal or reset.
    ///
    /// Both endpoints skip these and keep receiving.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Segment(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::Interrupted
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Socket
// ---------------------------------------------------------------------------

/// An async, segment-oriented UDP socket.
///
/// All methods are `&self` so the socket can be shared across tasks (the
/// sender's control loop and ACK listener hold the same `Arc<Socket>`).
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing port `0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `segment` and send it as a single UDP datagram to `dest`.
    pub async fn send_to(&self, segment: &Segment, dest: SocketAddr) -> Result<(), SocketError> {
        let bytes = segment.encode()?;
        self.send_bytes(&bytes, dest).await
    }

    /// Send an already-encoded segment unchanged.
    ///
    /// Used for retransmissions, which resend the stored bytes verbatim.
    pub async fn send_bytes(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it into a [`Segment`].
    ///
    /// Returns `(segment, sender_address)`.  Datagrams that fail to decode are
    /// returned as `Err` (see [`SocketError::is_transient`]); the caller
    /// decides whether to keep listening.
    pub async fn recv_from(&self) -> Result<(Segment, SocketAddr), SocketError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        let segment = Segment::decode(&buf[..n])?;
        Ok((segment, addr))
    }
}
