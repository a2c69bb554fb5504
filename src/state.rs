//! Connection finite-state machine (FSM) types.
//!
//! The sender and receiver each walk a small state machine.  Transitions
//! live in [`crate::sender`] and [`crate::receiver`]; this module only names
//! the states so they can be logged and asserted on.

/// States of the sender's control loop.
///
/// ```text
///  INIT ──SYN──▶ SYN_SENT ──ACK(ISN+1)──▶ TRANSFERRING ──all data ACKed──▶ FIN_SENT
///                    │                                                      │
///          3 attempts│unanswered                             ACK(FIN_seq+1) │
///                    ▼                                                      ▼
///                 ABORTED ◀──────────── 3 attempts unanswered ──────────  CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Nothing sent yet.
    #[default]
    Init,
    /// SYN sent; waiting for `ACK(ISN + 1)`.
    SynSent,
    /// Handshake done; DATA segments flowing through the window.
    Transferring,
    /// Every DATA segment acknowledged; FIN sent, waiting for its ACK.
    FinSent,
    /// FIN acknowledged; the transfer completed.
    Closed,
    /// Handshake or teardown exhausted its attempts.
    Aborted,
}

/// States of the receiver engine.
///
/// The receiver stays in `Listening` through the handshake and moves to
/// `Established` when the first DATA segment lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverState {
    #[default]
    Listening,
    Established,
    Closed,
}

impl std::fmt::Display for SenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::SynSent => "SYN_SENT",
            Self::Transferring => "TRANSFERRING",
            Self::FinSent => "FIN_SENT",
            Self::Closed => "CLOSED",
            Self::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

impl std::fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Listening => "LISTENING",
            Self::Established => "ESTABLISHED",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}
