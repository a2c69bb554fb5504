//! `ptp`: the Packet Transfer Protocol: reliable one-way file transfer over UDP.
//!
//! # Architecture
//!
//! ```text
//!  Sender process                                   Receiver process
//!  ┌──────────────────────────────┐                ┌─────────────────────────┐
//!  │ control loop (sender)        │  SYN/DATA/FIN  │ receiver engine         │
//!  │   └─ SendWindow ─────────────┼───────────────▶│  ├─ forward LossSim     │
//!  │        ▲ acknowledge()       │                │  ├─ ReassemblyBuffer    │
//!  │ ACK listener task ◀──────────┼────────────────┼──┴─ reverse LossSim     │
//!  │   └─ Signals (watch) ──▶ control loop   ACK   │                         │
//!  └──────────────┬───────────────┘                └────────────┬────────────┘
//!                 │ Arc<Socket>                                 │ Socket
//!                 ▼                                             ▼
//!          tokio UdpSocket  ◀───────── loopback UDP ─────────▶  tokio UdpSocket
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]      : wire format (serialise / deserialise)
//! - [`socket`]      : async UDP socket speaking [`packet::Segment`]s
//! - [`simulator`]   : per-segment artificial loss
//! - [`state`]       : sender / receiver state enums
//! - [`connection`]  : connection errors and the sender's status channel
//! - [`window`]      : outstanding-segment table with per-slot retransmission
//! - [`listener`]    : ACK listener task
//! - [`sender`]      : sender control loop (handshake, transfer, teardown)
//! - [`reassembly`]  : index-addressed receive buffer
//! - [`receiver`]    : receiver engine
//! - [`stats`]       : transfer counters and final report
//! - [`trace`]       : per-segment trace lines
//! - [`config`]      : endpoint configuration

pub mod config;
pub mod connection;
pub mod listener;
pub mod packet;
pub mod reassembly;
pub mod receiver;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod stats;
pub mod trace;
pub mod window;

pub use connection::ConnError;
pub use packet::{Segment, SegmentKind};
pub use receiver::{ReceiveOutcome, Receiver};
pub use sender::Sender;
pub use stats::TransferReport;
