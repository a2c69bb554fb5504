//! Integration tests for connection setup and abandonment.
//!
//! Each test binds real `tokio::net::UdpSocket`s on loopback.  The sender's
//! socket is bound first so the receiver knows which address to accept
//! segments from.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ptp::{
    config::TransferConfig,
    packet::{Segment, SegmentKind},
    receiver::{ReceiveOutcome, Receiver},
    sender::Sender,
    simulator::LossSimulator,
    socket::Socket,
    state::{ReceiverState, SenderState},
    ConnError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ephemeral() -> Socket {
    Socket::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .expect("bind ephemeral socket")
}

fn output_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ptp-{name}-{}.out", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn config(attempts: u32) -> TransferConfig {
    TransferConfig::new(3000, Duration::from_millis(50), attempts).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// A clean run leaves both endpoints closed.
#[tokio::test]
async fn clean_connection_closes_both_sides() {
    let sender_socket = ephemeral().await;
    let receiver_socket = ephemeral().await;
    let out = output_path("clean");

    let mut receiver = Receiver::new(
        receiver_socket,
        sender_socket.local_addr,
        &out,
        LossSimulator::lossless(),
        LossSimulator::lossless(),
    );
    let mut sender = Sender::new(sender_socket, receiver.local_addr(), b"hello".to_vec(), config(3));

    let receiver_task = tokio::spawn(async move {
        let outcome = receiver.run().await;
        (outcome, receiver.state())
    });

    let report = tokio::time::timeout(Duration::from_secs(5), sender.run())
        .await
        .expect("sender timed out")
        .expect("sender failed");
    assert_eq!(sender.state(), SenderState::Closed);
    assert_eq!(report.original_bytes, 5);

    let (outcome, state) = tokio::time::timeout(Duration::from_secs(5), receiver_task)
        .await
        .expect("receiver timed out")
        .expect("receiver task panicked");
    assert_eq!(outcome.unwrap(), ReceiveOutcome::Completed { bytes: 5 });
    assert_eq!(state, ReceiverState::Closed);

    let _ = std::fs::remove_file(&out);
}

/// The receiver's ACK of a SYN is `ISN + 1`.
#[tokio::test]
async fn syn_is_acknowledged_with_isn_plus_one() {
    let peer = ephemeral().await;
    let receiver_socket = ephemeral().await;
    let out = output_path("syn-ack");

    let mut receiver = Receiver::new(
        receiver_socket,
        peer.local_addr,
        &out,
        LossSimulator::lossless(),
        LossSimulator::lossless(),
    );
    let receiver_addr = receiver.local_addr();
    let receiver_task = tokio::spawn(async move { receiver.run().await });

    peer.send_to(&Segment::control(SegmentKind::Syn, 65_535), receiver_addr)
        .await
        .unwrap();
    let (ack, from) = tokio::time::timeout(Duration::from_secs(5), peer.recv_from())
        .await
        .expect("no SYN ACK")
        .unwrap();
    assert_eq!(from, receiver_addr);
    assert_eq!(ack, Segment::control(SegmentKind::Ack, 65_536));

    peer.send_to(&Segment::control(SegmentKind::Abort, 0), receiver_addr)
        .await
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), receiver_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ReceiveOutcome::Aborted);
}

/// ABORT closes the receiver without writing the output file.
#[tokio::test]
async fn abort_closes_receiver_without_output() {
    let peer = ephemeral().await;
    let receiver_socket = ephemeral().await;
    let out = output_path("abort");

    let mut receiver = Receiver::new(
        receiver_socket,
        peer.local_addr,
        &out,
        LossSimulator::lossless(),
        LossSimulator::lossless(),
    );
    let receiver_addr = receiver.local_addr();
    let receiver_task = tokio::spawn(async move { receiver.run().await });

    peer.send_to(&Segment::control(SegmentKind::Syn, 7), receiver_addr)
        .await
        .unwrap();
    peer.send_to(&Segment::data(8, b"partial".to_vec()), receiver_addr)
        .await
        .unwrap();
    peer.send_to(&Segment::control(SegmentKind::Abort, 0), receiver_addr)
        .await
        .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), receiver_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ReceiveOutcome::Aborted);
    assert!(!out.exists(), "aborted receiver must not write {}", out.display());
}

/// Datagrams from anyone but the configured peer are ignored.
#[tokio::test]
async fn stranger_cannot_abort_connection() {
    let peer = ephemeral().await;
    let stranger = ephemeral().await;
    let receiver_socket = ephemeral().await;
    let out = output_path("stranger");

    let mut receiver = Receiver::new(
        receiver_socket,
        peer.local_addr,
        &out,
        LossSimulator::lossless(),
        LossSimulator::lossless(),
    );
    let receiver_addr = receiver.local_addr();
    let receiver_task = tokio::spawn(async move { receiver.run().await });

    stranger
        .send_to(&Segment::control(SegmentKind::Abort, 0), receiver_addr)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!receiver_task.is_finished());

    peer.send_to(&Segment::control(SegmentKind::Syn, 0), receiver_addr)
        .await
        .unwrap();
    peer.send_to(&Segment::control(SegmentKind::Fin, 1), receiver_addr)
        .await
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), receiver_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ReceiveOutcome::Completed { bytes: 0 });

    let _ = std::fs::remove_file(&out);
}

/// When every SYN is lost the sender gives up, sends ABORT, and the receiver
/// (which never drops ABORT) closes without output.
#[tokio::test]
async fn lost_handshake_aborts_both_sides() {
    let sender_socket = ephemeral().await;
    let receiver_socket = ephemeral().await;
    let out = output_path("lost-syn");

    let mut receiver = Receiver::new(
        receiver_socket,
        sender_socket.local_addr,
        &out,
        LossSimulator::new(1.0).unwrap(),
        LossSimulator::lossless(),
    );
    let mut sender = Sender::new(sender_socket, receiver.local_addr(), vec![1; 1500], config(3));
    let receiver_task = tokio::spawn(async move { receiver.run().await });

    let result = tokio::time::timeout(Duration::from_secs(5), sender.run())
        .await
        .expect("sender timed out");
    assert!(
        matches!(result, Err(ConnError::HandshakeFailed { attempts: 3 })),
        "expected HandshakeFailed, got: {result:?}"
    );
    assert_eq!(sender.state(), SenderState::Aborted);
    assert_eq!(sender.report().data_segments, 0);

    let outcome = tokio::time::timeout(Duration::from_secs(5), receiver_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ReceiveOutcome::Aborted);
    assert!(!out.exists());
}

/// A peer that acknowledges SYN and DATA but never FIN: the sender sends FIN
/// `attempts` times, then ABORT, and reports the teardown failure.
#[tokio::test]
async fn unanswered_fin_is_abandoned_with_abort() {
    let sender_socket = ephemeral().await;
    let peer = ephemeral().await;
    let sender_addr = sender_socket.local_addr;

    let mut sender =
        Sender::new(sender_socket, peer.local_addr, vec![5; 1500], config(3)).with_isn(100);

    let peer_task = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let (segment, from) = peer.recv_from().await.unwrap();
            assert_eq!(from, sender_addr);
            seen.push((segment.kind, segment.seq));
            let ack = match segment.kind {
                SegmentKind::Syn => segment.seq + 1,
                SegmentKind::Data => segment.end_seq(),
                SegmentKind::Abort => return seen,
                _ => continue,
            };
            peer.send_to(&Segment::control(SegmentKind::Ack, ack), from)
                .await
                .unwrap();
        }
    });

    let result = tokio::time::timeout(Duration::from_secs(5), sender.run())
        .await
        .expect("sender timed out");
    assert!(
        matches!(result, Err(ConnError::TeardownFailed { attempts: 3 })),
        "expected TeardownFailed, got: {result:?}"
    );
    assert_eq!(sender.state(), SenderState::Aborted);

    let seen = tokio::time::timeout(Duration::from_secs(5), peer_task)
        .await
        .expect("peer never saw ABORT")
        .unwrap();
    assert_eq!(
        seen,
        [
            (SegmentKind::Syn, 100),
            (SegmentKind::Data, 101),
            (SegmentKind::Data, 1101),
            (SegmentKind::Fin, 1601),
            (SegmentKind::Fin, 1601),
            (SegmentKind::Fin, 1601),
            (SegmentKind::Abort, 0),
        ]
    );
}

/// While its FIN-ACK keeps being dropped the receiver stays open, so a later
/// FIN or ABORT still reaches it.
#[tokio::test]
async fn receiver_keeps_listening_when_fin_ack_is_lost() {
    let peer = ephemeral().await;
    let receiver_socket = ephemeral().await;
    let out = output_path("lost-fin-ack");

    let mut receiver = Receiver::new(
        receiver_socket,
        peer.local_addr,
        &out,
        LossSimulator::lossless(),
        LossSimulator::new(1.0).unwrap(),
    );
    let receiver_addr = receiver.local_addr();
    let receiver_task = tokio::spawn(async move { receiver.run().await });

    peer.send_to(&Segment::control(SegmentKind::Syn, 40), receiver_addr)
        .await
        .unwrap();
    peer.send_to(&Segment::data(41, b"abc".to_vec()), receiver_addr)
        .await
        .unwrap();
    peer.send_to(&Segment::control(SegmentKind::Fin, 44), receiver_addr)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!receiver_task.is_finished(), "receiver closed without sending its FIN-ACK");
    assert!(!out.exists());

    peer.send_to(&Segment::control(SegmentKind::Abort, 0), receiver_addr)
        .await
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), receiver_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ReceiveOutcome::Aborted);
    assert!(!out.exists());
}
