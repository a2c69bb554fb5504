//! Connection-level error taxonomy and the sender's status channel.
//!
//! [`ConnError`] is what both endpoints return from their run loops.
//! [`Signals`] carries the handshake/teardown flags from the ACK listener
//! task to the control loop: the listener flips a flag, and the control loop
//! waits on it with a timeout instead of polling.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use crate::config::ConfigError;
use crate::socket::SocketError;

/// Fatal, connection-ending errors.
///
/// Malformed segments and unmatched ACKs never show up here: both are
/// recovered locally by skipping them.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// SYN unanswered after every attempt; an ABORT was sent.
    #[error("handshake failed: SYN not acknowledged after {attempts} attempts")]
    HandshakeFailed { attempts: u32 },
    /// FIN unanswered after every attempt; the connection was abandoned.
    #[error("teardown failed: FIN not acknowledged after {attempts} attempts")]
    TeardownFailed { attempts: u32 },
    /// The ACK listener task hit an unrecoverable socket error.
    #[error("acknowledgement listener stopped")]
    ListenerStopped,
}

/// Flags published by the ACK listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    /// `ACK(ISN + 1)` arrived.
    pub syn_acked: bool,
    /// `ACK(FIN_seq + 1)` arrived.
    pub fin_acked: bool,
    /// The listener exited and no further ACKs will be processed.
    pub listener_down: bool,
}

/// Status channel shared (via `Arc`) by the control loop and the ACK listener.
#[derive(Debug)]
pub struct Signals {
    tx: watch::Sender<LinkStatus>,
}

impl Signals {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LinkStatus::default());
        Self { tx }
    }

    pub fn status(&self) -> LinkStatus {
        *self.tx.borrow()
    }

    pub fn mark_syn_acked(&self) {
        self.tx.send_if_modified(|s| !std::mem::replace(&mut s.syn_acked, true));
    }

    pub fn mark_fin_acked(&self) {
        self.tx.send_if_modified(|s| !std::mem::replace(&mut s.fin_acked, true));
    }

    pub fn mark_listener_down(&self) {
        self.tx.send_if_modified(|s| !std::mem::replace(&mut s.listener_down, true));
    }

    /// Wait up to `within` for `flag` to hold.  Returns whether it did.
    pub async fn wait_for(&self, within: Duration, flag: impl FnMut(&LinkStatus) -> bool) -> bool {
        let mut rx = self.tx.subscribe();
        let held = matches!(timeout(within, rx.wait_for(flag)).await, Ok(Ok(_)));
        held
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn wait_returns_true_once_flag_is_set() {
        let signals = Arc::new(Signals::new());
        let setter = Arc::clone(&signals);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            setter.mark_syn_acked();
        });

        assert!(signals.wait_for(Duration::from_secs(2), |s| s.syn_acked).await);
        assert!(!signals.status().fin_acked);
    }

    #[tokio::test]
    async fn wait_times_out_when_flag_never_set() {
        let signals = Signals::new();
        assert!(!signals.wait_for(Duration::from_millis(20), |s| s.fin_acked).await);
    }

    #[tokio::test]
    async fn flag_set_before_waiting_is_seen() {
        let signals = Signals::new();
        signals.mark_fin_acked();
        assert!(signals.wait_for(Duration::from_millis(1), |s| s.fin_acked).await);
    }
}
