//! Entry point for `ptp`.
//!
//! Parses CLI arguments and dispatches into either **sender** or **receiver**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, exit status).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ptp::config::{ReceiverConfig, SenderConfig, TransferConfig, DEFAULT_ATTEMPTS};
use ptp::{ReceiveOutcome, Receiver, Sender};

/// Reliable file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Address both endpoints live on.
    #[arg(long, global = true, default_value = "127.0.0.1")]
    host: IpAddr,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a waiting receiver.
    Sender {
        /// UDP port the sender binds.
        sender_port: u16,
        /// UDP port the receiver listens on.
        receiver_port: u16,
        /// File to transfer.
        file: PathBuf,
        /// Maximum window size in bytes (a multiple of 1000).
        max_win: usize,
        /// Retransmission timeout in milliseconds.
        rto: u64,
        /// SYN and FIN attempts before giving up.
        #[arg(long, default_value_t = DEFAULT_ATTEMPTS)]
        attempts: u32,
    },
    /// Receive one file, then exit.
    Receiver {
        /// UDP port the receiver binds.
        receiver_port: u16,
        /// UDP port the sender sends from.
        sender_port: u16,
        /// Where to write the received file.
        file: PathBuf,
        /// Forward loss probability (SYN, DATA, FIN), 0.0 to 1.0.
        flp: f64,
        /// Reverse loss probability (ACK), 0.0 to 1.0.
        rlp: f64,
        /// Seed for reproducible loss decisions.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity; trace lines are on the `ptp::trace` target.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Sender {
            sender_port,
            receiver_port,
            file,
            max_win,
            rto,
            attempts,
        } => {
            let config = SenderConfig {
                local: SocketAddr::new(cli.host, sender_port),
                peer: SocketAddr::new(cli.host, receiver_port),
                input: file,
                transfer: TransferConfig::new(max_win, Duration::from_millis(rto), attempts)
                    .context("invalid sender configuration")?,
            };
            let mut sender = Sender::bind(&config)
                .await
                .context("sender failed to start")?;
            sender.run().await.context("transfer did not complete")?;
        }
        Mode::Receiver {
            receiver_port,
            sender_port,
            file,
            flp,
            rlp,
            seed,
        } => {
            let config = ReceiverConfig {
                local: SocketAddr::new(cli.host, receiver_port),
                peer: SocketAddr::new(cli.host, sender_port),
                output: file,
                forward_loss: flp,
                reverse_loss: rlp,
                seed,
            };
            let mut receiver = Receiver::bind(&config)
                .await
                .context("receiver failed to start")?;
            match receiver.run().await.context("receiver failed")? {
                ReceiveOutcome::Completed { bytes } => {
                    log::info!("wrote {bytes} bytes to {}", receiver.output().display());
                }
                ReceiveOutcome::Aborted => bail!("sender aborted the connection"),
            }
        }
    }

    Ok(())
}
