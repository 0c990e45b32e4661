//! Entry point for `swp-over-udp`.
//!
//! Parses CLI arguments and dispatches into either **server** (receive) or
//! **client** (send) mode.  All protocol work is delegated to the library;
//! `main.rs` owns only process setup (logging, argument parsing, stdio).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use swp_over_udp::config::{RETRANSMIT_TIMEOUT, WINDOW_SIZE};
use swp_over_udp::{Receiver, Sender, SwpConfig};

/// Reliable in-order byte stream over lossy UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Args)]
struct Loss {
    /// Probability of dropping each datagram, per direction.
    #[arg(short, long, default_value_t = 0.0)]
    loss: f64,
    /// Seed for the loss model (random if omitted).
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive a stream and write it to stdout.
    Server {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        #[command(flatten)]
        loss: Loss,
    },
    /// Send a file (or stdin) to a server.
    Client {
        /// Remote server address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        server: SocketAddr,
        /// File to send; stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Maximum unacknowledged chunks.
        #[arg(short, long, default_value_t = WINDOW_SIZE)]
        window: usize,
        /// Retransmission timeout in milliseconds.
        #[arg(short, long, default_value_t = RETRANSMIT_TIMEOUT.as_millis() as u64)]
        timeout_ms: u64,
        #[command(flatten)]
        loss: Loss,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server { bind, loss } => {
            let config = SwpConfig {
                loss_probability: loss.loss,
                seed: loss.seed,
                ..SwpConfig::default()
            };
            serve(bind, config).await
        }
        Mode::Client {
            server,
            file,
            window,
            timeout_ms,
            loss,
        } => {
            let config = SwpConfig {
                window_size: window,
                retransmit_timeout: Duration::from_millis(timeout_ms),
                loss_probability: loss.loss,
                seed: loss.seed,
            };
            send(server, file, config).await
        }
    }
}

async fn serve(bind: SocketAddr, config: SwpConfig) -> anyhow::Result<()> {
    let mut receiver = Receiver::bind(bind, config)
        .await
        .with_context(|| format!("binding {bind}"))?;
    log::info!("Server listening on {bind}");

    let mut stdout = tokio::io::stdout();
    loop {
        let chunk = receiver.recv().await?;
        stdout.write_all(&chunk).await?;
        stdout.flush().await?;
    }
}

async fn send(server: SocketAddr, file: Option<PathBuf>, config: SwpConfig) -> anyhow::Result<()> {
    let data = match file {
        Some(path) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };

    let sender = Sender::connect(server, config)
        .await
        .with_context(|| format!("connecting to {server}"))?;
    log::info!("Sending {} bytes to {server}", data.len());

    sender.send(&data).await?;
    sender.flush().await?;

    let stats = sender.stats();
    log::info!(
        "Done: {} chunks, {} retransmissions, {} ACKs",
        stats.transmitted,
        stats.retransmitted,
        stats.acks_received
    );
    Ok(())
}
