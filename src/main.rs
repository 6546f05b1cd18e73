//! TuneBridge - MPRIS2 remote control for console playback backends.
//!
//! Serves a per-instance MPRIS2 service on the session bus and relays
//! control commands to an already-running mpv or mplayer backend.

use clap::Parser;
use log::info;
use std::error::Error;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tune_mpris::relay::{self, CHANNEL_CAPACITY};
use tune_mpris::{Bridge, PipeDialect, PlayerMessage, Registrar};

#[derive(Debug, Parser)]
#[command(name = "TuneBridge", about = "MPRIS2 bridge for mpv/mplayer backends")]
struct Cli {
    /// JSON IPC socket of a running mpv backend
    #[arg(long, value_name = "PATH", conflicts_with_all = ["mpv_fifo", "mplayer_fifo"])]
    socket: Option<PathBuf>,

    /// Command FIFO of a running mpv backend
    #[arg(long, value_name = "PATH", conflicts_with = "mplayer_fifo")]
    mpv_fifo: Option<PathBuf>,

    /// Command FIFO of a running mplayer backend
    #[arg(long, value_name = "PATH")]
    mplayer_fifo: Option<PathBuf>,

    /// Instance tag for the bus name (org.mpris.MediaPlayer2.<tag>)
    #[arg(long)]
    instance: Option<String>,
}

impl Cli {
    fn bind_message(&self) -> Option<PlayerMessage> {
        if let Some(path) = &self.socket {
            Some(PlayerMessage::BindSocket(path.clone()))
        } else if let Some(path) = &self.mpv_fifo {
            Some(PlayerMessage::BindPipe(path.clone(), PipeDialect::Mpv))
        } else if let Some(path) = &self.mplayer_fifo {
            Some(PlayerMessage::BindPipe(path.clone(), PipeDialect::Mplayer))
        } else {
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let identity = cli
        .instance
        .clone()
        .unwrap_or_else(|| format!("instance{}", std::process::id()));

    let bridge = Bridge::new(&identity);
    let mut registrar = Registrar::new(bridge.clone(), &identity);
    registrar.acquire().await?;
    info!("serving org.mpris.MediaPlayer2.{identity}");

    // The player side owns the sending end of this channel; the binary
    // only queues the initial bind.
    let (player_tx, player_rx) = mpsc::channel(CHANNEL_CAPACITY);
    if let Some(message) = cli.bind_message() {
        player_tx.send(message).await?;
    }

    // Bus dispatch runs on the connection's executor; the relay loop runs
    // here until the channel closes or we are interrupted.
    let relay = tokio::spawn(relay::run(bridge, player_rx));
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        _ = relay => info!("player channel closed"),
    }

    registrar.release().await?;
    Ok(())
}
