//! Single-consumer relay carrying tagged messages from the player.
//!
//! Decouples the player's execution context from transport IO: binds are
//! dispatched here, raw state changes are normalized and applied.

use crate::bridge::Bridge;
use crate::command::PipeDialect;
use crate::types::ChangeEvent;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

/// Relay channel capacity; enough for bind plus event bursts.
pub const CHANNEL_CAPACITY: usize = 32;

/// Tagged messages from the player's execution context
#[derive(Clone, Debug)]
pub enum PlayerMessage {
    /// Bind the JSON IPC socket dialect.
    BindSocket(PathBuf),
    /// Bind a command FIFO with the given boolean-token dialect.
    BindPipe(PathBuf, PipeDialect),
    /// A raw (name, value) state change from the player.
    Property(String, serde_json::Value),
}

/// Consume player messages until the channel closes.
///
/// Closure is not fatal: the loop exits quietly and the process keeps
/// serving the last known state.
pub async fn run(bridge: Arc<Bridge>, mut messages: Receiver<PlayerMessage>) {
    while let Some(message) = messages.recv().await {
        match message {
            PlayerMessage::BindSocket(path) => {
                let bridge = bridge.clone();
                tokio::spawn(async move { bridge.bind_socket(&path).await });
            }
            PlayerMessage::BindPipe(path, dialect) => bridge.bind_pipe(&path, dialect).await,
            PlayerMessage::Property(name, value) => {
                if let Some(event) = ChangeEvent::parse(&name, &value) {
                    bridge.apply_event(event).await;
                } else {
                    debug!("ignoring unrecognized player message {name}");
                }
            }
        }
    }
    debug!("player channel closed; relay exiting");
}
