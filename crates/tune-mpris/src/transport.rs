//! Backend transports: the single active IO channel to the backend.

use crate::command::{Command, PipeDialect};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::OwnedWriteHalf;

/// The write side of a bound backend connection.
///
/// At most one variant is active at a time. Any IO failure closes the
/// transport and resets it to Unbound; binding is terminal, there is no
/// automatic re-bind.
#[derive(Default)]
pub enum BackendTransport {
    #[default]
    Unbound,
    Socket(SocketTransport),
    Pipe(PipeTransport),
}

impl BackendTransport {
    /// Encode and write one command. Unbound transports drop it silently.
    pub async fn send(&mut self, command: &Command) -> io::Result<()> {
        match self {
            BackendTransport::Unbound => Ok(()),
            BackendTransport::Socket(transport) => transport.send(command).await,
            BackendTransport::Pipe(transport) => transport.send(command).await,
        }
    }

    pub fn is_socket(&self) -> bool {
        matches!(self, BackendTransport::Socket(_))
    }

    pub fn is_pipe(&self) -> bool {
        matches!(self, BackendTransport::Pipe(_))
    }
}

/// Newline-delimited JSON over the backend's IPC socket
pub struct SocketTransport {
    writer: OwnedWriteHalf,
}

impl SocketTransport {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }

    async fn send(&mut self, command: &Command) -> io::Result<()> {
        self.writer.write_all(command.socket_line().as_bytes()).await
    }
}

/// Plain-text command lines over the backend's control FIFO
pub struct PipeTransport {
    file: File,
    dialect: PipeDialect,
}

impl PipeTransport {
    pub fn new(file: File, dialect: PipeDialect) -> Self {
        Self { file, dialect }
    }

    async fn send(&mut self, command: &Command) -> io::Result<()> {
        self.file
            .write_all(command.pipe_line(self.dialect).as_bytes())
            .await?;
        self.file.flush().await
    }
}
