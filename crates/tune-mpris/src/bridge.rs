//! The bridge between the exported interfaces and the playback backend.
//!
//! Owns the canonical property table and the active transport. Inbound
//! bus calls become outward commands; backend events become property
//! changes announced on the bus. Commands are fire-and-forget: state is
//! only trusted once the backend echoes it back as an event.

use crate::command::{Command, PipeDialect};
use crate::service::PlayerInterface;
use crate::store::{Applied, PropValue, StateStore};
use crate::transport::{BackendTransport, PipeTransport, SocketTransport};
use crate::types::{ChangeEvent, PlaybackStatus};
use crate::{MPRIS_PATH, PLAYER_INTERFACE};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::OwnedReadHalf;
use zbus::Connection;
use zbus::zvariant::Value;

/// Connect attempts before a socket bind permanently gives up.
const SOCKET_CONNECT_TRIES: u32 = 10;

/// Fixed spacing between socket connect attempts.
const SOCKET_CONNECT_DELAY: Duration = Duration::from_millis(500);

/// The backend creates its FIFO asynchronously; wait before opening.
const PIPE_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// One decoded line from the socket dialect.
#[derive(Debug, Deserialize)]
struct BackendEvent {
    event: Option<String>,
    name: Option<String>,
    data: Option<serde_json::Value>,
}

/// Property-synchronization and protocol-translation core
pub struct Bridge {
    store: Mutex<StateStore>,
    transport: tokio::sync::Mutex<BackendTransport>,
    connection: OnceLock<Connection>,
}

impl Bridge {
    pub fn new(identity: &str) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(StateStore::new(identity)),
            transport: tokio::sync::Mutex::new(BackendTransport::Unbound),
            connection: OnceLock::new(),
        })
    }

    /// Attach the bus connection used for change signals.
    pub(crate) fn attach_connection(&self, connection: Connection) {
        let _ = self.connection.set(connection);
    }

    /// Access to the state store. Bus-facing callers only read through it.
    pub fn state(&self) -> MutexGuard<'_, StateStore> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind the JSON IPC socket dialect and pump its events until the
    /// stream dies. Any failure is terminal.
    pub async fn bind_socket(self: Arc<Self>, path: &Path) {
        let stream = match connect_with_retry(path).await {
            Some(stream) => stream,
            None => {
                warn!("backend socket {} not reachable; giving up", path.display());
                return;
            }
        };
        info!("bound backend socket {}", path.display());
        let (reader, writer) = stream.into_split();
        *self.transport.lock().await = BackendTransport::Socket(SocketTransport::new(writer));
        self.send_command(Command::observe_property(1, "time-pos"))
            .await;
        self.read_loop(reader).await;
        *self.transport.lock().await = BackendTransport::Unbound;
        info!("backend socket closed; transport unbound");
    }

    async fn read_loop(&self, reader: OwnedReadHalf) {
        let mut lines = BufReader::new(reader).lines();
        // volume/pause may not be observable until the backend has loaded
        // a file; subscribe to them on the first event instead of at bind
        let mut observe_full = false;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("backend socket reached end of stream");
                    break;
                }
                Err(e) => {
                    warn!("backend socket read failed: {e}");
                    break;
                }
            };
            let event: BackendEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("malformed backend event: {e}");
                    break;
                }
            };
            if event.event.as_deref() != Some("property-change") {
                continue;
            }
            if !observe_full {
                self.send_command(Command::observe_property(2, "volume"))
                    .await;
                self.send_command(Command::observe_property(3, "pause"))
                    .await;
                observe_full = true;
            }
            let Some(name) = event.name else { continue };
            let data = event.data.unwrap_or(serde_json::Value::Null);
            if let Some(change) = ChangeEvent::parse(&name, &data) {
                self.apply_event(change).await;
            }
        }
    }

    /// Bind a command FIFO. Any failure is terminal.
    pub async fn bind_pipe(&self, path: &Path, dialect: PipeDialect) {
        tokio::time::sleep(PIPE_SETTLE_DELAY).await;
        let file = match tokio::fs::OpenOptions::new().write(true).open(path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("failed to open backend pipe {}: {e}", path.display());
                return;
            }
        };
        info!("bound backend pipe {}", path.display());
        *self.transport.lock().await = BackendTransport::Pipe(PipeTransport::new(file, dialect));
        // prime the volume so the exported value reflects the backend
        self.send_command(Command::get_property("volume")).await;
    }

    /// Apply a normalized change event and announce the result on the bus.
    pub async fn apply_event(&self, event: ChangeEvent) {
        let (applied, changed_values) = {
            let mut store = self.state();
            let applied = store.apply(event);
            let changed_values: Vec<(&'static str, Value<'static>)> = applied
                .changed
                .iter()
                .filter_map(|name| {
                    store
                        .snapshot_value(PLAYER_INTERFACE, name)
                        .map(|value| (*name, value))
                })
                .collect();
            (applied, changed_values)
        };
        if applied.is_silent() {
            return;
        }
        self.announce(applied, changed_values).await;
    }

    async fn announce(
        &self,
        applied: Applied,
        changed_values: Vec<(&'static str, Value<'static>)>,
    ) {
        let Some(connection) = self.connection.get() else {
            return;
        };
        if !changed_values.is_empty() || !applied.invalidated.is_empty() {
            let changed: HashMap<&str, Value<'_>> = changed_values.into_iter().collect();
            let body = (PLAYER_INTERFACE, changed, applied.invalidated);
            if let Err(e) = connection
                .emit_signal(
                    Option::<&str>::None,
                    MPRIS_PATH,
                    "org.freedesktop.DBus.Properties",
                    "PropertiesChanged",
                    &body,
                )
                .await
            {
                warn!("failed to emit PropertiesChanged: {e}");
            }
        }
        if let Some(position) = applied.seeked {
            match connection
                .object_server()
                .interface::<_, PlayerInterface>(MPRIS_PATH)
                .await
            {
                Ok(iface) => {
                    if let Err(e) = PlayerInterface::seeked(iface.signal_context(), position).await
                    {
                        warn!("failed to emit Seeked: {e}");
                    }
                }
                Err(e) => warn!("player interface not registered: {e}"),
            }
        }
    }

    /// Write one command to the active transport; a failed write unbinds
    /// it for good.
    pub async fn send_command(&self, command: Command) {
        let mut transport = self.transport.lock().await;
        if let Err(e) = transport.send(&command).await {
            warn!("backend write failed: {e}; transport unbound");
            *transport = BackendTransport::Unbound;
        }
    }

    async fn socket_bound(&self) -> bool {
        self.transport.lock().await.is_socket()
    }

    async fn pipe_bound(&self) -> bool {
        self.transport.lock().await.is_pipe()
    }

    // Inbound method call translations.

    pub async fn next(&self) {
        self.send_command(Command::next()).await;
    }

    pub async fn previous(&self) {
        self.send_command(Command::previous()).await;
    }

    pub async fn stop(&self) {
        self.send_command(Command::stop()).await;
    }

    pub async fn pause(&self) {
        if self.socket_bound().await {
            self.send_command(Command::set_pause(true)).await;
        } else if self.state().playback_status() != PlaybackStatus::Paused {
            self.send_command(Command::toggle_pause()).await;
        }
    }

    pub async fn play(&self) {
        if self.socket_bound().await {
            self.send_command(Command::set_pause(false)).await;
        } else if self.state().playback_status() != PlaybackStatus::Playing {
            self.send_command(Command::toggle_pause()).await;
        }
    }

    pub async fn play_pause(&self) {
        if self.socket_bound().await {
            self.send_command(Command::cycle_pause()).await;
        } else {
            self.send_command(Command::toggle_pause()).await;
        }
    }

    pub async fn seek(&self, offset_us: i64) {
        self.send_command(Command::seek(offset_us)).await;
    }

    /// Requests for a track that is no longer current are stale and
    /// ignored.
    pub async fn set_position(&self, track_id: &str, position_us: i64) {
        let (current_track, current_position) = {
            let store = self.state();
            (store.metadata().track_path(), store.position_us())
        };
        if track_id != current_track {
            debug!("ignoring stale SetPosition for {track_id}");
            return;
        }
        self.send_command(Command::seek_exact(position_us - current_position))
            .await;
    }

    /// Handle a property write from the bus: validate against the table,
    /// forward what the backend understands, never mutate state directly.
    pub async fn set_property(&self, interface: &str, name: &str, value: PropValue) {
        let command = match self.state().set(interface, name, &value) {
            Ok(command) => command,
            Err(e) => {
                debug!("rejected property write: {e}");
                return;
            }
        };
        let Some(command) = command else { return };
        let follow_up = name == "Volume" && self.pipe_bound().await;
        self.send_command(command).await;
        if follow_up {
            // the pipe backends do not push volume changes; poll the echo
            self.send_command(Command::get_property("volume")).await;
        }
    }
}

async fn connect_with_retry(path: &Path) -> Option<UnixStream> {
    for attempt in 1..=SOCKET_CONNECT_TRIES {
        // the backend creates the socket while it starts up
        tokio::time::sleep(SOCKET_CONNECT_DELAY).await;
        match UnixStream::connect(path).await {
            Ok(stream) => return Some(stream),
            Err(e) => debug!("socket connect attempt {attempt} failed: {e}"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackMetadata;

    async fn socket_bridge() -> (Arc<Bridge>, UnixStream) {
        let bridge = Bridge::new("test.instance1");
        let (client, server) = UnixStream::pair().unwrap();
        let (_reader, writer) = client.into_split();
        *bridge.transport.lock().await = BackendTransport::Socket(SocketTransport::new(writer));
        (bridge, server)
    }

    async fn pipe_bridge(dialect: PipeDialect, tag: &str) -> (Arc<Bridge>, std::path::PathBuf) {
        let bridge = Bridge::new("test.instance1");
        let path = std::env::temp_dir().join(format!("tune-mpris-{tag}-{}", std::process::id()));
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .unwrap();
        *bridge.transport.lock().await = BackendTransport::Pipe(PipeTransport::new(file, dialect));
        (bridge, path)
    }

    async fn read_line(lines: &mut tokio::io::Lines<BufReader<UnixStream>>) -> String {
        lines.next_line().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn methods_encode_to_socket_lines() {
        let (bridge, server) = socket_bridge().await;
        bridge.next().await;
        bridge.previous().await;
        bridge.stop().await;
        bridge.play_pause().await;
        bridge.seek(5_000_000).await;

        let mut lines = BufReader::new(server).lines();
        assert_eq!(read_line(&mut lines).await, r#"{"command":["quit"]}"#);
        assert_eq!(read_line(&mut lines).await, r#"{"command":["quit",42]}"#);
        assert_eq!(read_line(&mut lines).await, r#"{"command":["quit",43]}"#);
        assert_eq!(read_line(&mut lines).await, r#"{"command":["cycle","pause"]}"#);
        assert_eq!(read_line(&mut lines).await, r#"{"command":["seek",5.0]}"#);
    }

    #[tokio::test]
    async fn socket_pause_and_play_set_the_property() {
        let (bridge, server) = socket_bridge().await;
        bridge.pause().await;
        bridge.play().await;

        let mut lines = BufReader::new(server).lines();
        assert_eq!(
            read_line(&mut lines).await,
            r#"{"command":["set_property","pause",true]}"#
        );
        assert_eq!(
            read_line(&mut lines).await,
            r#"{"command":["set_property","pause",false]}"#
        );
    }

    #[tokio::test]
    async fn pipe_pause_respects_current_status() {
        let (bridge, path) = pipe_bridge(PipeDialect::Mplayer, "pause").await;
        // Stopped, a pause toggle goes out
        bridge.pause().await;
        // now Paused, a second Pause must not toggle back
        bridge.apply_event(ChangeEvent::Pause(true)).await;
        bridge.pause().await;
        // Play from Paused toggles again
        bridge.play().await;

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "pause\npause\n");
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn set_position_issues_offset_seek() {
        let (bridge, server) = socket_bridge().await;
        bridge
            .apply_event(ChangeEvent::Metadata {
                id: "abc".to_string(),
                title: "t".to_string(),
                length_secs: 100.0,
            })
            .await;
        bridge.apply_event(ChangeEvent::TimePos(2.0)).await;
        bridge
            .set_position("/CurrentPlaylist/Track/abc", 5_000_000)
            .await;

        let mut lines = BufReader::new(server).lines();
        assert_eq!(read_line(&mut lines).await, r#"{"command":["seek",3.0,2]}"#);
    }

    #[tokio::test]
    async fn stale_set_position_is_ignored() {
        let (bridge, server) = socket_bridge().await;
        bridge
            .apply_event(ChangeEvent::Metadata {
                id: "abc".to_string(),
                title: "t".to_string(),
                length_secs: 100.0,
            })
            .await;
        bridge
            .set_position("/CurrentPlaylist/Track/zzz", 1_000_000)
            .await;
        bridge.next().await;

        // nothing was written for the stale request
        let mut lines = BufReader::new(server).lines();
        assert_eq!(read_line(&mut lines).await, r#"{"command":["quit"]}"#);
        assert_eq!(bridge.state().metadata(), TrackMetadata::new("abc", "t", 100.0));
    }

    #[tokio::test]
    async fn volume_set_on_pipe_issues_follow_up_query() {
        let (bridge, path) = pipe_bridge(PipeDialect::Mplayer, "volume").await;
        bridge
            .set_property(PLAYER_INTERFACE, "Rate", PropValue::F64(1.5))
            .await;
        bridge
            .set_property(PLAYER_INTERFACE, "Volume", PropValue::F64(0.75))
            .await;

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "set_property volume 75\nget_property volume\n");
        // the table still holds the old value until the backend echoes
        assert_eq!(bridge.state().number(PLAYER_INTERFACE, "Volume"), 1.0);
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn write_failure_unbinds_the_transport() {
        let (bridge, server) = socket_bridge().await;
        drop(server);
        bridge.next().await;
        bridge.next().await;
        assert!(matches!(
            *bridge.transport.lock().await,
            BackendTransport::Unbound
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_retry_exhaustion_settles_unbound() {
        let bridge = Bridge::new("test.instance1");
        let path = std::env::temp_dir().join("tune-mpris-no-such-socket");
        bridge.clone().bind_socket(&path).await;
        assert!(matches!(
            *bridge.transport.lock().await,
            BackendTransport::Unbound
        ));
        // commands after the terminal failure are silent no-ops
        bridge.next().await;
    }
}
