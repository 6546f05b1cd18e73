//! tune-mpris - MPRIS2 bridge for console playback backends
//!
//! Features:
//! - Serves the MPRIS2 root and player interfaces on the session bus
//! - Dual backend dialects: mpv JSON IPC socket, mplayer/mpv command FIFO
//! - Single-consumer player relay decoupling the player from transport IO

pub mod bridge;
pub mod command;
pub mod error;
pub mod relay;
pub mod registrar;
pub mod service;
pub mod store;
pub mod transport;
pub mod types;

pub use bridge::Bridge;
pub use command::{Atom, Command, PipeDialect};
pub use error::BridgeError;
pub use registrar::Registrar;
pub use relay::PlayerMessage;
pub use store::{Applied, PropValue, StateStore};
pub use types::{ChangeEvent, PlaybackStatus, TrackMetadata};

/// Well-known MPRIS2 object path.
pub const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";

/// Root interface name.
pub const ROOT_INTERFACE: &str = "org.mpris.MediaPlayer2";

/// Player interface name.
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Prefix for per-instance bus names.
pub const BUS_NAME_PREFIX: &str = "org.mpris.MediaPlayer2.";
