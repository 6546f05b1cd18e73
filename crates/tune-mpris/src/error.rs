//! Error types for tune-mpris

/// Bridge errors
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("D-Bus fdo error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("this object does not implement the {0} interface")]
    UnknownInterface(String),
}
