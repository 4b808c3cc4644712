use std::path::PathBuf;

/// Errors that can occur while opening or driving a serial link.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: serialport::Error,
    },

    /// Failed to reconfigure an open port.
    #[error("serial configuration error: {0}")]
    Config(#[from] serialport::Error),

    /// An I/O error occurred on the serial stream.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
