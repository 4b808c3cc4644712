use std::time::Duration;

/// Errors returned to the caller of a send operation.
///
/// Framing problems on the receive side never show up here: a corrupted
/// reply is dropped and the waiter simply runs into its timeout.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The payload does not fit in a single frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Writing the frame to the link failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// No reply arrived before the deadline.
    #[error("no response to command {command:#04x} within {timeout:?}")]
    ResponseTimeout { command: u8, timeout: Duration },

    /// A reply arrived but its payload length is not what the caller expected.
    #[error("unexpected response size for command {command:#04x} (expected {expected}, got {actual})")]
    UnexpectedSize {
        command: u8,
        expected: usize,
        actual: usize,
    },

    /// Preparing the serial link failed.
    #[error("serial error: {0}")]
    Serial(#[from] rcpad_serial::SerialError),

    /// The receive thread could not be started.
    #[error("failed to start receive thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<rcpad_frame::FrameError> for TransportError {
    fn from(err: rcpad_frame::FrameError) -> Self {
        match err {
            rcpad_frame::FrameError::PayloadTooLarge { size, max } => {
                TransportError::PayloadTooLarge { size, max }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
