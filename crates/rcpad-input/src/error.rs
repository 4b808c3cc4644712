use std::path::PathBuf;

/// Device-level failures.
///
/// The multiplexer recovers from all of these locally (skip, or close and
/// re-scan); they exist for logging.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// A device node could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading from an open device failed; the device is assumed gone.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Listing candidate devices failed.
    #[error("failed to enumerate {path}: {source}")]
    Enumerate {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DeviceError>;
