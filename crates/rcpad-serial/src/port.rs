use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, SerialError};
use crate::traits::SerialStream;

/// Baud rate the controller firmware listens on.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-call I/O timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Configuration for opening a serial port.
#[derive(Debug, Clone)]
pub struct SerialPortConfig {
    /// Device node, e.g. `/dev/ttyACM0`.
    pub path: PathBuf,
    /// Line speed.
    pub baud_rate: u32,
    /// Timeout applied to blocking reads and writes on the opened handle.
    pub timeout: Duration,
}

impl SerialPortConfig {
    /// Configuration for `path` with default line settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Open a serial port (8N1, no flow control).
pub fn open(config: &SerialPortConfig) -> Result<SerialStream> {
    let path = config.path.to_string_lossy().into_owned();
    debug!(path = %path, baud = config.baud_rate, "opening serial port");

    let port = serialport::new(path.as_str(), config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(config.timeout)
        .open()
        .map_err(|source| SerialError::Open {
            path: config.path.clone(),
            source,
        })?;

    info!(path = %path, baud = config.baud_rate, "serial port open");
    Ok(SerialStream::from_port(port))
}
