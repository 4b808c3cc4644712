use std::fmt;
use std::io;

use rcpad_serial::SerialError;
use rcpad_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn serial_error(context: &str, err: SerialError) -> CliError {
    match err {
        SerialError::Io(source) => io_error(context, source),
        SerialError::Open { ref source, .. } | SerialError::Config(ref source) => {
            let code = match source.kind() {
                serialport::ErrorKind::NoDevice => FAILURE,
                serialport::ErrorKind::InvalidInput => USAGE,
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => PERMISSION_DENIED,
                _ => TRANSPORT_ERROR,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Serial(err) => serial_error(context, err),
        TransportError::WriteFailed(source) => io_error(context, source),
        TransportError::ResponseTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        TransportError::PayloadTooLarge { .. } | TransportError::UnexpectedSize { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        TransportError::Spawn(source) => {
            CliError::new(INTERNAL, format!("{context}: {source}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        let err = TransportError::ResponseTimeout {
            command: 0x01,
            timeout: Duration::from_millis(50),
        };
        assert_eq!(transport_error("probe", err).code, TIMEOUT);
    }

    #[test]
    fn bad_replies_are_data_errors() {
        let err = TransportError::UnexpectedSize {
            command: 0x01,
            expected: 2,
            actual: 1,
        };
        let cli = transport_error("probe", err);
        assert_eq!(cli.code, DATA_INVALID);
        assert!(cli.message.starts_with("probe: "));
    }

    #[test]
    fn write_failures_follow_io_kind() {
        let err = TransportError::WriteFailed(io::ErrorKind::TimedOut.into());
        assert_eq!(transport_error("send", err).code, TIMEOUT);
    }
}
