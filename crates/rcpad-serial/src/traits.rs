use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected serial link. Implements `Read` and `Write`.
///
/// Wraps a hardware port opened through `serialport`. On Unix a connected
/// socket can take the port's place so the controller side of the link can be
/// simulated in-process.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    Port(Box<dyn serialport::SerialPort>),
    #[cfg(unix)]
    Socket(std::os::unix::net::UnixStream),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.read(buf),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.write(buf),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.flush(),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.flush(),
        }
    }
}

impl SerialStream {
    pub(crate) fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: SerialStreamInner::Port(port),
        }
    }

    /// Wrap a connected Unix socket as a serial stream.
    #[cfg(unix)]
    pub fn from_socket(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SerialStreamInner::Socket(stream),
        }
    }

    /// Create a connected pair: `(host, device)`.
    ///
    /// Bytes written to one end are readable from the other.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (host, device) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_socket(host), Self::from_socket(device)))
    }

    /// Set the timeout for blocking reads and writes on this handle.
    ///
    /// Handles obtained through [`try_clone`](Self::try_clone) keep their own
    /// timeout, so a reader and a writer can be tuned independently.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.set_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                Ok(())
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            SerialStreamInner::Port(port) => Ok(Self::from_port(port.try_clone()?)),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => Ok(Self::from_socket(stream.try_clone()?)),
        }
    }

    /// Port name for diagnostics.
    pub fn name(&self) -> String {
        match &self.inner {
            SerialStreamInner::Port(port) => port.name().unwrap_or_else(|| "serial".to_string()),
            #[cfg(unix)]
            SerialStreamInner::Socket(_) => "socket".to_string(),
        }
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    fn pair_carries_bytes_both_ways() {
        let (mut host, mut device) = SerialStream::pair().unwrap();

        host.write_all(b"$M<").unwrap();
        let mut buf = [0u8; 3];
        device.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"$M<");

        device.write_all(b"$M>").unwrap();
        host.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"$M>");
    }

    #[test]
    fn clone_shares_the_link() {
        let (host, mut device) = SerialStream::pair().unwrap();
        let mut writer = host.try_clone().unwrap();

        writer.write_all(&[0x24]).unwrap();
        let mut buf = [0u8; 1];
        device.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0x24);
        assert_eq!(host.name(), "socket");
    }

    #[test]
    fn timeout_bounds_idle_reads() {
        let (mut host, _device) = SerialStream::pair().unwrap();
        host.set_timeout(Duration::from_millis(10)).unwrap();

        let mut buf = [0u8; 1];
        let err = host.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));
    }
}
