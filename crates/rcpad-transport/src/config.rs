use std::time::Duration;

/// Configuration for a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Default wait used by `send_and_get`.
    pub response_timeout: Duration,
    /// Read timeout on the receive handle; bounds how long shutdown waits
    /// for the receive thread.
    pub read_poll_interval: Duration,
    /// Write timeout on the send handle.
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(3),
            read_poll_interval: Duration::from_millis(100),
            write_timeout: Duration::from_millis(100),
        }
    }
}
