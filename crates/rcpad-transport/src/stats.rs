use std::sync::atomic::{AtomicU64, Ordering};

/// Link counters, updated by the receive thread and by senders.
#[derive(Debug, Default)]
pub struct TransportStats {
    bytes_received: AtomicU64,
    frames_received: AtomicU64,
    checksum_failures: AtomicU64,
    frames_sent: AtomicU64,
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_received: u64,
    pub frames_received: u64,
    pub checksum_failures: u64,
    pub frames_sent: u64,
}

impl TransportStats {
    pub(crate) fn record_bytes(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_checksum_failures(&self, total: u64) {
        self.checksum_failures.store(total, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
        }
    }
}
