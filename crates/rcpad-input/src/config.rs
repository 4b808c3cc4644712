/// Timing for a [`DeviceMultiplexer`](crate::DeviceMultiplexer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplexerConfig {
    /// Minimum gap between accepted events from one device, and the idle poll delay.
    pub rate_event_ms: u64,
    /// How often the device set is re-enumerated.
    pub rate_rescan_ms: u64,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            rate_event_ms: 50,
            rate_rescan_ms: 2000,
        }
    }
}
