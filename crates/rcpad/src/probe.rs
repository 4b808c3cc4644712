use std::sync::Arc;

use rcpad_frame::GET_BATTERY_ADC;
use rcpad_poll::PollSource;
use rcpad_transport::Transport;
use tracing::{trace, warn};

/// How often the battery is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    pub rate_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { rate_ms: 2000 }
    }
}

/// Sends `GET_BATTERY_ADC` every `rate_ms`, starting on the first tick.
///
/// Replies are not awaited here; they reach the battery handler through the
/// transport's router.
pub struct BatteryProbe {
    transport: Arc<Transport>,
    config: ProbeConfig,
    last_probe_at: Option<u64>,
}

impl BatteryProbe {
    pub fn new(transport: Arc<Transport>, config: ProbeConfig) -> Self {
        Self {
            transport,
            config,
            last_probe_at: None,
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }
}

impl PollSource for BatteryProbe {
    fn name(&self) -> &str {
        "battery-probe"
    }

    fn process(&mut self, now_ms: u64) -> u64 {
        if let Some(last) = self.last_probe_at {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.config.rate_ms {
                return self.config.rate_ms - elapsed;
            }
        }

        self.last_probe_at = Some(now_ms);
        match self.transport.send(GET_BATTERY_ADC, &[]) {
            Ok(()) => trace!("battery probe sent"),
            Err(err) => warn!(error = %err, "battery probe failed"),
        }
        0
    }

    fn stop(&mut self) {
        self.transport.stop();
    }
}
