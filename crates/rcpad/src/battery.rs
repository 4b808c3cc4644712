//! Battery telemetry.
//!
//! The controller answers `GET_BATTERY_ADC` with a raw 10-bit reading taken
//! behind a resistor divider. [`BatteryMonitor`] converts it to pack voltage,
//! smooths it over a short window and reports a coarse level whenever that
//! level changes.

use std::collections::VecDeque;
use std::fmt;

use rcpad_frame::values::to_u16;
use tracing::{debug, info};

/// Divider and threshold settings for a two-cell pack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryConfig {
    /// Upper divider resistor, ohms.
    pub r1: f64,
    /// Lower divider resistor, ohms.
    pub r2: f64,
    /// ADC reference voltage.
    pub full_scale: f64,
    /// ADC steps across `full_scale`.
    pub resolution: f64,
    /// Samples averaged for the level decision.
    pub window: usize,
    /// Above this the pack is on the charger.
    pub volt_charging: f64,
    pub volt_100: f64,
    pub volt_75: f64,
    pub volt_50: f64,
    pub volt_25: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            r1: 10_000.0,
            r2: 5_100.0,
            full_scale: 5.0,
            resolution: 1024.0,
            window: 20,
            volt_charging: 8.45,
            volt_100: 8.2,
            volt_75: 7.52,
            volt_50: 7.26,
            volt_25: 7.0,
        }
    }
}

impl BatteryConfig {
    /// Pack voltage for a raw ADC reading.
    pub fn adc_to_volt(&self, adc: u16) -> f64 {
        let vout = f64::from(adc) * self.full_scale / self.resolution;
        vout * (self.r1 + self.r2) / self.r2
    }

    /// Nearest ADC reading for a pack voltage, clamped to `u16`.
    pub fn volt_to_adc(&self, volt: f64) -> u16 {
        let vout = self.r2 / (self.r1 + self.r2) * volt;
        let adc = (vout / self.full_scale * self.resolution).round();
        adc.clamp(0.0, f64::from(u16::MAX)) as u16
    }

    /// Bucket an averaged, non-charging voltage.
    pub fn level_for(&self, volt: f64) -> BatteryLevel {
        if volt > self.volt_100 {
            BatteryLevel::Full
        } else if volt > self.volt_75 {
            BatteryLevel::High
        } else if volt > self.volt_50 {
            BatteryLevel::Half
        } else if volt > self.volt_25 {
            BatteryLevel::Low
        } else {
            BatteryLevel::Empty
        }
    }
}

/// Coarse battery state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryLevel {
    Charging,
    Full,
    High,
    Half,
    Low,
    Empty,
}

impl BatteryLevel {
    /// Icon suffix: `"charging"` or the percentage bucket.
    pub fn as_str(self) -> &'static str {
        match self {
            BatteryLevel::Charging => "charging",
            BatteryLevel::Full => "100",
            BatteryLevel::High => "75",
            BatteryLevel::Half => "50",
            BatteryLevel::Low => "25",
            BatteryLevel::Empty => "0",
        }
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Most recent discharge voltages plus the charging flag.
///
/// Samples taken while charging are not recorded, and leaving the charging
/// state discards everything collected before it.
#[derive(Debug, Clone)]
pub struct BatteryWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    charging: bool,
}

impl BatteryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            charging: false,
        }
    }

    pub fn set_charging(&mut self) {
        self.charging = true;
    }

    /// Record a discharge sample, evicting the oldest when full.
    pub fn push(&mut self, volt: f64) {
        if self.charging {
            self.samples.clear();
            self.charging = false;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(volt);
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Where level changes are shown.
pub trait BatteryDisplay {
    fn show_battery(&mut self, level: BatteryLevel);
}

impl<F: FnMut(BatteryLevel)> BatteryDisplay for F {
    fn show_battery(&mut self, level: BatteryLevel) {
        self(level)
    }
}

/// `GET_BATTERY_ADC` reply handler.
pub struct BatteryMonitor<D> {
    config: BatteryConfig,
    window: BatteryWindow,
    current: Option<BatteryLevel>,
    display: D,
}

impl<D: BatteryDisplay> BatteryMonitor<D> {
    pub fn new(config: BatteryConfig, display: D) -> Self {
        Self {
            window: BatteryWindow::new(config.window),
            config,
            current: None,
            display,
        }
    }

    /// Handle one reply payload (little-endian `u16` ADC reading).
    pub fn on_payload(&mut self, payload: &[u8]) {
        match to_u16(payload) {
            Some(adc) => {
                let volt = self.config.adc_to_volt(adc);
                debug!(adc, volt, "battery reading");
                self.on_sample(volt);
            }
            None => debug!(len = payload.len(), "ignoring malformed battery reply"),
        }
    }

    /// Feed one pack voltage and return the resulting level.
    pub fn on_sample(&mut self, volt: f64) -> BatteryLevel {
        let level = if volt > self.config.volt_charging {
            self.window.set_charging();
            BatteryLevel::Charging
        } else {
            self.window.push(volt);
            let mean = self.window.mean().unwrap_or(volt);
            self.config.level_for(mean)
        };

        if self.current != Some(level) {
            info!(level = %level, "battery level changed");
            self.current = Some(level);
            self.display.show_battery(level);
        }
        level
    }

    pub fn level(&self) -> Option<BatteryLevel> {
        self.current
    }

    pub fn window(&self) -> &BatteryWindow {
        &self.window
    }

    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    /// Turn the monitor into a router handler.
    pub fn into_handler(mut self) -> impl FnMut(&[u8]) + Send + 'static
    where
        D: Send + 'static,
    {
        move |payload: &[u8]| self.on_payload(payload)
    }
}
