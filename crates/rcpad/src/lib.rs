//! Handheld controller companion service.
//!
//! Polls a microcontroller for battery telemetry over an MSP-style serial
//! link and turns joystick hot-key presses into volume and Wi-Fi changes,
//! showing the results as on-screen overlay icons.
//!
//! # Crate Structure
//!
//! - [`battery`]: Voltage smoothing and level bucketing for `GET_BATTERY_ADC` replies
//! - [`probe`]: Periodic battery request, driven by the scheduler
//! - [`overlay`]: Worker thread that launches the external image viewer
//! - [`actions`]: Joystick button mapping and the system commands behind it
//!
//! The protocol engine, scheduler and device multiplexer live in their own
//! crates and are re-exported here.

pub mod actions;
pub mod battery;
pub mod overlay;
pub mod probe;

/// Re-export serial link types.
pub mod serial {
    pub use rcpad_serial::*;
}

/// Re-export wire codec types.
pub mod frame {
    pub use rcpad_frame::*;
}

/// Re-export transport engine types.
pub mod transport {
    pub use rcpad_transport::*;
}

/// Re-export scheduler types.
pub mod poll {
    pub use rcpad_poll::*;
}

/// Re-export input multiplexer types.
pub mod input {
    pub use rcpad_input::*;
}

pub use actions::{Action, ActionSink, JoystickActions, OsdKey, SystemActions};
pub use battery::{BatteryConfig, BatteryDisplay, BatteryLevel, BatteryMonitor, BatteryWindow};
pub use overlay::{Overlay, OverlayConfig, OverlayHandle, OverlayRequest};
pub use probe::{BatteryProbe, ProbeConfig};
