//! Hot-pluggable input device polling.
//!
//! The [`DeviceMultiplexer`] keeps a set of non-blocking device handles open,
//! reads one event record per device per tick, debounces repeated events and
//! re-enumerates periodically to notice devices coming and going.

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod multiplexer;

pub use backend::{DeviceBackend, DevicePattern, JoystickBackend, WILDCARD_NAME};
pub use config::MultiplexerConfig;
pub use error::{DeviceError, Result};
pub use event::{JsEvent, EVENT_SIZE, JS_EVENT_AXIS, JS_EVENT_BUTTON, JS_EVENT_INIT};
pub use multiplexer::{DeviceHandle, DeviceMultiplexer, EventSink, MultiplexerState};
