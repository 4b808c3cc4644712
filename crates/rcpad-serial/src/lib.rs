//! Serial link abstraction.
//!
//! This is the lowest layer of rcpad. It hides the concrete port type behind
//! [`SerialStream`], which is what the transport engine reads from and writes
//! to. On Unix a socket pair can stand in for a real port, which is how the
//! upper layers test against a simulated controller.

pub mod error;
pub mod port;
pub mod traits;

pub use error::{Result, SerialError};
pub use port::{open, SerialPortConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
pub use traits::SerialStream;
