//! Checksummed message framing for the controller serial protocol.
//!
//! Every message on the wire is framed as:
//! - A 3-byte preamble: `'$'`, `'M'` and a direction marker
//!   (`'<'` host to device, `'>'` device to host)
//! - A 1-byte payload length
//! - A 1-byte command identifier
//! - The payload
//! - A 1-byte XOR checksum over length, command and payload
//!
//! Encoding is a pure function over a buffer; decoding is a byte-at-a-time
//! state machine that silently drops anything malformed.

pub mod codec;
pub mod command;
pub mod decoder;
pub mod error;
pub mod values;

pub use codec::{
    checksum, encode_frame, encode_frame_with, Direction, Frame, MAX_PAYLOAD, OVERHEAD, PREAMBLE,
};
pub use command::{command_name, GET_BATTERY_ADC, NOP};
pub use decoder::{DecoderState, FrameDecoder};
pub use error::{FrameError, Result};
