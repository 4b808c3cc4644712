use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame preamble shared by both directions: `'$'` `'M'`.
pub const PREAMBLE: [u8; 2] = [b'$', b'M'];

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Bytes a frame adds around its payload: preamble, marker, length, command, checksum.
pub const OVERHEAD: usize = 6;

/// Which way a frame travels over the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to device, marker `'<'`.
    ToDevice,
    /// Device to host, marker `'>'`.
    FromDevice,
}

impl Direction {
    /// The marker byte that follows the preamble.
    pub fn marker(self) -> u8 {
        match self {
            Direction::ToDevice => b'<',
            Direction::FromDevice => b'>',
        }
    }
}

/// A validated message: command identifier plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The command this message carries.
    pub command: u8,
    /// The message payload (0..=255 bytes).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        OVERHEAD + self.payload.len()
    }
}

/// Running XOR of length, command and every payload byte.
pub fn checksum(length: u8, command: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(length ^ command, |acc, b| acc ^ b)
}

/// Encode a host-to-device frame.
///
/// Wire format:
/// ```text
/// ┌─────┬─────┬─────┬──────┬──────┬─────────────┬─────┐
/// │ '$' │ 'M' │ '<' │ LEN  │ CMD  │ PAYLOAD     │ CHK │
/// │     │     │     │ (1B) │ (1B) │ (LEN bytes) │(1B) │
/// └─────┴─────┴─────┴──────┴──────┴─────────────┴─────┘
/// ```
pub fn encode_frame(command: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    encode_frame_with(Direction::ToDevice, command, payload, dst)
}

/// Encode a frame travelling in `direction`.
pub fn encode_frame_with(
    direction: Direction,
    command: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = u8::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD,
    })?;

    dst.reserve(OVERHEAD + payload.len());
    dst.put_slice(&PREAMBLE);
    dst.put_u8(direction.marker());
    dst.put_u8(length);
    dst.put_u8(command);
    dst.put_slice(payload);
    dst.put_u8(checksum(length, command, payload));
    Ok(())
}
