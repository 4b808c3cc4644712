use bytes::BytesMut;
use tracing::trace;

use crate::codec::{checksum, Direction, Frame, MAX_PAYLOAD, PREAMBLE};

/// Where the decoder is within a frame.
///
/// Length and checksum only exist once the header has been read, so they live
/// in the variants that need them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for `'$'`; every other byte is ignored.
    Idle,
    /// Saw `'$'`, expecting `'M'`.
    SawStart,
    /// Saw `'$M'`, expecting the direction marker.
    SawMagic,
    /// Header complete, next byte is the payload length.
    SawMarker,
    /// Length known, next byte is the command.
    ReadingSizeCmd { length: u8, checksum: u8 },
    /// Accumulating payload; the byte after the last payload byte is the checksum.
    ReadingPayload { length: u8, command: u8, checksum: u8 },
}

/// Byte-at-a-time frame decoder.
///
/// Feed it every received byte in order. Frames come out once their checksum
/// byte has been seen and matches; corrupted frames are dropped without
/// surfacing an error and the decoder resynchronises on the next `'$'`.
#[derive(Debug)]
pub struct FrameDecoder {
    marker: u8,
    state: DecoderState,
    payload: BytesMut,
    frames_decoded: u64,
    checksum_failures: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Decoder for device-to-host traffic (`'$M>'`).
    pub fn new() -> Self {
        Self::for_direction(Direction::FromDevice)
    }

    /// Decoder for frames travelling in `direction`.
    pub fn for_direction(direction: Direction) -> Self {
        Self {
            marker: direction.marker(),
            state: DecoderState::Idle,
            payload: BytesMut::with_capacity(MAX_PAYLOAD),
            frames_decoded: 0,
            checksum_failures: 0,
        }
    }

    /// Consume one byte, returning a frame if it completed one.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        let state = self.state;
        let (next, frame) = match state {
            DecoderState::Idle if byte == PREAMBLE[0] => (DecoderState::SawStart, None),
            DecoderState::Idle => (DecoderState::Idle, None),
            DecoderState::SawStart if byte == PREAMBLE[1] => (DecoderState::SawMagic, None),
            DecoderState::SawMagic if byte == self.marker => (DecoderState::SawMarker, None),
            DecoderState::SawStart | DecoderState::SawMagic => (DecoderState::Idle, None),
            DecoderState::SawMarker => {
                self.payload.clear();
                (
                    DecoderState::ReadingSizeCmd {
                        length: byte,
                        checksum: byte,
                    },
                    None,
                )
            }
            DecoderState::ReadingSizeCmd { length, checksum } => (
                DecoderState::ReadingPayload {
                    length,
                    command: byte,
                    checksum: checksum ^ byte,
                },
                None,
            ),
            DecoderState::ReadingPayload {
                length,
                command,
                checksum,
            } if self.payload.len() < usize::from(length) => {
                self.payload.extend_from_slice(&[byte]);
                (
                    DecoderState::ReadingPayload {
                        length,
                        command,
                        checksum: checksum ^ byte,
                    },
                    None,
                )
            }
            DecoderState::ReadingPayload {
                command, checksum, ..
            } => (DecoderState::Idle, self.finish(command, checksum, byte)),
        };

        self.state = next;
        frame
    }

    /// Feed a run of bytes, passing every completed frame to `on_frame`.
    pub fn feed_slice(&mut self, bytes: &[u8], mut on_frame: impl FnMut(Frame)) {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte) {
                on_frame(frame);
            }
        }
    }

    fn finish(&mut self, command: u8, expected: u8, received: u8) -> Option<Frame> {
        let payload = self.payload.split().freeze();
        if received != expected {
            self.checksum_failures += 1;
            trace!(command, expected, received, "dropping frame with bad checksum");
            return None;
        }
        debug_assert_eq!(
            expected,
            checksum(payload.len() as u8, command, &payload)
        );
        self.frames_decoded += 1;
        Some(Frame { command, payload })
    }

    /// Current state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Abandon any partial frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.payload.clear();
    }

    /// Frames emitted so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Frames dropped because their checksum byte did not match.
    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures
    }
}
