//! Little-endian value helpers for frame payloads.
//!
//! The controller firmware packs every multi-byte value little-endian. Readers
//! return `None` when the payload size does not match the value exactly.

pub fn to_u16(data: &[u8]) -> Option<u16> {
    exact::<2>(data).map(u16::from_le_bytes)
}

pub fn to_i16(data: &[u8]) -> Option<i16> {
    exact::<2>(data).map(i16::from_le_bytes)
}

pub fn to_u32(data: &[u8]) -> Option<u32> {
    exact::<4>(data).map(u32::from_le_bytes)
}

pub fn to_i32(data: &[u8]) -> Option<i32> {
    exact::<4>(data).map(i32::from_le_bytes)
}

pub fn from_u16(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn from_i16(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn from_u32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

pub fn from_i32(value: i32) -> [u8; 4] {
    value.to_le_bytes()
}

fn exact<const N: usize>(data: &[u8]) -> Option<[u8; N]> {
    data.try_into().ok()
}
