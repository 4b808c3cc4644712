//! Command identifiers understood by the controller firmware.

/// No operation. Replies are ignored.
pub const NOP: u8 = 0x00;

/// Read the battery ADC. The device replies with a 2-byte little-endian reading.
pub const GET_BATTERY_ADC: u8 = 0x01;

/// Returns a human-readable name for a command identifier.
pub fn command_name(command: u8) -> &'static str {
    match command {
        NOP => "NOP",
        GET_BATTERY_ADC => "GET_BATTERY_ADC",
        _ => "UNKNOWN",
    }
}
