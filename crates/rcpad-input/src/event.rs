//! Linux joystick API event records (`struct js_event`).

/// Size of one event record: `u32 time, i16 value, u8 type, u8 number`.
pub const EVENT_SIZE: usize = 8;

/// Button pressed or released.
pub const JS_EVENT_BUTTON: u8 = 0x01;
/// Axis moved.
pub const JS_EVENT_AXIS: u8 = 0x02;
/// Synthetic event reporting initial state after open.
pub const JS_EVENT_INIT: u8 = 0x80;

/// One decoded joystick event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsEvent {
    /// Driver timestamp in milliseconds.
    pub time_ms: u32,
    pub value: i16,
    pub kind: u8,
    pub number: u8,
}

impl JsEvent {
    pub fn parse(raw: &[u8; EVENT_SIZE]) -> Self {
        Self {
            time_ms: u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]),
            value: i16::from_ne_bytes([raw[4], raw[5]]),
            kind: raw[6],
            number: raw[7],
        }
    }

    pub fn to_bytes(&self) -> [u8; EVENT_SIZE] {
        let mut raw = [0u8; EVENT_SIZE];
        raw[..4].copy_from_slice(&self.time_ms.to_ne_bytes());
        raw[4..6].copy_from_slice(&self.value.to_ne_bytes());
        raw[6] = self.kind;
        raw[7] = self.number;
        raw
    }

    /// Button `number` pressed.
    pub fn button_press(number: u8) -> Self {
        Self {
            time_ms: 0,
            value: 1,
            kind: JS_EVENT_BUTTON,
            number,
        }
    }

    pub fn is_init(&self) -> bool {
        self.kind & JS_EVENT_INIT != 0
    }

    pub fn is_button_press(&self) -> bool {
        self.kind == JS_EVENT_BUTTON && self.value == 1
    }
}
