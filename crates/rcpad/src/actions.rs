//! Joystick hot-keys.
//!
//! Buttons 16-24 of the handheld's internal controller are wired to volume,
//! Wi-Fi and the LCD's on-screen-display keys.

use std::path::{Path, PathBuf};
use std::process::Command;

use rcpad_input::{EventSink, JsEvent};
use tracing::{debug, info, warn};

use crate::overlay::{OverlayHandle, OverlayRequest};

/// Volume change per button press, percent.
pub const VOLUME_STEP: u8 = 6;
/// Volume is only raised while below this.
pub const VOLUME_RAISE_LIMIT: u8 = 95;
/// Volume is only lowered while above this.
pub const VOLUME_LOWER_LIMIT: u8 = 5;

/// LCD controller keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsdKey {
    Up,
    Menu,
    Down,
    Return,
    Power,
}

/// What a button press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    VolumeDown,
    VolumeUp,
    ToggleWifi,
    Osd(OsdKey),
}

impl Action {
    pub fn for_button(number: u8) -> Option<Self> {
        match number {
            16 => Some(Action::VolumeDown),
            17 => Some(Action::VolumeUp),
            19 => Some(Action::ToggleWifi),
            20 => Some(Action::Osd(OsdKey::Up)),
            21 => Some(Action::Osd(OsdKey::Menu)),
            22 => Some(Action::Osd(OsdKey::Down)),
            23 => Some(Action::Osd(OsdKey::Return)),
            24 => Some(Action::Osd(OsdKey::Power)),
            _ => None,
        }
    }
}

/// Carries out actions.
pub trait ActionSink {
    fn perform(&mut self, action: Action);
}

impl<F: FnMut(Action)> ActionSink for F {
    fn perform(&mut self, action: Action) {
        self(action)
    }
}

/// Adapts an [`ActionSink`] to the device multiplexer.
///
/// Init events are rejected. Every other event counts as accepted for
/// debouncing, whether or not it maps to an action.
#[derive(Debug)]
pub struct JoystickActions<A> {
    sink: A,
}

impl<A: ActionSink> JoystickActions<A> {
    pub fn new(sink: A) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }
}

impl<A: ActionSink> EventSink for JoystickActions<A> {
    fn process_event(&mut self, path: &Path, event: &JsEvent) -> bool {
        if event.is_init() {
            return false;
        }
        if event.is_button_press() {
            if let Some(action) = Action::for_button(event.number) {
                debug!(path = %path.display(), button = event.number, ?action, "button pressed");
                self.sink.perform(action);
            }
        }
        true
    }
}

/// Next volume after a raise, or `None` at the top.
pub fn volume_up(current: u8) -> Option<u8> {
    (current < VOLUME_RAISE_LIMIT).then(|| current.saturating_add(VOLUME_STEP).min(100))
}

/// Next volume after a lower, or `None` at the bottom.
pub fn volume_down(current: u8) -> Option<u8> {
    (current > VOLUME_LOWER_LIMIT).then(|| current.saturating_sub(VOLUME_STEP))
}

/// First `NN%` figure in `amixer get` output.
pub fn parse_mixer_percent(output: &str) -> Option<u8> {
    output.split('[').find_map(|part| {
        let (digits, _) = part.split_once("%]")?;
        digits.parse().ok()
    })
}

/// Volume through `amixer`, Wi-Fi through `ifconfig`, feedback on the overlay.
#[derive(Debug)]
pub struct SystemActions {
    control: String,
    interface: String,
    volume: u8,
    wifi_up: bool,
    overlay: Option<OverlayHandle>,
}

impl SystemActions {
    /// Read the current mixer volume and interface state from the system.
    pub fn detect(overlay: Option<OverlayHandle>) -> Self {
        let control = "PCM".to_string();
        let interface = "wlan0".to_string();
        let volume = read_mixer_volume(&control).unwrap_or(0);
        let wifi_up = read_operstate(&operstate_path(&interface));
        info!(volume, wifi_up, "system state detected");
        Self::new(control, interface, volume, wifi_up, overlay)
    }

    pub fn new(
        control: impl Into<String>,
        interface: impl Into<String>,
        volume: u8,
        wifi_up: bool,
        overlay: Option<OverlayHandle>,
    ) -> Self {
        Self {
            control: control.into(),
            interface: interface.into(),
            volume,
            wifi_up,
            overlay,
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn wifi_up(&self) -> bool {
        self.wifi_up
    }

    fn set_volume(&mut self, next: Option<u8>) {
        if let Some(volume) = next {
            self.volume = volume;
            let level = format!("{volume}%");
            run("amixer", &["set", &self.control, "--", &level]);
        }
        self.show(OverlayRequest::Volume(self.volume));
    }

    fn toggle_wifi(&mut self) {
        self.wifi_up = !self.wifi_up;
        let state = if self.wifi_up { "up" } else { "down" };
        run("ifconfig", &[&self.interface, state]);
        self.show(OverlayRequest::Wifi(self.wifi_up));
    }

    fn show(&self, request: OverlayRequest) {
        if let Some(overlay) = &self.overlay {
            overlay.show(request);
        }
    }
}

impl ActionSink for SystemActions {
    fn perform(&mut self, action: Action) {
        match action {
            Action::VolumeUp => self.set_volume(volume_up(self.volume)),
            Action::VolumeDown => self.set_volume(volume_down(self.volume)),
            Action::ToggleWifi => self.toggle_wifi(),
            Action::Osd(key) => info!(?key, "OSD key pressed"),
        }
    }
}

fn operstate_path(interface: &str) -> PathBuf {
    Path::new("/sys/class/net").join(interface).join("operstate")
}

fn read_operstate(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|state| state.trim().eq_ignore_ascii_case("up"))
        .unwrap_or(false)
}

fn read_mixer_volume(control: &str) -> Option<u8> {
    let output = Command::new("amixer").args(["get", control]).output();
    match output {
        Ok(output) if output.status.success() => {
            parse_mixer_percent(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(status = %output.status, "amixer get failed");
            None
        }
        Err(err) => {
            debug!(error = %err, "amixer not available");
            None
        }
    }
}

fn run(program: &str, args: &[&str]) {
    match Command::new(program).args(args).status() {
        Ok(status) if status.success() => debug!(program, ?args, "command ok"),
        Ok(status) => warn!(program, ?args, %status, "command failed"),
        Err(err) => warn!(program, error = %err, "failed to run command"),
    }
}
