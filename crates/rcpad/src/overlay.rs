//! On-screen icons via an external image viewer.
//!
//! The viewer (`pngview`) draws one PNG on a display layer until it is
//! killed or its timeout runs out. A worker thread owns the spawned viewer
//! processes: one persistent battery icon and one transient icon for volume
//! or Wi-Fi changes. Showing a new icon in a slot terminates the previous
//! viewer in that slot first.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::battery::{BatteryDisplay, BatteryLevel};

/// Viewer invocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Viewer executable.
    pub viewer: PathBuf,
    /// Directory holding the icon PNGs.
    pub asset_dir: PathBuf,
    /// Display layer passed as `-l`.
    pub layer: i32,
    /// Battery icon position.
    pub battery_x: i32,
    pub battery_y: i32,
    /// Lifetime of transient icons, milliseconds.
    pub transient_ms: u64,
}

impl OverlayConfig {
    /// Viewer and icons both taken from `asset_dir`.
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        let asset_dir = asset_dir.into();
        Self {
            viewer: asset_dir.join("pngview"),
            asset_dir,
            layer: 30_000,
            battery_x: 768,
            battery_y: 2,
            transient_ms: 1000,
        }
    }

    /// Icon file for a request.
    pub fn icon(&self, request: &OverlayRequest) -> PathBuf {
        let name = match request {
            OverlayRequest::Battery(level) => format!("battery_{level}.png"),
            OverlayRequest::Volume(percent) => format!("volume{}.png", percent / 6),
            OverlayRequest::Wifi(true) => "wifi-on.png".to_string(),
            OverlayRequest::Wifi(false) => "wifi-off.png".to_string(),
        };
        self.asset_dir.join(name)
    }

    /// Viewer arguments for a request.
    pub fn args(&self, request: &OverlayRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-b0x0000".into(),
            format!("-l{}", self.layer).into(),
            "-n".into(),
        ];
        match request {
            OverlayRequest::Battery(_) => {
                args.push(format!("-x{}", self.battery_x).into());
                args.push(format!("-y{}", self.battery_y).into());
            }
            OverlayRequest::Volume(_) | OverlayRequest::Wifi(_) => {
                args.push(format!("-t{}", self.transient_ms).into());
            }
        }
        args.push(self.icon(request).into_os_string());
        args
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Something to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayRequest {
    Battery(BatteryLevel),
    /// Mixer volume in percent.
    Volume(u8),
    /// Whether the wireless interface is up.
    Wifi(bool),
}

impl OverlayRequest {
    fn slot(&self) -> Slot {
        match self {
            OverlayRequest::Battery(_) => Slot::Battery,
            OverlayRequest::Volume(_) | OverlayRequest::Wifi(_) => Slot::Transient,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Battery,
    Transient,
}

enum Message {
    Show(OverlayRequest),
    Quit,
}

/// Cloneable sender side of an [`Overlay`].
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    sender: Sender<Message>,
}

impl OverlayHandle {
    /// Queue a request. Dropped with a debug log if the worker is gone.
    pub fn show(&self, request: OverlayRequest) {
        if self.sender.send(Message::Show(request)).is_err() {
            debug!(?request, "overlay worker stopped; request dropped");
        }
    }
}

impl BatteryDisplay for OverlayHandle {
    fn show_battery(&mut self, level: BatteryLevel) {
        self.show(OverlayRequest::Battery(level));
    }
}

/// Overlay worker thread.
pub struct Overlay {
    handle: OverlayHandle,
    worker: Option<JoinHandle<()>>,
}

impl Overlay {
    pub fn spawn(config: OverlayConfig) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("rcpad-overlay".to_string())
            .spawn(move || run_worker(&config, receiver))?;
        Ok(Self {
            handle: OverlayHandle { sender },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> OverlayHandle {
        self.handle.clone()
    }

    pub fn show(&self, request: OverlayRequest) {
        self.handle.show(request);
    }

    /// Process queued requests, terminate any running viewer and join the
    /// worker. Idempotent.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.handle.sender.send(Message::Quit);
        if worker.join().is_err() {
            warn!("overlay worker panicked");
        }
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(config: &OverlayConfig, receiver: Receiver<Message>) {
    let mut battery: Option<Child> = None;
    let mut transient: Option<Child> = None;

    for message in receiver {
        let request = match message {
            Message::Show(request) => request,
            Message::Quit => break,
        };
        let slot = match request.slot() {
            Slot::Battery => &mut battery,
            Slot::Transient => &mut transient,
        };
        if let Some(previous) = slot.take() {
            terminate(previous);
        }
        *slot = launch(config, &request);
    }

    for child in [battery.take(), transient.take()].into_iter().flatten() {
        terminate(child);
    }
    debug!("overlay worker finished");
}

fn launch(config: &OverlayConfig, request: &OverlayRequest) -> Option<Child> {
    let spawned = Command::new(&config.viewer)
        .args(config.args(request))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(child) => {
            info!(?request, pid = child.id(), "overlay shown");
            Some(child)
        }
        Err(err) => {
            warn!(viewer = %config.viewer.display(), error = %err, "failed to launch overlay viewer");
            None
        }
    }
}

#[cfg(unix)]
fn terminate(mut child: Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: `pid` belongs to a child we spawned and have not yet reaped,
        // so it cannot have been recycled for an unrelated process.
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}
