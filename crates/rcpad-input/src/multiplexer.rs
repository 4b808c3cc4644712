use std::io::{self, Read};
use std::path::{Path, PathBuf};

use rcpad_poll::PollSource;
use tracing::{debug, info, trace, warn};

use crate::backend::DeviceBackend;
use crate::config::MultiplexerConfig;
use crate::error::DeviceError;
use crate::event::{JsEvent, EVENT_SIZE};

/// Receives events read by a [`DeviceMultiplexer`].
pub trait EventSink {
    /// Handle one event. Returns `true` if the event was acted on, which
    /// restarts the device's debounce interval.
    fn process_event(&mut self, path: &Path, event: &JsEvent) -> bool;
}

impl<F> EventSink for F
where
    F: FnMut(&Path, &JsEvent) -> bool,
{
    fn process_event(&mut self, path: &Path, event: &JsEvent) -> bool {
        self(path, event)
    }
}

/// An open device node.
#[derive(Debug)]
pub struct DeviceHandle<D> {
    pub path: PathBuf,
    pub last_event_at: u64,
    device: D,
}

/// Whether any device handle is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplexerState {
    NoDevices,
    Opened,
}

enum ReadOutcome {
    Event(JsEvent),
    Empty,
    Gone(io::Error),
}

/// Polls a hot-pluggable set of input devices.
///
/// With nothing open, every tick enumerates and opens whatever matches. Each
/// open device is read once per tick without blocking. A hard read error on
/// any device closes all of them; so does a change in the enumerated set,
/// checked every `rate_rescan_ms`. Either way the next tick re-opens.
pub struct DeviceMultiplexer<B: DeviceBackend, S> {
    backend: B,
    sink: S,
    config: MultiplexerConfig,
    handles: Vec<DeviceHandle<B::Device>>,
    known: Vec<PathBuf>,
    last_scan_at: u64,
}

impl<B: DeviceBackend, S: EventSink> DeviceMultiplexer<B, S> {
    pub fn new(backend: B, sink: S, config: MultiplexerConfig) -> Self {
        Self {
            backend,
            sink,
            config,
            handles: Vec::new(),
            known: Vec::new(),
            last_scan_at: 0,
        }
    }

    pub fn state(&self) -> MultiplexerState {
        if self.handles.is_empty() {
            MultiplexerState::NoDevices
        } else {
            MultiplexerState::Opened
        }
    }

    pub fn handles(&self) -> &[DeviceHandle<B::Device>] {
        &self.handles
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn config(&self) -> &MultiplexerConfig {
        &self.config
    }

    /// Close every open handle.
    pub fn close_all(&mut self) {
        if !self.handles.is_empty() {
            info!(count = self.handles.len(), "closing input devices");
        }
        self.handles.clear();
    }

    fn enumerate(&self) -> Vec<PathBuf> {
        match self.backend.enumerate() {
            Ok(paths) => paths,
            Err(err) => {
                debug!(error = %err, "device enumeration failed");
                Vec::new()
            }
        }
    }

    fn open_devices(&mut self, now_ms: u64) {
        let paths = self.enumerate();
        for path in &paths {
            match self.backend.open(path) {
                Ok(device) => {
                    info!(path = %path.display(), "input device opened");
                    self.handles.push(DeviceHandle {
                        path: path.clone(),
                        last_event_at: now_ms,
                        device,
                    });
                }
                Err(source) => {
                    let err = DeviceError::Open {
                        path: path.clone(),
                        source,
                    };
                    trace!(error = %err, "skipping input device");
                }
            }
        }
        self.known = paths;
    }

    /// Read one record from every handle. Returns whether anything was read.
    fn read_events(&mut self, now_ms: u64) -> bool {
        let mut any = false;
        let mut lost = None;
        for handle in &mut self.handles {
            match read_event(&mut handle.device) {
                ReadOutcome::Event(event) => {
                    any = true;
                    if now_ms.saturating_sub(handle.last_event_at) < self.config.rate_event_ms {
                        trace!(path = %handle.path.display(), "event debounced");
                        continue;
                    }
                    if self.sink.process_event(&handle.path, &event) {
                        handle.last_event_at = now_ms;
                    }
                }
                ReadOutcome::Empty => {}
                ReadOutcome::Gone(source) => {
                    lost = Some(DeviceError::Read {
                        path: handle.path.clone(),
                        source,
                    });
                    break;
                }
            }
        }
        if let Some(err) = lost {
            warn!(error = %err, "input device lost");
            self.close_all();
        }
        any
    }

    fn rescan_due(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.last_scan_at) < self.config.rate_rescan_ms {
            return;
        }
        self.last_scan_at = now_ms;
        let current = self.enumerate();
        if current != self.known {
            info!(
                before = self.known.len(),
                after = current.len(),
                "input device set changed"
            );
            self.close_all();
            self.known = current;
        }
    }
}

impl<B: DeviceBackend, S: EventSink> PollSource for DeviceMultiplexer<B, S> {
    fn name(&self) -> &str {
        "input"
    }

    fn process(&mut self, now_ms: u64) -> u64 {
        let mut delay = self.config.rate_event_ms;
        if self.handles.is_empty() {
            self.open_devices(now_ms);
        } else if self.read_events(now_ms) {
            delay = 0;
        }
        self.rescan_due(now_ms);
        delay
    }

    fn stop(&mut self) {
        self.close_all();
    }
}

fn read_event<D: Read>(device: &mut D) -> ReadOutcome {
    let mut raw = [0u8; EVENT_SIZE];
    loop {
        return match device.read(&mut raw) {
            Ok(EVENT_SIZE) => ReadOutcome::Event(JsEvent::parse(&raw)),
            Ok(0) => ReadOutcome::Gone(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => ReadOutcome::Gone(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("short event record ({n} of {EVENT_SIZE} bytes)"),
            )),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => ReadOutcome::Empty,
            Err(err) => ReadOutcome::Gone(err),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{JS_EVENT_BUTTON, JS_EVENT_INIT};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    enum Step {
        Event(JsEvent),
        Fail,
    }

    #[derive(Default)]
    struct World {
        present: Vec<PathBuf>,
        scripts: HashMap<PathBuf, VecDeque<Step>>,
        unopenable: Vec<PathBuf>,
        open: usize,
    }

    #[derive(Clone, Default)]
    struct FakeBackend {
        world: Arc<Mutex<World>>,
    }

    impl FakeBackend {
        fn with_devices(names: &[&str]) -> Self {
            let backend = Self::default();
            for name in names {
                backend.attach(name);
            }
            backend
        }

        fn attach(&self, name: &str) {
            let mut world = self.world.lock().unwrap();
            world.present.push(PathBuf::from(name));
            world.present.sort();
        }

        fn detach(&self, name: &str) {
            self.world
                .lock()
                .unwrap()
                .present
                .retain(|p| p != Path::new(name));
        }

        fn push(&self, name: &str, step: Step) {
            self.world
                .lock()
                .unwrap()
                .scripts
                .entry(PathBuf::from(name))
                .or_default()
                .push_back(step);
        }

        fn open_count(&self) -> usize {
            self.world.lock().unwrap().open
        }
    }

    struct FakeDevice {
        path: PathBuf,
        world: Arc<Mutex<World>>,
    }

    impl Read for FakeDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut world = self.world.lock().unwrap();
            let step = world.scripts.get_mut(&self.path).and_then(VecDeque::pop_front);
            match step {
                Some(Step::Event(event)) => {
                    buf[..EVENT_SIZE].copy_from_slice(&event.to_bytes());
                    Ok(EVENT_SIZE)
                }
                Some(Step::Fail) => Err(io::Error::other("no such device")),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            self.world.lock().unwrap().open -= 1;
        }
    }

    impl DeviceBackend for FakeBackend {
        type Device = FakeDevice;

        fn enumerate(&self) -> crate::Result<Vec<PathBuf>> {
            Ok(self.world.lock().unwrap().present.clone())
        }

        fn open(&self, path: &Path) -> io::Result<FakeDevice> {
            let mut world = self.world.lock().unwrap();
            if world.unopenable.iter().any(|p| p == path) || !world.present.iter().any(|p| p == path) {
                return Err(io::ErrorKind::NotFound.into());
            }
            world.open += 1;
            Ok(FakeDevice {
                path: path.to_path_buf(),
                world: self.world.clone(),
            })
        }
    }

    type Seen = Arc<Mutex<Vec<(PathBuf, JsEvent)>>>;

    fn recording_sink(seen: &Seen) -> impl FnMut(&Path, &JsEvent) -> bool {
        let seen = seen.clone();
        move |path: &Path, event: &JsEvent| {
            if event.is_init() {
                return false;
            }
            seen.lock().unwrap().push((path.to_path_buf(), *event));
            true
        }
    }

    fn multiplexer(
        backend: &FakeBackend,
        seen: &Seen,
    ) -> DeviceMultiplexer<FakeBackend, impl FnMut(&Path, &JsEvent) -> bool> {
        DeviceMultiplexer::new(backend.clone(), recording_sink(seen), MultiplexerConfig::default())
    }

    #[test]
    fn appearing_device_gets_opened() {
        let backend = FakeBackend::default();
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        assert_eq!(mux.process(0), 50);
        assert_eq!(mux.state(), MultiplexerState::NoDevices);

        backend.attach("js0");
        assert_eq!(mux.process(50), 50);
        assert_eq!(mux.state(), MultiplexerState::Opened);
        assert_eq!(mux.handles()[0].path, PathBuf::from("js0"));
        assert_eq!(mux.handles()[0].last_event_at, 50);
    }

    #[test]
    fn unopenable_devices_are_skipped() {
        let backend = FakeBackend::with_devices(&["js0", "js1"]);
        backend
            .world
            .lock()
            .unwrap()
            .unopenable
            .push(PathBuf::from("js0"));
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        assert_eq!(mux.handles().len(), 1);
        assert_eq!(mux.handles()[0].path, PathBuf::from("js1"));
    }

    #[test]
    fn would_block_never_closes() {
        let backend = FakeBackend::with_devices(&["js0"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        for tick in 1..100 {
            assert_eq!(mux.process(tick * 50), 50);
        }
        assert_eq!(mux.state(), MultiplexerState::Opened);
        assert_eq!(backend.open_count(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn read_error_closes_every_handle() {
        let backend = FakeBackend::with_devices(&["js0", "js1"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        assert_eq!(backend.open_count(), 2);

        backend.push("js0", Step::Fail);
        mux.process(50);
        assert_eq!(mux.state(), MultiplexerState::NoDevices);
        assert_eq!(backend.open_count(), 0);

        // Still enumerated, so the next tick re-opens.
        mux.process(100);
        assert_eq!(backend.open_count(), 2);
    }

    #[test]
    fn events_reach_sink_and_request_immediate_repoll() {
        let backend = FakeBackend::with_devices(&["js0"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        backend.push("js0", Step::Event(JsEvent::button_press(17)));
        assert_eq!(mux.process(100), 0);
        assert_eq!(mux.process(150), 50);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, PathBuf::from("js0"));
        assert_eq!(seen[0].1.number, 17);
        assert_eq!(mux.handles()[0].last_event_at, 100);
    }

    #[test]
    fn events_inside_debounce_interval_are_drained() {
        let backend = FakeBackend::with_devices(&["js0"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        for _ in 0..3 {
            backend.push("js0", Step::Event(JsEvent::button_press(16)));
        }

        assert_eq!(mux.process(60), 0);
        assert_eq!(mux.process(80), 0);
        assert_eq!(mux.process(110), 0);

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(mux.handles()[0].last_event_at, 110);
        assert!(backend.world.lock().unwrap().scripts[Path::new("js0")].is_empty());
    }

    #[test]
    fn rejected_events_do_not_restart_debounce() {
        let backend = FakeBackend::with_devices(&["js0"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        let init = JsEvent {
            kind: JS_EVENT_BUTTON | JS_EVENT_INIT,
            ..JsEvent::button_press(20)
        };
        backend.push("js0", Step::Event(init));
        backend.push("js0", Step::Event(JsEvent::button_press(20)));

        mux.process(60);
        assert_eq!(mux.handles()[0].last_event_at, 0);
        mux.process(70);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(mux.handles()[0].last_event_at, 70);
    }

    #[test]
    fn rescan_change_forces_reopen() {
        let backend = FakeBackend::with_devices(&["js0"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        backend.attach("js1");

        // Not due yet.
        mux.process(1000);
        assert_eq!(mux.handles().len(), 1);

        mux.process(2000);
        assert_eq!(mux.state(), MultiplexerState::NoDevices);
        assert_eq!(backend.open_count(), 0);

        mux.process(2050);
        assert_eq!(mux.handles().len(), 2);
        assert_eq!(backend.open_count(), 2);
    }

    #[test]
    fn unchanged_rescan_keeps_handles() {
        let backend = FakeBackend::with_devices(&["js0"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        mux.process(2000);
        mux.process(4000);
        assert_eq!(mux.state(), MultiplexerState::Opened);
        assert_eq!(backend.open_count(), 1);
    }

    #[test]
    fn detached_device_is_dropped_on_rescan() {
        let backend = FakeBackend::with_devices(&["js0", "js1"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        backend.detach("js0");
        mux.process(2000);
        mux.process(2050);
        assert_eq!(mux.handles().len(), 1);
        assert_eq!(mux.handles()[0].path, PathBuf::from("js1"));
    }

    #[test]
    fn stop_closes_everything() {
        let backend = FakeBackend::with_devices(&["js0", "js1"]);
        let seen = Seen::default();
        let mut mux = multiplexer(&backend, &seen);

        mux.process(0);
        PollSource::stop(&mut mux);
        assert_eq!(mux.state(), MultiplexerState::NoDevices);
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn eof_counts_as_lost_device() {
        let mut empty: &[u8] = &[];
        assert!(matches!(read_event(&mut empty), ReadOutcome::Gone(_)));

        let press = JsEvent::button_press(19).to_bytes();
        let mut one: &[u8] = &press;
        assert!(matches!(read_event(&mut one), ReadOutcome::Event(e) if e.number == 19));
    }
}
