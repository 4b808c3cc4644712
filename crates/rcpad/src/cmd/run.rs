use std::path::PathBuf;
use std::sync::Arc;

use rcpad::actions::{Action, JoystickActions, SystemActions};
use rcpad::battery::{BatteryConfig, BatteryMonitor};
use rcpad::overlay::{Overlay, OverlayConfig};
use rcpad::probe::{BatteryProbe, ProbeConfig};
use rcpad_frame::{GET_BATTERY_ADC, NOP};
use rcpad_input::{DeviceMultiplexer, DevicePattern, JoystickBackend, MultiplexerConfig};
use rcpad_poll::{CancellationToken, Scheduler};
use rcpad_serial::SerialPortConfig;
use rcpad_transport::{CommandRouter, Transport, TransportConfig};
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{io_error, serial_error, transport_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: RunArgs) -> CliResult<i32> {
    if args.battery_rate == 0 {
        return Err(CliError::new(USAGE, "--battery-rate must be greater than zero"));
    }

    let shutdown = CancellationToken::new();
    install_signal_handler(shutdown.clone())?;

    let assets = args.assets.clone().unwrap_or_else(default_asset_dir);
    let mut overlay = Overlay::spawn(OverlayConfig::new(&assets))
        .map_err(|err| io_error("overlay start failed", err))?;

    let monitor = BatteryMonitor::new(BatteryConfig::default(), overlay.handle());
    let router = CommandRouter::new()
        .with_handler(NOP, |_: &[u8]| {})
        .with_handler(GET_BATTERY_ADC, monitor.into_handler());

    let stream = rcpad_serial::open(&SerialPortConfig::new(&args.serial))
        .map_err(|err| serial_error("open failed", err))?;
    let transport = Transport::open(stream, router, TransportConfig::default(), &shutdown)
        .map_err(|err| transport_error("transport start failed", err))?;

    let mut scheduler = Scheduler::new(shutdown.clone());
    scheduler.register(BatteryProbe::new(
        Arc::new(transport),
        ProbeConfig {
            rate_ms: args.battery_rate,
        },
    ));

    let backend = JoystickBackend::new(DevicePattern::from_path(&args.joystick));
    if args.no_actions {
        let sink = JoystickActions::new(|action: Action| info!(?action, "action skipped"));
        scheduler.register(DeviceMultiplexer::new(backend, sink, MultiplexerConfig::default()));
    } else {
        let sink = JoystickActions::new(SystemActions::detect(Some(overlay.handle())));
        scheduler.register(DeviceMultiplexer::new(backend, sink, MultiplexerConfig::default()));
    }

    info!(
        serial = %args.serial.display(),
        joystick = %args.joystick.display(),
        assets = %assets.display(),
        "rcpad running"
    );
    let ticks = scheduler.run();
    overlay.stop();
    info!(ticks, "rcpad stopped");

    Ok(SUCCESS)
}

fn default_asset_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// SIGINT and SIGTERM both cancel `shutdown`.
fn install_signal_handler(shutdown: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.cancel();
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
