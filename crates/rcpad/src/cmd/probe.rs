use std::time::Instant;

use rcpad::battery::{BatteryConfig, BatteryLevel, BatteryMonitor};
use rcpad_frame::{values::to_u16, GET_BATTERY_ADC};
use rcpad_poll::CancellationToken;
use rcpad_serial::SerialPortConfig;
use rcpad_transport::{CommandRouter, Transport, TransportConfig};

use crate::cmd::{parse_duration, ProbeArgs};
use crate::exit::{serial_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_battery, round2, BatteryReport, OutputFormat};

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let stream = rcpad_serial::open(&SerialPortConfig::new(&args.serial))
        .map_err(|err| serial_error("open failed", err))?;

    let shutdown = CancellationToken::new();
    let config = TransportConfig {
        response_timeout: timeout,
        ..TransportConfig::default()
    };
    let transport = Transport::open(stream, CommandRouter::new(), config, &shutdown)
        .map_err(|err| transport_error("transport start failed", err))?;

    let started = Instant::now();
    let reply = transport.send_and_get(GET_BATTERY_ADC, Some(2));
    let round_trip = started.elapsed();
    transport.stop();

    let reply = reply.map_err(|err| transport_error("battery query failed", err))?;
    let adc = to_u16(&reply)
        .ok_or_else(|| CliError::new(DATA_INVALID, "battery reply is not a 16-bit reading"))?;

    let battery = BatteryConfig::default();
    let volt = battery.adc_to_volt(adc);
    let level = BatteryMonitor::new(battery, |_: BatteryLevel| {}).on_sample(volt);

    let report = BatteryReport {
        port: args.serial.display().to_string(),
        adc,
        volt: round2(volt),
        level: level.as_str(),
        round_trip_ms: round2(round_trip.as_secs_f64() * 1000.0),
    };
    print_battery(&report, format);
    Ok(SUCCESS)
}
