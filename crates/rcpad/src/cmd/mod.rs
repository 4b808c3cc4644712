use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod probe;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the service: battery telemetry and joystick hot-keys.
    Run(RunArgs),
    /// Query the battery once and print the reading.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial port of the controller board.
    #[arg(long, env = "RCPAD_SERIAL")]
    pub serial: PathBuf,
    /// Joystick device; a file name of `jsX` watches every `js*` node in that directory.
    #[arg(long, default_value = "/dev/input/jsX")]
    pub joystick: PathBuf,
    /// Directory holding the overlay viewer and icons. Default: next to the executable.
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,
    /// Battery polling interval in milliseconds.
    #[arg(long, value_name = "MS", default_value = "2000")]
    pub battery_rate: u64,
    /// Log joystick actions instead of changing volume or Wi-Fi.
    #[arg(long)]
    pub no_actions: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Serial port of the controller board.
    #[arg(long, env = "RCPAD_SERIAL")]
    pub serial: PathBuf,
    /// Maximum time to wait for the reply (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
