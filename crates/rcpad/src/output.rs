use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Result of a single battery query.
#[derive(Debug, Serialize)]
pub struct BatteryReport {
    pub port: String,
    pub adc: u16,
    pub volt: f64,
    pub level: &'static str,
    pub round_trip_ms: f64,
}

pub fn print_battery(report: &BatteryReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "ADC", "VOLT", "LEVEL", "RTT (ms)"])
                .add_row(vec![
                    report.port.clone(),
                    report.adc.to_string(),
                    format!("{:.2}", report.volt),
                    report.level.to_string(),
                    format!("{:.2}", report.round_trip_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "port={} adc={} volt={:.2} level={} rtt={:.2}ms",
                report.port, report.adc, report.volt, report.level, report.round_trip_ms
            );
        }
    }
}

/// Round to two decimals for display and JSON.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_flat() {
        let report = BatteryReport {
            port: "/dev/ttyS0".to_string(),
            adc: 512,
            volt: round2(7.40196),
            level: "50",
            round_trip_ms: 4.25,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["adc"], 512);
        assert_eq!(json["volt"], 7.4);
        assert_eq!(json["level"], "50");
    }
}
