use clap::Args;

use crate::error::Result;
use crate::parser::{
    DEFAULT_FLIGHT_PATTERN, DEFAULT_KEY_PATTERN, DEFAULT_NAME_PATTERN, DEFAULT_PHONE_MARKER,
    RecordRules,
};
use crate::report::ReportOptions;

/// Settings shared by the server and the one-shot commands.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Largest accepted request body, in MiB, covering both uploads.
    #[arg(long, global = true, env = "BOOKING_COMPARE_MAX_UPLOAD_MB", default_value_t = 32)]
    pub max_upload_mb: usize,

    /// Width of every report column.
    #[arg(long, global = true, env = "BOOKING_COMPARE_COLUMN_WIDTH", default_value_t = 40.0)]
    pub column_width: f64,

    /// Pattern for the dossier number, matched at the start of a trimmed line.
    #[arg(long, global = true, env = "BOOKING_COMPARE_KEY_PATTERN", default_value = DEFAULT_KEY_PATTERN)]
    pub key_pattern: String,

    /// Pattern marking a passenger name line.
    #[arg(long, global = true, env = "BOOKING_COMPARE_NAME_PATTERN", default_value = DEFAULT_NAME_PATTERN)]
    pub name_pattern: String,

    /// Pattern marking a flight line.
    #[arg(long, global = true, env = "BOOKING_COMPARE_FLIGHT_PATTERN", default_value = DEFAULT_FLIGHT_PATTERN)]
    pub flight_pattern: String,

    /// Case-insensitive text marking the phone line.
    #[arg(long, global = true, env = "BOOKING_COMPARE_PHONE_MARKER", default_value = DEFAULT_PHONE_MARKER)]
    pub phone_marker: String,
}

impl Config {
    pub fn rules(&self) -> Result<RecordRules> {
        RecordRules::new(
            &self.key_pattern,
            &self.name_pattern,
            &self.flight_pattern,
            &self.phone_marker,
        )
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            column_width: self.column_width,
            ..ReportOptions::default()
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_upload_mb: 32,
            column_width: 40.0,
            key_pattern: DEFAULT_KEY_PATTERN.to_string(),
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            flight_pattern: DEFAULT_FLIGHT_PATTERN.to_string(),
            phone_marker: DEFAULT_PHONE_MARKER.to_string(),
        }
    }
}
