//! Shared command-line options of the demo binaries.

use anyhow::Result;
use clap::{Args, ValueEnum};
use observability::{LogFormat, ObservabilityConfig};

/// Logging and metrics options
#[derive(Args, Debug, Clone)]
pub struct ObservabilityArgs {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "EMISSOR_VERBOSE")]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", env = "EMISSOR_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "EMISSOR_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
        }
    }
}

impl ObservabilityArgs {
    /// Load `.env` if present and initialize tracing and metrics
    pub fn init(&self) -> Result<()> {
        dotenvy::dotenv().ok();

        let default_log_level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        observability::init_with_config(ObservabilityConfig {
            log_format: self.log_format.into(),
            metrics_port: self.metrics_port,
            default_log_level: default_log_level.to_string(),
        })
    }
}
