//! CLI argument parsing for Remolino

use crate::config::PipelineConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for result tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// CSV format for spreadsheet analysis (default)
    Csv,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "remolino")]
#[command(version)]
#[command(
    about = "Quality control and turbulence statistics for eddy-covariance records",
    long_about = None
)]
pub struct Cli {
    /// Input CSV (first column: time in seconds; other columns: channels)
    #[arg(value_name = "INPUT", required_unless_present = "print_config")]
    pub input: Option<PathBuf>,

    /// Pipeline configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the result tables
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "remolino-out")]
    pub output: PathBuf,

    /// Averaging period in seconds (overrides the config file)
    #[arg(long = "avg-period", value_name = "SECS")]
    pub avg_period: Option<f64>,

    /// Start of the processed period in seconds
    #[arg(long = "start", value_name = "T", allow_negative_numbers = true)]
    pub start: Option<f64>,

    /// End of the processed period in seconds
    #[arg(long = "stop", value_name = "T", allow_negative_numbers = true)]
    pub stop: Option<f64>,

    /// Number of axis rotations (1 = yaw, 2 = yaw + pitch)
    #[arg(long = "rotations", value_name = "D")]
    pub rotations: Option<u8>,

    /// Output format (csv or json)
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Process channels on parallel worker threads
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long = "print-config")]
    pub print_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of `config`
    pub fn apply_overrides(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(period) = self.avg_period {
            config.avg_period = Some(period);
        }
        if let Some(start) = self.start {
            config.start = Some(start);
        }
        if let Some(stop) = self.stop {
            config.stop = Some(stop);
        }
        if let Some(rotations) = self.rotations {
            config.rotations = rotations;
        }
        if self.parallel {
            config.parallel = true;
        }
        config
    }
}
