//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

/// Stereo Sync - stereo camera + IMU synchronization pipeline
#[derive(Parser, Debug)]
#[command(
    name = "stereo-sync",
    author,
    version,
    about = "Stereo camera + IMU synchronization pipeline",
    long_about = "Pairs left/right camera frames within a time tolerance, gathers the IMU \n\
                  samples up to each pair and hands the observation to a tracking engine.\n\n\
                  `run` drives the pipeline from a mock stereo-inertial rig."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STEREO_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (json, pretty, compact)
    #[arg(
        long,
        default_value = "pretty",
        global = true,
        env = "STEREO_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default filter directive derived from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synchronization pipeline against the mock rig
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "STEREO_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override stereo tolerance in seconds
    #[arg(long, env = "STEREO_SYNC_MAX_TIME_DIFF")]
    pub max_time_diff: Option<f64>,

    /// Override mock camera rate (Hz)
    #[arg(long, env = "STEREO_SYNC_CAMERA_HZ")]
    pub camera_hz: Option<f64>,

    /// Override mock IMU rate (Hz)
    #[arg(long, env = "STEREO_SYNC_IMU_HZ")]
    pub imu_hz: Option<f64>,

    /// Stop after this many tracked frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "STEREO_SYNC_MAX_FRAMES")]
    pub max_frames: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STEREO_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Capacity of the result channel feeding the statistics task
    #[arg(long, default_value = "256", env = "STEREO_SYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Log every n-th tracked frame
    #[arg(long, default_value = "20", env = "STEREO_SYNC_LOG_EVERY")]
    pub log_every: u64,

    /// Prometheus exporter port (0 = disabled)
    #[arg(long, default_value = "0", env = "STEREO_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "stereo_sync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults if omitted
    #[arg(short, long, env = "STEREO_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
