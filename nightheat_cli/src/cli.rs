//! CLI argument definitions and shared statics.

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "nightheat", version, about = "Sleep-cycle bed heating controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/nightheat.toml")]
    pub config: PathBuf,

    /// Print results and logs as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate and actuate every stored profile once
    Run {
        /// Evaluate at this instant instead of now; nothing is written (dry run)
        #[arg(long, value_name = "RFC3339")]
        at: Option<DateTime<Utc>>,
    },
    /// Run repeatedly until interrupted
    Watch {
        /// Seconds between runs (overrides runner.watch_interval_secs)
        #[arg(long, value_name = "SECS")]
        interval_secs: Option<u64>,
        /// Stop after this many runs
        #[arg(long, value_name = "N")]
        max_runs: Option<u64>,
    },
    /// Show the cycle, stage and setpoint for one schedule without touching any device
    Plan {
        /// Bedtime, local HH:MM
        #[arg(long)]
        bed: String,
        /// Wake time, local HH:MM
        #[arg(long)]
        wake: String,
        /// IANA timezone, e.g. Europe/Berlin
        #[arg(long, default_value = "UTC")]
        tz: String,
        /// Reference instant (default: now)
        #[arg(long, value_name = "RFC3339")]
        at: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        initial: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        mid: i32,
        #[arg(long = "final", default_value_t = 0, allow_negative_numbers = true)]
        final_level: i32,
    },
    /// Check the config and that every stored profile parses
    Health,
}
