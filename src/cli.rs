//! Command-line argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use ironsight_sampler::SamplerConfig;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `None` disables logging entirely.
    pub fn as_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ironsight",
    about = "Rate-derived process and connection sampler for Windows",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML). Defaults to ./ironsight.toml when present
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (logs go to stderr)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll twice and print per-process CPU and disk rates
    Sample {
        /// Maximum number of processes to report
        #[arg(short = 'm', long)]
        max_entries: Option<usize>,

        /// Milliseconds between the two polls
        #[arg(short = 'i', long)]
        interval: Option<u64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the processes with the largest working set
    Top {
        /// Number of rows
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// List IPv4 TCP connections and UDP endpoints
    Connections {
        /// TCP table only
        #[arg(long, conflicts_with = "udp")]
        tcp: bool,

        /// UDP table only
        #[arg(long)]
        udp: bool,

        /// Maximum number of rows
        #[arg(short = 'l', long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Live process table (q, Esc or Ctrl-C to quit)
    Watch {
        /// Refresh interval in milliseconds
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl Args {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut SamplerConfig) {
        match &self.command {
            Commands::Sample {
                max_entries,
                interval,
                ..
            } => {
                if let Some(max) = max_entries {
                    config.enumeration_capacity = *max;
                }
                if let Some(ms) = interval {
                    config.refresh_interval_ms = *ms;
                }
            }
            Commands::Top { count: Some(n), .. } => config.top_consumers = *n,
            Commands::Watch { interval: Some(ms) } => config.refresh_interval_ms = *ms,
            _ => {}
        }
    }
}
