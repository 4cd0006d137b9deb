use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(about)]
pub struct Cli {
    /// Enable verbose output. (Specify twice for more verbosity.)
    ///
    /// Overrides the `log_level` setting from the configuration.
    #[arg(global = true, short = 'v', long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Path to the configuration file.
    ///
    /// Files ending in `.json` are read as JSON, and anything else as YAML. Settings can also be provided, or
    /// overridden, through environment variables prefixed with `CARBONITE_`, using `__` to separate nested keys
    /// (`CARBONITE_GRAPHITE__SEPARATOR=_`).
    #[arg(global = true, short = 'c', long = "config")]
    pub config_path: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub action: Action,
}

impl Cli {
    /// Gets the log level requested on the command line, if any.
    pub fn log_level(&self) -> Option<LevelFilter> {
        match self.verbose {
            0 => None,
            1 => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        }
    }
}

#[derive(Subcommand)]
pub enum Action {
    /// Validate the configured Graphite templates and tags.
    #[command(name = "validate")]
    Validate,

    /// Print the effective Graphite configuration.
    #[command(name = "config")]
    Config,

    /// Decode Graphite lines into measurements and tags.
    #[command(name = "decode")]
    Decode(DecodeConfig),
}

/// Decode configuration.
#[derive(Args, Clone)]
pub struct DecodeConfig {
    /// File to read Graphite lines from.
    ///
    /// Lines are read from standard input if not set.
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,
}
