//! Logging setup.
//!
//! Every event goes to the append-only run log (one line per event, with
//! timestamp and level) and, unless quiet, to stderr.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, Layer, Registry};

/// Verbosity chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    /// Level written to the log file
    pub fn file_level(self) -> LevelFilter {
        match self {
            Verbosity::Verbose => LevelFilter::DEBUG,
            _ => LevelFilter::INFO,
        }
    }

    /// Level mirrored to stderr
    pub fn console_level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
        }
    }
}

/// Install the global subscriber. Must only be called once.
pub fn init(log_file: &Path, verbosity: Verbosity) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(verbosity.file_level());

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(verbosity.console_level());

    let subscriber = Registry::default().with(file_layer).with(console_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
