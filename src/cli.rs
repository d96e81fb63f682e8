//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "cfsync")]
#[command(author, version, about = "Keeps nginx and nftables in sync with Cloudflare IP ranges")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Defaults to `update` so the bare binary can run from cron
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path (built-in defaults are used if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (for cron/systemd timer); only errors on stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Fetch the ranges and regenerate + reload if they changed
    Update {
        /// Fetch, compare and render, but do not write or reload anything
        #[arg(long)]
        dry_run: bool,

        /// Regenerate and reload even if the ranges did not change
        #[arg(long)]
        force: bool,
    },

    /// Show the deployed fingerprint and generated files
    Status,

    /// Print a commented default configuration file
    DefaultConfig,

    /// Show version
    Version,
}

impl Cli {
    /// The subcommand to run, `update` when none was given
    pub fn subcommand(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Update {
            dry_run: false,
            force: false,
        })
    }
}
