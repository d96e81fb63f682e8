//! # cfsync - Cloudflare IP range synchronizer
//!
//! Keeps a reverse proxy (nginx) and a host firewall (nftables) in step with
//! the address ranges Cloudflare publishes. Meant to run periodically from
//! cron or a systemd timer: when the published ranges change, both
//! configuration files are regenerated from templates and both services are
//! reloaded. When nothing changed, nothing is touched.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        cfsync                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: update, status, default-config, version    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Sources, templates, outputs, state, reload commands  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Synchronizer                                               │
//! │    ├── Fetcher (reqwest + rustls, ipnet validation)         │
//! │    ├── Fingerprint (sha2) + FingerprintStore                │
//! │    ├── Templates (minijinja)                                │
//! │    ├── Writer (atomic replace via tempfile)                 │
//! │    └── Reloader (CommandExecutor trait)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use cfsync::cmd_abstraction::RealCommandExecutor;
//! use cfsync::config::Config;
//! use cfsync::fetcher::Fetcher;
//! use cfsync::fs_abstraction::RealFileSystem;
//! use cfsync::sync::{RunOptions, Synchronizer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("/etc/cfsync/config.yaml")?;
//!     let fetcher = Fetcher::new(&config.sources)?;
//!
//!     let synchronizer = Synchronizer::new(
//!         config,
//!         Box::new(fetcher),
//!         Box::new(RealFileSystem),
//!         Box::new(RealCommandExecutor),
//!     )?;
//!     let outcome = synchronizer.run(RunOptions::default()).await?;
//!     println!("{} reloads failed", outcome.failed_reloads());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`cmd_abstraction`] - External command execution (mockable)
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Pipeline error type
//! - [`fetcher`] - HTTP client for downloading range lists
//! - [`fingerprint`] - Change detection
//! - [`fs_abstraction`] - Filesystem access (mockable)
//! - [`lock`] - File locking for concurrent execution prevention
//! - [`logging`] - Log file and console setup
//! - [`reloader`] - Service reloads
//! - [`render`] - Template rendering
//! - [`sync`] - The synchronization pipeline
//! - [`utils`] - Formatting helpers
//! - [`writer`] - Output file handling

pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod fingerprint;
pub mod fs_abstraction;
pub mod lock;
pub mod logging;
pub mod reloader;
pub mod render;
pub mod sync;
pub mod utils;
pub mod writer;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::SyncError;
pub use sync::{RunOptions, RunOutcome, Synchronizer};
