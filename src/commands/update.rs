//! Update command implementation.

use anyhow::{Context, Result};
use tracing::debug;

use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::fs_abstraction::RealFileSystem;
use crate::lock::LockGuard;
use crate::sync::{RunOptions, RunOutcome, Synchronizer};
use crate::utils::short_fingerprint;

/// Run the update command
pub async fn run(config: Config, dry_run: bool, force: bool) -> Result<()> {
    let _lock = match &config.lock_file {
        Some(path) => Some(LockGuard::acquire(path)?),
        None => {
            debug!("Locking disabled");
            None
        }
    };

    let fetcher = Fetcher::new(&config.sources).context("Failed to set up range fetcher")?;
    let synchronizer = Synchronizer::new(
        config,
        Box::new(fetcher),
        Box::new(RealFileSystem),
        Box::new(RealCommandExecutor),
    )
    .context("Failed to load templates")?;

    let outcome = synchronizer.run(RunOptions { dry_run, force }).await?;

    println!();
    println!("{}", summary(&outcome));

    Ok(())
}

/// One-line result for the terminal
fn summary(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Unchanged { fingerprint } => format!(
            "[OK] Up to date ({})",
            short_fingerprint(fingerprint.as_str())
        ),
        RunOutcome::WouldUpdate {
            fingerprint,
            ranges,
            ..
        } => format!(
            "[DRY-RUN] Would deploy {} ranges ({})",
            ranges,
            short_fingerprint(fingerprint.as_str())
        ),
        RunOutcome::Updated {
            fingerprint,
            ranges,
            reloads,
            ..
        } => {
            let failed = outcome.failed_reloads();
            if failed == 0 {
                format!(
                    "[OK] {} ranges deployed ({})",
                    ranges,
                    short_fingerprint(fingerprint.as_str())
                )
            } else {
                let names: Vec<&str> = reloads
                    .iter()
                    .filter(|r| !r.is_success())
                    .map(|r| r.service.as_str())
                    .collect();
                format!(
                    "[WARN] {} ranges deployed ({}), reload failed: {}",
                    ranges,
                    short_fingerprint(fingerprint.as_str()),
                    names.join(", ")
                )
            }
        }
    }
}
