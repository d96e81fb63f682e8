//! One synchronization run: fetch, compare, render, write, reload.

use tracing::{debug, info, warn};

use crate::cmd_abstraction::CommandExecutor;
use crate::config::Config;
use crate::error::SyncError;
use crate::fetcher::RangeSource;
use crate::fingerprint::{fingerprint, has_changed, Fingerprint, FingerprintStore};
use crate::fs_abstraction::FileSystem;
use crate::reloader::{ReloadOutcome, Reloader};
use crate::render::Templates;
use crate::writer::{ensure_outputs, write_documents};

/// Per-run switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Fetch, compare and render, but write and reload nothing
    pub dry_run: bool,
    /// Regenerate even if the fingerprint is unchanged
    pub force: bool,
}

/// What a run did
#[derive(Debug)]
pub enum RunOutcome {
    /// The ranges match the deployed configuration
    Unchanged { fingerprint: Fingerprint },
    /// Dry run: the configuration would have been regenerated
    WouldUpdate {
        fingerprint: Fingerprint,
        previous: Option<Fingerprint>,
        ranges: usize,
    },
    /// Files rewritten and reloads attempted
    Updated {
        fingerprint: Fingerprint,
        previous: Option<Fingerprint>,
        ranges: usize,
        reloads: Vec<ReloadOutcome>,
    },
}

impl RunOutcome {
    /// Number of reloads that failed (always 0 unless `Updated`)
    pub fn failed_reloads(&self) -> usize {
        match self {
            RunOutcome::Updated { reloads, .. } => {
                reloads.iter().filter(|r| !r.is_success()).count()
            }
            _ => 0,
        }
    }
}

/// Wires the pipeline components together for a deployment
pub struct Synchronizer {
    config: Config,
    source: Box<dyn RangeSource>,
    fs: Box<dyn FileSystem>,
    executor: Box<dyn CommandExecutor>,
    templates: Templates,
    store: FingerprintStore,
}

impl Synchronizer {
    /// Build the pipeline. Fails if either template cannot be read.
    pub fn new(
        config: Config,
        source: Box<dyn RangeSource>,
        fs: Box<dyn FileSystem>,
        executor: Box<dyn CommandExecutor>,
    ) -> Result<Self, SyncError> {
        let templates = Templates::load(fs.as_ref(), &config.templates)?;
        let store = FingerprintStore::new(config.state_file.clone());

        Ok(Self {
            config,
            source,
            fs,
            executor,
            templates,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline once.
    ///
    /// Any error returned is fatal for the run. Reload failures are not errors;
    /// they are reported in [`RunOutcome::Updated`].
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome, SyncError> {
        let fs = self.fs.as_ref();

        if !options.dry_run {
            ensure_outputs(fs, &self.config.outputs)?;
        }

        let ranges = self.source.fetch().await?;
        let new_fingerprint = fingerprint(&ranges.ipv4, &ranges.ipv6);
        let previous = self.store.load(fs)?;

        debug!(
            new = %new_fingerprint,
            previous = previous.as_ref().map(Fingerprint::as_str).unwrap_or("<none>"),
            "Compared fingerprints"
        );

        if !has_changed(&new_fingerprint, previous.as_ref()) {
            if options.force {
                info!("No changes in IP ranges, regenerating anyway (--force)");
            } else {
                info!("No changes in IP ranges! Exiting...");
                return Ok(RunOutcome::Unchanged {
                    fingerprint: new_fingerprint,
                });
            }
        } else if previous.is_none() {
            info!("No previous fingerprint, generating configuration");
        } else {
            info!("IP ranges changed, regenerating configuration");
        }

        // Render both before touching anything, so a bad template leaves the
        // deployed files and fingerprint alone
        let docs = self.templates.render_all(&ranges)?;

        if options.dry_run {
            info!(
                ipv4 = ranges.ipv4.len(),
                ipv6 = ranges.ipv6.len(),
                "Dry run: configuration would be updated"
            );
            return Ok(RunOutcome::WouldUpdate {
                fingerprint: new_fingerprint,
                previous,
                ranges: ranges.len(),
            });
        }

        write_documents(fs, &self.config.outputs, &docs)?;
        self.store.commit(fs, &new_fingerprint)?;

        let reloader = Reloader::new(self.executor.as_ref());
        let reloads = reloader.reload_all(&self.config.reload_commands());

        let failed = reloads.iter().filter(|r| !r.is_success()).count();
        if failed == 0 {
            info!("Config files updated and services reloaded successfully.");
        } else {
            warn!(
                "Config files updated, but {} of {} service reloads failed",
                failed,
                reloads.len()
            );
        }

        Ok(RunOutcome::Updated {
            fingerprint: new_fingerprint,
            previous,
            ranges: ranges.len(),
            reloads,
        })
    }
}
