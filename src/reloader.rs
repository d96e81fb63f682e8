//! Service reloads after a configuration change.
//!
//! A failed reload is logged and reported, never propagated: the new
//! configuration is already on disk, and the other service still deserves
//! its reload.

use tracing::{error, info};

use crate::cmd_abstraction::CommandExecutor;
use crate::config::ServiceCommand;
use crate::error::SyncError;

/// Result of reloading one service
#[derive(Debug)]
pub struct ReloadOutcome {
    pub service: String,
    pub result: Result<(), SyncError>,
}

impl ReloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct Reloader<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> Reloader<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Run the reload command of one service and log the outcome
    pub fn reload(&self, service: &ServiceCommand) -> ReloadOutcome {
        let result = match self.run(service) {
            Ok(()) => {
                info!(service = %service.name, "{} reloaded successfully", service.name);
                Ok(())
            }
            Err(message) => {
                error!(service = %service.name, "Failed to reload {}: {}", service.name, message);
                Err(SyncError::Reload(message))
            }
        };

        ReloadOutcome {
            service: service.name.clone(),
            result,
        }
    }

    /// Reload every service in order, regardless of earlier failures
    pub fn reload_all(&self, services: &[ServiceCommand]) -> Vec<ReloadOutcome> {
        services.iter().map(|service| self.reload(service)).collect()
    }

    /// Returns the captured error output on failure
    fn run(&self, service: &ServiceCommand) -> Result<(), String> {
        let program = service
            .program()
            .ok_or_else(|| "empty reload command".to_string())?;

        let output = self
            .executor
            .execute(program, service.args())
            .map_err(|e| single_line(&format!("{:#}", e)))?;

        if output.success {
            Ok(())
        } else {
            Err(single_line(&output.failure_message()))
        }
    }
}

/// Fold multi-line tool output into one log line
fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
