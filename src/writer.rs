//! Persisting the generated configuration files.

use std::path::Path;
use tracing::{debug, info};

use crate::config::OutputsConfig;
use crate::error::SyncError;
use crate::fs_abstraction::FileSystem;
use crate::render::RenderedConfigs;

/// Create any missing output file as an empty file, so the reload commands
/// always find something to read.
pub fn ensure_outputs(fs: &dyn FileSystem, outputs: &OutputsConfig) -> Result<(), SyncError> {
    for path in [&outputs.proxy, &outputs.firewall] {
        if fs.exists(path) {
            continue;
        }
        fs.create_empty(path).map_err(|e| {
            SyncError::FileSystem(format!("Failed to create {}: {}", path.display(), e))
        })?;
        info!("Created missing file: {}", path.display());
    }
    Ok(())
}

/// Write both documents, proxy first. Each file is replaced atomically.
pub fn write_documents(
    fs: &dyn FileSystem,
    outputs: &OutputsConfig,
    docs: &RenderedConfigs,
) -> Result<(), SyncError> {
    write_document(fs, &outputs.proxy, &docs.proxy)?;
    write_document(fs, &outputs.firewall, &docs.firewall)?;
    Ok(())
}

fn write_document(fs: &dyn FileSystem, path: &Path, content: &str) -> Result<(), SyncError> {
    fs.write_atomic(path, content.as_bytes())
        .map_err(|e| SyncError::FileSystem(format!("Failed to write {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote configuration");
    Ok(())
}
