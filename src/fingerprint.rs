//! Change detection for the published range lists.
//!
//! A run only touches configuration when the SHA-256 of the canonical range
//! block differs from the one persisted by the last successful run.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SyncError;
use crate::fs_abstraction::FileSystem;

/// Hex-encoded SHA-256 digest of a range set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a previously persisted value. Whitespace is ignored; an empty
    /// value means there is no fingerprint.
    pub fn from_persisted(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical text block: sorted IPv4 entries, then sorted IPv6 entries,
/// joined with `\n` and no trailing newline.
pub fn canonical_block(ipv4: &[String], ipv6: &[String]) -> String {
    let mut v4: Vec<&str> = ipv4.iter().map(String::as_str).collect();
    let mut v6: Vec<&str> = ipv6.iter().map(String::as_str).collect();
    v4.sort_unstable();
    v6.sort_unstable();

    v4.into_iter().chain(v6).collect::<Vec<_>>().join("\n")
}

/// Fingerprint of a range set. Input order does not matter.
pub fn fingerprint(ipv4: &[String], ipv6: &[String]) -> Fingerprint {
    let digest = Sha256::digest(canonical_block(ipv4, ipv6).as_bytes());
    Fingerprint(hex::encode(digest))
}

/// True when the configuration must be regenerated.
pub fn has_changed(new: &Fingerprint, previous: Option<&Fingerprint>) -> bool {
    previous != Some(new)
}

/// Persisted fingerprint of the deployed configuration
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
}

impl FingerprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted fingerprint. A missing file means first run.
    pub fn load(&self, fs: &dyn FileSystem) -> Result<Option<Fingerprint>, SyncError> {
        match fs.read_to_string(&self.path) {
            Ok(content) => Ok(Fingerprint::from_persisted(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "No persisted fingerprint");
                Ok(None)
            }
            Err(e) => Err(SyncError::FileSystem(format!(
                "Failed to read fingerprint {:?}: {}",
                self.path, e
            ))),
        }
    }

    /// Persist `fingerprint`. Call only once the configuration it describes is on disk.
    pub fn commit(&self, fs: &dyn FileSystem, fingerprint: &Fingerprint) -> Result<(), SyncError> {
        fs.write_atomic(&self.path, fingerprint.as_str().as_bytes())
            .map_err(|e| {
                SyncError::FileSystem(format!(
                    "Failed to write fingerprint {:?}: {}",
                    self.path, e
                ))
            })
    }
}
