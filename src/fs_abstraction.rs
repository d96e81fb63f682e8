//! Filesystem abstraction layer for testability
//!
//! Everything the pipeline reads or writes goes through [`FileSystem`], so
//! tests can assert exactly which files a run touches (and in which order)
//! with a mockall-generated `MockFileSystem`.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

/// Mode given to generated files that did not exist before
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Trait abstracting filesystem operations for dependency injection.
///
/// # Example (testing)
/// ```ignore
/// use cfsync::fs_abstraction::MockFileSystem;
///
/// let mut mock_fs = MockFileSystem::new();
/// mock_fs.expect_read_to_string()
///     .returning(|_| Ok("3f2a...".to_string()));
/// ```
#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create an empty file. Fails if the parent directory is missing.
    fn create_empty(&self, path: &Path) -> io::Result<()>;

    /// Replace the file content in one step: write a sibling temp file,
    /// fsync it, then rename it over `path`.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Real filesystem implementation using std::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_empty(&self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.set_permissions(Permissions::from_mode(DEFAULT_FILE_MODE))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        // Keep the mode of the file being replaced; NamedTempFile defaults to 0600.
        let mode = fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o7777)
            .unwrap_or(DEFAULT_FILE_MODE);

        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(contents)?;
        temp_file
            .as_file()
            .set_permissions(Permissions::from_mode(mode))?;
        temp_file.as_file().sync_all()?;

        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

static REAL_FS: RealFileSystem = RealFileSystem;

/// Get a reference to the global real filesystem instance.
pub fn real_fs() -> &'static RealFileSystem {
    &REAL_FS
}
