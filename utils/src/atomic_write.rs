//! Atomic file write helpers.
//!
//! Content goes to a temp file in the destination directory and is renamed
//! over the target. Where rename-over-existing fails, the old file is moved to
//! `<name>.bak` first and restored if the second rename also fails.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// How hard to push bytes to disk before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// `sync_all` on the temp file before rename.
    #[default]
    Synced,
    /// Leave flushing to the OS. Used by tests.
    Buffered,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub durability: Durability,
    /// Restrict the written file to owner read/write (Unix only).
    pub owner_only: bool,
}

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    atomic_write_with(path, bytes, WriteOptions::default())
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Restore `<path>.bak` left behind by an interrupted write.
///
/// Returns `true` when a backup was moved back into place.
pub fn recover_backup(path: &Path) -> bool {
    let backup = path.with_extension("bak");
    if path.exists() || !backup.exists() {
        return false;
    }
    match fs::rename(&backup, path) {
        Ok(()) => {
            warn!(path = %path.display(), "Recovered backup from interrupted write");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), "Failed to recover backup: {e}");
            false
        }
    }
}

pub fn atomic_write_with(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: WriteOptions,
) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if options.durability == Durability::Synced {
        tmp.as_file().sync_all()?;
    }

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        let backup = path.with_extension("bak");
        let _ = fs::remove_file(&backup);
        fs::rename(path, &backup)?;
        if let Err(second) = err.file.persist(path) {
            let _ = fs::rename(&backup, path);
            return Err(second.error);
        }
        if let Err(e) = fs::remove_file(&backup) {
            debug!(path = %backup.display(), "Failed to remove backup after write: {e}");
        }
    }

    #[cfg(unix)]
    if options.owner_only {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
