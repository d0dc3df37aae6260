//! Filesystem seam and the local implementation.
//!
//! Folder removal is best effort: [`Filesystem::delete_recursive`] keeps going
//! past entries it cannot remove and reports how many went each way in a
//! [`RemovalTally`].

use crate::types::FolderRecord;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Outcome of a best-effort recursive delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalTally {
    /// Files and directories removed.
    pub removed: u64,
    /// Entries that could not be removed (or read).
    pub failed: u64,
}

impl RemovalTally {
    /// Nothing was left behind.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

impl std::ops::AddAssign for RemovalTally {
    fn add_assign(&mut self, rhs: Self) {
        self.removed += rhs.removed;
        self.failed += rhs.failed;
    }
}

/// Directory operations the orphan pass needs.
pub trait Filesystem {
    /// Immediate subdirectories of `path`.
    fn list_directories(&self, path: &Path) -> io::Result<Vec<FolderRecord>>;

    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Remove `path` and everything below it, skipping what cannot be removed.
    /// An absent path yields an empty tally.
    fn delete_recursive(&self, path: &Path) -> RemovalTally;

    /// Total size in bytes of the files below `path`, skipping unreadable entries.
    fn directory_size(&self, path: &Path) -> u64;
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn list_directories(&self, path: &Path) -> io::Result<Vec<FolderRecord>> {
        (**self).list_directories(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn delete_recursive(&self, path: &Path) -> RemovalTally {
        (**self).delete_recursive(path)
    }

    fn directory_size(&self, path: &Path) -> u64 {
        (**self).directory_size(path)
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn list_directories(&self, path: &Path) -> io::Result<Vec<FolderRecord>> {
        let mut folders = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            // Junctions such as "All Users" and "Default User" are symlinks; skip them.
            let file_type = entry.file_type()?;
            if file_type.is_dir() && !file_type.is_symlink() {
                folders.push(FolderRecord::from_path(entry.path()));
            }
        }
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn delete_recursive(&self, path: &Path) -> RemovalTally {
        let mut tally = RemovalTally::default();
        if fs::symlink_metadata(path).is_err() {
            return tally;
        }

        for entry in WalkDir::new(path).contents_first(true).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "unreadable entry during removal");
                    tally.failed += 1;
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            match remove_entry(entry.path(), is_dir) {
                Ok(()) => tally.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "could not remove");
                    tally.failed += 1;
                }
            }
        }

        tally
    }

    fn directory_size(&self, path: &Path) -> u64 {
        WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }
}

/// Remove one entry, clearing a read-only attribute and retrying once on
/// permission failure.
fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    let remove = || {
        if is_dir {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    };

    match remove() {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let mut perms = fs::symlink_metadata(path)?.permissions();
            if !perms.readonly() {
                return Err(e);
            }
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(path, perms)?;
            remove()
        }
        other => other,
    }
}
