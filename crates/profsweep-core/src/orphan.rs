//! Orphan folder reconciliation.
//!
//! A folder under the users root is owned when some profile entry's image path
//! ends with the folder's name. The match is a plain suffix test, so
//! `C:\Users\jimbob` also owns a folder called `bob`: a false "owned" only
//! keeps a folder, a false "orphan" deletes one. Names compare
//! case-insensitively, as NTFS does.

use crate::types::FolderRecord;
use serde::Serialize;

/// Folder names that are never orphans, whether or not a record owns them.
pub const EXCLUDED_FOLDERS: [&str; 5] = ["", "Public", "Default", "Default User", "All Users"];

/// Ownership verdict for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderVerdict {
    /// Shared or template folder.
    Excluded,
    /// Some image path ends with its name.
    Owned,
    /// No record references it.
    Orphan,
}

/// Cross-references folders against the image paths of a working set.
#[derive(Debug, Clone)]
pub struct OrphanReconciler {
    owner_paths: Vec<String>,
}

impl OrphanReconciler {
    /// Index image paths (lowercased, trailing separators removed).
    pub fn new<'a>(image_paths: impl IntoIterator<Item = &'a str>) -> Self {
        let owner_paths = image_paths
            .into_iter()
            .map(|path| path.trim().trim_end_matches(['\\', '/']).to_lowercase())
            .filter(|path| !path.is_empty())
            .collect();
        Self { owner_paths }
    }

    /// Verdict for one folder.
    pub fn verdict(&self, folder: &FolderRecord) -> FolderVerdict {
        if is_excluded(&folder.name) {
            return FolderVerdict::Excluded;
        }
        let name = folder.name.to_lowercase();
        if self.owner_paths.iter().any(|path| path.ends_with(&name)) {
            FolderVerdict::Owned
        } else {
            FolderVerdict::Orphan
        }
    }

    /// Verdicts for many folders, in input order.
    pub fn reconcile<'f>(
        &self,
        folders: &'f [FolderRecord],
    ) -> Vec<(&'f FolderRecord, FolderVerdict)> {
        folders.iter().map(|f| (f, self.verdict(f))).collect()
    }
}

fn is_excluded(name: &str) -> bool {
    EXCLUDED_FOLDERS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn folder(name: &str) -> FolderRecord {
        FolderRecord {
            name: name.to_string(),
            path: PathBuf::from(r"C:\Users").join(name),
        }
    }

    #[test]
    fn test_owned_folders_are_not_orphans() {
        let reconciler = OrphanReconciler::new([r"C:\Users\alice", r"C:\Users\Bob.HOST\"]);

        assert_eq!(reconciler.verdict(&folder("alice")), FolderVerdict::Owned);
        assert_eq!(reconciler.verdict(&folder("ALICE")), FolderVerdict::Owned);
        assert_eq!(reconciler.verdict(&folder("bob.host")), FolderVerdict::Owned);
        assert_eq!(reconciler.verdict(&folder("carol")), FolderVerdict::Orphan);
    }

    #[test]
    fn test_path_suffix_owns_folder() {
        let reconciler = OrphanReconciler::new([r"C:\Users\jimbob"]);
        assert_eq!(reconciler.verdict(&folder("bob")), FolderVerdict::Owned);
        assert_eq!(reconciler.verdict(&folder("BOB")), FolderVerdict::Owned);
        assert_eq!(reconciler.verdict(&folder("jim")), FolderVerdict::Orphan);
    }

    #[test]
    fn test_empty_paths_own_nothing() {
        let reconciler = OrphanReconciler::new(["", "  "]);
        assert_eq!(reconciler.verdict(&folder("carol")), FolderVerdict::Orphan);
    }

    #[test]
    fn test_public_is_never_orphaned() {
        let reconciler = OrphanReconciler::new([]);
        for name in ["Public", "public", "Default", "Default User", "All Users", ""] {
            assert_eq!(
                reconciler.verdict(&folder(name)),
                FolderVerdict::Excluded,
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_reconcile_keeps_order() {
        let reconciler = OrphanReconciler::new([r"C:\Users\alice"]);
        let folders = [folder("zed"), folder("alice"), folder("Public")];
        let verdicts: Vec<_> = reconciler
            .reconcile(&folders)
            .into_iter()
            .map(|(f, v)| (f.name.as_str(), v))
            .collect();
        assert_eq!(
            verdicts,
            [
                ("zed", FolderVerdict::Orphan),
                ("alice", FolderVerdict::Owned),
                ("Public", FolderVerdict::Excluded),
            ]
        );
    }
}
