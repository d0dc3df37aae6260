//! Records flowing through a run.

use crate::sid::Sid;
use crate::time::FileTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One profile-list entry exactly as the directory reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfileEntry {
    /// Registry key name; expected to be a SID.
    pub key: String,
    /// `ProfileImagePath`, possibly empty.
    #[serde(default)]
    pub image_path: String,
    /// `LocalProfileLoadTimeHigh`
    #[serde(default)]
    pub load_high: u32,
    /// `LocalProfileLoadTimeLow`
    #[serde(default)]
    pub load_low: u32,
    /// `LocalProfileUnloadTimeHigh`
    #[serde(default)]
    pub unload_high: u32,
    /// `LocalProfileUnloadTimeLow`
    #[serde(default)]
    pub unload_low: u32,
}

/// A profile entry whose key parsed, with its name resolved and timestamps combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    /// Canonical SID.
    pub sid: Sid,
    /// Resolved account name (`DOMAIN\user`), if translation succeeded.
    pub friendly_name: Option<String>,
    /// Profile folder; empty when the registry value is missing.
    pub image_path: String,
    /// Last load instant; zero when never loaded.
    pub load: FileTime,
    /// Last unload instant.
    pub unload: FileTime,
}

impl ProfileRecord {
    /// Display name, falling back to a placeholder.
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or("<unresolved>")
    }
}

/// A directory directly under the users root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRecord {
    /// Directory name.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
}

impl FolderRecord {
    /// Build a record from a path, taking the name from its last component.
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}
