//! JSON inventory snapshot.
//!
//! An inventory file captures a machine's profile list (for example exported
//! on a Windows host and inspected elsewhere). [`SnapshotInventory`] serves it
//! as both the profile directory and the profile store: deleting a profile
//! removes its entry and rewrites the file atomically, and a repair puts the
//! entry back.
//!
//! ```json
//! {
//!   "profiles_directory": "C:\\Users",
//!   "profiles": [
//!     {
//!       "key": "S-1-5-21-1-2-3-1001",
//!       "image_path": "C:\\Users\\alice",
//!       "load_high": 31000000, "load_low": 0,
//!       "unload_high": 31000000, "unload_low": 1,
//!       "name": "HOST\\alice",
//!       "loaded": false
//!     }
//!   ]
//! }
//! ```

use crate::directory::{DirectoryError, ProfileDirectory};
use crate::sid::Sid;
use crate::store::{ProfileStore, StoreError};
use crate::types::{ProfileRecord, RawProfileEntry};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Failures loading or saving an inventory file.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Reading or writing the file failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a valid inventory document.
    #[error("Invalid inventory JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The rewritten file could not replace the original.
    #[error("Failed to replace inventory: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Top-level inventory document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// `ProfilesDirectory` of the captured machine, already expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_directory: Option<String>,
    /// Profile-list entries.
    #[serde(default)]
    pub profiles: Vec<InventoryProfile>,
}

/// One profile entry with the live state a snapshot has to carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryProfile {
    /// Raw registry values.
    #[serde(flatten)]
    pub entry: RawProfileEntry,
    /// Account name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the profile was loaded when the snapshot was taken.
    #[serde(default)]
    pub loaded: bool,
}

impl InventoryProfile {
    fn matches(&self, sid: &Sid) -> bool {
        self.entry.key.parse::<Sid>().is_ok_and(|s| &s == sid)
    }
}

/// A file-backed inventory acting as directory and store.
#[derive(Debug)]
pub struct SnapshotInventory {
    path: PathBuf,
    inventory: RefCell<Inventory>,
    removed: RefCell<Vec<InventoryProfile>>,
}

impl SnapshotInventory {
    /// Load an inventory file.
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        let data = fs::read(path)?;
        let inventory: Inventory = serde_json::from_slice(&data)?;
        debug!(path = %path.display(), profiles = inventory.profiles.len(), "loaded inventory");
        Ok(Self {
            path: path.to_path_buf(),
            inventory: RefCell::new(inventory),
            removed: RefCell::new(Vec::new()),
        })
    }

    /// Current contents.
    pub fn inventory(&self) -> Inventory {
        self.inventory.borrow().clone()
    }

    /// Write the inventory back through a temp file in the same directory.
    fn save(&self) -> Result<(), SnapshotError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &*self.inventory.borrow())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl ProfileDirectory for SnapshotInventory {
    fn list_profiles(&self) -> Result<Vec<RawProfileEntry>, DirectoryError> {
        Ok(self
            .inventory
            .borrow()
            .profiles
            .iter()
            .map(|p| p.entry.clone())
            .collect())
    }

    fn resolve_name(&self, sid: &Sid) -> Result<String, DirectoryError> {
        self.inventory
            .borrow()
            .profiles
            .iter()
            .find(|p| p.matches(sid))
            .and_then(|p| p.name.clone())
            .ok_or_else(|| DirectoryError::NotFound(sid.to_string()))
    }

    fn profiles_directory(&self) -> Result<Option<String>, DirectoryError> {
        Ok(self
            .inventory
            .borrow()
            .profiles_directory
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(str::to_string))
    }
}

impl ProfileStore for SnapshotInventory {
    fn is_loaded(&self, sid: &Sid) -> Result<bool, StoreError> {
        Ok(self
            .inventory
            .borrow()
            .profiles
            .iter()
            .any(|p| p.matches(sid) && p.loaded))
    }

    fn delete(&self, sid: &Sid) -> Result<(), StoreError> {
        if self.is_loaded(sid)? {
            return Err(StoreError::delete(sid, "profile is in use"));
        }

        let removed: Vec<_> = {
            let mut inventory = self.inventory.borrow_mut();
            let (gone, kept) = std::mem::take(&mut inventory.profiles)
                .into_iter()
                .partition(|p| p.matches(sid));
            inventory.profiles = kept;
            gone
        };
        if removed.is_empty() {
            return Ok(());
        }

        self.save().map_err(|e| StoreError::delete(sid, e))?;
        self.removed.borrow_mut().extend(removed);
        Ok(())
    }

    fn repair(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        if self
            .inventory
            .borrow()
            .profiles
            .iter()
            .any(|p| p.matches(&record.sid))
        {
            return Ok(());
        }

        let restored = {
            let mut removed = self.removed.borrow_mut();
            removed
                .iter()
                .position(|p| p.matches(&record.sid))
                .map(|i| removed.remove(i))
        }
        .unwrap_or_else(|| {
            let (load_high, load_low) = record.load.parts();
            let (unload_high, unload_low) = record.unload.parts();
            InventoryProfile {
                entry: RawProfileEntry {
                    key: record.sid.to_string(),
                    image_path: record.image_path.clone(),
                    load_high,
                    load_low,
                    unload_high,
                    unload_low,
                },
                name: record.friendly_name.clone(),
                loaded: false,
            }
        });

        self.inventory.borrow_mut().profiles.push(restored);
        self.save().map_err(|e| StoreError::repair(&record.sid, e))
    }
}
