//! Profile directory seam and working-set construction.
//!
//! A [`ProfileDirectory`] enumerates raw profile-list entries and translates
//! SIDs to account names. [`WorkingSet::load`] turns those entries into
//! normalized [`ProfileRecord`]s once per run; nothing mutates it afterwards.

use crate::sid::{Sid, SidParseError};
use crate::time::FileTime;
use crate::types::{ProfileRecord, RawProfileEntry};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures reading the profile list or resolving account names.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Reading a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An external tool could not be run or exited with an error.
    #[error("{tool} failed: {message}")]
    Tool {
        /// Tool and subcommand, e.g. `reg query`.
        tool: &'static str,
        /// Exit status or stderr of the tool.
        message: String,
    },

    /// The SID has no account name.
    #[error("Account name not found for {0}")]
    NotFound(String),

    /// The inventory document is malformed.
    #[error("Invalid inventory: {0}")]
    Invalid(String),
}

/// Source of raw profile entries and account names.
pub trait ProfileDirectory {
    /// All profile-list entries, in registry order.
    fn list_profiles(&self) -> Result<Vec<RawProfileEntry>, DirectoryError>;

    /// Translate a SID to `DOMAIN\user`.
    fn resolve_name(&self, sid: &Sid) -> Result<String, DirectoryError>;

    /// The `ProfilesDirectory` value of the profile list, expanded.
    ///
    /// `None` when the source does not record one.
    fn profiles_directory(&self) -> Result<Option<String>, DirectoryError> {
        Ok(None)
    }
}

impl<T: ProfileDirectory + ?Sized> ProfileDirectory for &T {
    fn list_profiles(&self) -> Result<Vec<RawProfileEntry>, DirectoryError> {
        (**self).list_profiles()
    }

    fn resolve_name(&self, sid: &Sid) -> Result<String, DirectoryError> {
        (**self).resolve_name(sid)
    }

    fn profiles_directory(&self) -> Result<Option<String>, DirectoryError> {
        (**self).profiles_directory()
    }
}

/// Why an entry did not make it into the working set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dropped {
    /// The key is not a SID.
    Unparseable {
        /// Registry key name.
        key: String,
        /// `ProfileImagePath` of the entry, trimmed.
        image_path: String,
        /// Parse failure.
        error: SidParseError,
    },
    /// A second entry for a SID already in the set.
    Duplicate {
        /// Registry key name.
        key: String,
        /// `ProfileImagePath` of the entry, trimmed.
        image_path: String,
    },
}

impl Dropped {
    /// Image path of the skipped entry. It still marks its folder as in use.
    pub fn image_path(&self) -> &str {
        match self {
            Self::Unparseable { image_path, .. } | Self::Duplicate { image_path, .. } => {
                image_path
            }
        }
    }
}

impl std::fmt::Display for Dropped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable { key, error, .. } => write!(f, "skipping key '{key}': {error}"),
            Self::Duplicate { key, .. } => write!(f, "skipping duplicate entry for {key}"),
        }
    }
}

/// The normalized records of one run.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    records: Vec<ProfileRecord>,
    dropped: Vec<Dropped>,
}

impl WorkingSet {
    /// Enumerate and normalize every entry of `directory`.
    ///
    /// Unparseable keys and duplicate SIDs are dropped and listed in
    /// [`WorkingSet::dropped`]; failed name resolution keeps the record without a
    /// name. Only a failed enumeration is an error.
    pub fn load(directory: &dyn ProfileDirectory) -> Result<Self, DirectoryError> {
        let entries = directory.list_profiles()?;
        debug!(count = entries.len(), "enumerated profile entries");
        Ok(Self::from_entries(entries, |sid| {
            directory
                .resolve_name(sid)
                .inspect_err(|e| debug!(%sid, error = %e, "name resolution failed"))
                .ok()
        }))
    }

    /// Normalize entries with the given name resolver.
    pub fn from_entries(
        entries: Vec<RawProfileEntry>,
        resolve: impl Fn(&Sid) -> Option<String>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(entries.len());
        let mut dropped = Vec::new();

        for entry in entries {
            let image_path = entry.image_path.trim().to_string();
            let sid = match entry.key.parse::<Sid>() {
                Ok(sid) => sid,
                Err(error) => {
                    warn!(key = %entry.key, %error, "dropping profile entry");
                    dropped.push(Dropped::Unparseable {
                        key: entry.key,
                        image_path,
                        error,
                    });
                    continue;
                }
            };

            if !seen.insert(sid.clone()) {
                warn!(%sid, "dropping duplicate profile entry");
                dropped.push(Dropped::Duplicate {
                    key: entry.key,
                    image_path,
                });
                continue;
            }

            let friendly_name = resolve(&sid).filter(|name| !name.is_empty());
            records.push(ProfileRecord {
                sid,
                friendly_name,
                image_path,
                load: FileTime::from_parts(entry.load_high, entry.load_low),
                unload: FileTime::from_parts(entry.unload_high, entry.unload_low),
            });
        }

        Self { records, dropped }
    }

    /// Records in enumeration order.
    pub fn records(&self) -> &[ProfileRecord] {
        &self.records
    }

    /// Entries that were skipped.
    pub fn dropped(&self) -> &[Dropped] {
        &self.dropped
    }

    /// Image paths of every enumerated entry, dropped ones included.
    ///
    /// A `.bak` or duplicate key still points at a folder that belongs to
    /// someone, so orphan reconciliation counts these paths as owners.
    pub fn owner_paths(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(|r| r.image_path.as_str())
            .chain(self.dropped.iter().map(Dropped::image_path))
            .filter(|path| !path.is_empty())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record survived normalization.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
